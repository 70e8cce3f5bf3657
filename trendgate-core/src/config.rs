//! Level configuration, engine thresholds, and snapshot publication.
//!
//! A `LevelSet` is validated once at construction and is immutable afterwards.
//! The weight-tuning collaborator publishes new sets through a
//! `LevelSetHandle`, which swaps whole `Arc<LevelSet>` snapshots: an evaluation
//! sees either the old set or the new one, never a mix.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::{Arc, RwLock};

use crate::error::ConfigError;

/// Tolerance for the weights-sum-to-one check.
pub const WEIGHT_TOLERANCE: f64 = 1e-6;

/// One trend level: a moving-average period and its weight in the aggregate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelConfig {
    pub label: String,
    pub period: usize,
    pub weight: f64,
}

impl LevelConfig {
    pub fn new(label: impl Into<String>, period: usize, weight: f64) -> Self {
        Self {
            label: label.into(),
            period,
            weight,
        }
    }
}

/// Validated, versioned, read-only list of trend levels.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LevelSet {
    version: u64,
    levels: Vec<LevelConfig>,
}

impl LevelSet {
    /// Validate and build a level set at version 1.
    pub fn new(levels: Vec<LevelConfig>) -> Result<Self, ConfigError> {
        validate_levels(&levels)?;
        Ok(Self { version: 1, levels })
    }

    /// The secondary/tertiary/immediate set: MA 50/20/9 weighted 0.50/0.30/0.20.
    pub fn standard() -> Self {
        Self {
            version: 1,
            levels: vec![
                LevelConfig::new("secundaria", 50, 0.50),
                LevelConfig::new("terciaria", 20, 0.30),
                LevelConfig::new("inmediata", 9, 0.20),
            ],
        }
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn levels(&self) -> &[LevelConfig] {
        &self.levels
    }

    pub fn len(&self) -> usize {
        self.levels.len()
    }

    /// Always false for a validated set; kept for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    /// Heaviest-weighted level. Ties go to the level listed first.
    pub fn heaviest(&self) -> &LevelConfig {
        let mut best = &self.levels[0];
        for level in &self.levels[1..] {
            if level.weight > best.weight {
                best = level;
            }
        }
        best
    }

    /// Content hash of the levels (version excluded).
    ///
    /// Two sets with identical levels hash identically regardless of how many
    /// times they were republished.
    pub fn fingerprint(&self) -> String {
        // Vec order is preserved and LevelConfig has fixed field order, so the
        // JSON is canonical.
        let json = serde_json::to_string(&self.levels).unwrap_or_default();
        blake3::hash(json.as_bytes()).to_hex().to_string()
    }
}

impl Default for LevelSet {
    fn default() -> Self {
        Self::standard()
    }
}

fn validate_levels(levels: &[LevelConfig]) -> Result<(), ConfigError> {
    if levels.is_empty() {
        return Err(ConfigError::NoLevels);
    }

    let mut seen = HashSet::new();
    for level in levels {
        if level.period == 0 {
            return Err(ConfigError::ZeroPeriod {
                label: level.label.clone(),
            });
        }
        if !(0.0..=1.0).contains(&level.weight) {
            return Err(ConfigError::WeightOutOfRange {
                label: level.label.clone(),
                weight: level.weight,
            });
        }
        if !seen.insert(level.label.as_str()) {
            return Err(ConfigError::DuplicateLabel(level.label.clone()));
        }
    }

    let sum: f64 = levels.iter().map(|l| l.weight).sum();
    if (sum - 1.0).abs() > WEIGHT_TOLERANCE {
        return Err(ConfigError::WeightSum { sum });
    }

    Ok(())
}

/// Copy-on-write publication point for the active level set.
#[derive(Debug)]
pub struct LevelSetHandle {
    current: RwLock<Arc<LevelSet>>,
}

impl LevelSetHandle {
    pub fn new(initial: LevelSet) -> Self {
        Self {
            current: RwLock::new(Arc::new(initial)),
        }
    }

    /// Current snapshot. Holding it never blocks a concurrent `publish`.
    pub fn snapshot(&self) -> Arc<LevelSet> {
        let guard = self.current.read().unwrap_or_else(|e| e.into_inner());
        Arc::clone(&guard)
    }

    /// Validate `levels` and atomically replace the active set.
    ///
    /// The new set's version is the previous version plus one. On error the
    /// active set is untouched.
    pub fn publish(&self, levels: Vec<LevelConfig>) -> Result<Arc<LevelSet>, ConfigError> {
        validate_levels(&levels)?;
        let mut guard = self.current.write().unwrap_or_else(|e| e.into_inner());
        let next = Arc::new(LevelSet {
            version: guard.version + 1,
            levels,
        });
        *guard = Arc::clone(&next);
        Ok(next)
    }
}

impl Default for LevelSetHandle {
    fn default() -> Self {
        Self::new(LevelSet::standard())
    }
}

/// Inclusive RSI band.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RsiBand {
    pub min: f64,
    pub max: f64,
}

/// Lateral-market veto thresholds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VetoParams {
    /// Number of lateral levels that fires the veto.
    pub lateral_levels: usize,
    pub adx_period: usize,
    /// ADX strictly below this fires the veto.
    pub min_adx: f64,
    pub range_window: usize,
    /// (max high - min low) / mean close strictly below this fires the veto.
    pub min_range: f64,
}

impl Default for VetoParams {
    fn default() -> Self {
        Self {
            lateral_levels: 3,
            adx_period: 14,
            min_adx: 20.0,
            range_window: 20,
            min_range: 0.002,
        }
    }
}

/// Pullback-entry validation thresholds and gate effects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PullbackParams {
    /// Pre-gate effectiveness at or above which the validator runs.
    pub gate: f64,
    pub ma_period: usize,
    /// Maximum |price - MA| / MA.
    pub max_ma_distance: f64,
    pub min_body_ratio: f64,
    pub rsi_period: usize,
    pub bullish_rsi: RsiBand,
    pub bearish_rsi: RsiBand,
    pub adx_period: usize,
    pub min_adx: f64,
    /// ADX strictly above this records the strong-trend flag.
    pub strong_adx: f64,
    /// Maximum |price - zone| / price for the S/R flag.
    pub sr_proximity: f64,
    /// On rejection: effectiveness := min(effectiveness * factor, cap).
    pub rejection_factor: f64,
    pub rejection_cap: f64,
    /// On confirmation: effectiveness := min(effectiveness + bonus, 100).
    pub confirmation_bonus: f64,
}

impl Default for PullbackParams {
    fn default() -> Self {
        Self {
            gate: 70.0,
            ma_period: 50,
            max_ma_distance: 0.003,
            min_body_ratio: 0.5,
            rsi_period: 14,
            bullish_rsi: RsiBand {
                min: 35.0,
                max: 55.0,
            },
            bearish_rsi: RsiBand {
                min: 45.0,
                max: 65.0,
            },
            adx_period: 14,
            min_adx: 25.0,
            strong_adx: 35.0,
            sr_proximity: 0.003,
            rejection_factor: 0.6,
            rejection_cap: 70.0,
            confirmation_bonus: 10.0,
        }
    }
}

/// Every tunable threshold of the engine. `Default` is the production calibration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineParams {
    /// Half-window of the swing classifier (it reads `2 * swing_lookback` candles).
    pub swing_lookback: usize,
    /// Relative change that separates higher/lower swings from flat ones.
    pub swing_threshold: f64,
    pub fractal_window: usize,
    /// Upper bound on the moving-average differences read by the consistency
    /// score; the window is `min(consistency_window, ma_len / 4)`.
    pub consistency_window: usize,
    pub veto: VetoParams,
    pub pullback: PullbackParams,
    /// Apply the ADX/MACD complementary adjustment after the pullback gate.
    pub trend_strength_adjustment: bool,
}

impl Default for EngineParams {
    fn default() -> Self {
        Self {
            swing_lookback: 5,
            swing_threshold: 0.001,
            fractal_window: 10,
            consistency_window: 5,
            veto: VetoParams::default(),
            pullback: PullbackParams::default(),
            trend_strength_adjustment: false,
        }
    }
}

impl EngineParams {
    /// Reject parameters no evaluation could run with (zero periods, inverted
    /// bands, non-finite thresholds).
    pub fn validate(&self) -> Result<(), ConfigError> {
        let periods = [
            ("swing_lookback", self.swing_lookback),
            ("consistency_window", self.consistency_window),
            ("veto.adx_period", self.veto.adx_period),
            ("veto.range_window", self.veto.range_window),
            ("pullback.ma_period", self.pullback.ma_period),
            ("pullback.rsi_period", self.pullback.rsi_period),
            ("pullback.adx_period", self.pullback.adx_period),
        ];
        for (name, period) in periods {
            if period == 0 {
                return Err(invalid(name, "must be >= 1"));
            }
        }
        if self.fractal_window < 2 {
            return Err(invalid("fractal_window", "must be >= 2"));
        }

        let thresholds = [
            ("swing_threshold", self.swing_threshold),
            ("veto.min_adx", self.veto.min_adx),
            ("veto.min_range", self.veto.min_range),
            ("pullback.gate", self.pullback.gate),
            ("pullback.max_ma_distance", self.pullback.max_ma_distance),
            ("pullback.min_body_ratio", self.pullback.min_body_ratio),
            ("pullback.min_adx", self.pullback.min_adx),
            ("pullback.strong_adx", self.pullback.strong_adx),
            ("pullback.sr_proximity", self.pullback.sr_proximity),
            ("pullback.rejection_factor", self.pullback.rejection_factor),
            ("pullback.rejection_cap", self.pullback.rejection_cap),
            ("pullback.confirmation_bonus", self.pullback.confirmation_bonus),
        ];
        for (name, value) in thresholds {
            if !value.is_finite() || value < 0.0 {
                return Err(invalid(name, "must be finite and non-negative"));
            }
        }

        for (name, band) in [
            ("pullback.bullish_rsi", self.pullback.bullish_rsi),
            ("pullback.bearish_rsi", self.pullback.bearish_rsi),
        ] {
            if band.min.is_nan() || band.max.is_nan() || band.min > band.max {
                return Err(invalid(name, "needs min <= max"));
            }
        }

        Ok(())
    }
}

fn invalid(name: &'static str, reason: &str) -> ConfigError {
    ConfigError::InvalidParameter {
        name,
        reason: reason.to_string(),
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawConfig {
    levels: Option<Vec<LevelConfig>>,
    params: EngineParams,
}

/// Level set plus thresholds, as loaded from a TOML document.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct EngineConfig {
    pub levels: LevelSet,
    pub params: EngineParams,
}

impl EngineConfig {
    /// Parse a TOML document with an optional `[[levels]]` array and an
    /// optional `[params]` table. Missing pieces take their defaults.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let raw: RawConfig =
            toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))?;
        raw.params.validate()?;
        let levels = match raw.levels {
            Some(levels) => LevelSet::new(levels)?,
            None => LevelSet::standard(),
        };
        Ok(Self {
            levels,
            params: raw.params,
        })
    }
}
