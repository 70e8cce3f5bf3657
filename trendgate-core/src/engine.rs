//! Orchestrator: per-level scoring, aggregation, veto, external adjustment,
//! pullback gate and the optional trend-strength adjustment.
//!
//! One call is one pass over an immutable snapshot of inputs and
//! configuration. Nothing is cached between calls, so identical inputs produce
//! identical assessments.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info};

use crate::aggregate::{
    external_adjustment, vote_alignment, weighted_effectiveness, Alignment, ExternalAdjustment,
};
use crate::config::{EngineConfig, EngineParams, LevelConfig, LevelSet, LevelSetHandle};
use crate::domain::{Candle, Direction, ExternalStrategyInput, SrZone};
use crate::error::ConfigError;
use crate::level::{score_level, LevelResult};
use crate::pullback::{apply_gate, validate_pullback, PullbackContext, PullbackStatus};
use crate::strength::{assess_trend_strength, strength_adjustment, StrengthAdjustment};
use crate::summary::build_summary;
use crate::veto::{check_veto, VetoReason};

/// Inputs of one evaluation, borrowed from the caller.
#[derive(Debug, Clone, Copy)]
pub struct EvaluationInput<'a> {
    pub candles: &'a [Candle],
    /// Current price; the last close when not supplied.
    pub price: Option<f64>,
    pub strategies: &'a [ExternalStrategyInput],
    pub zones: &'a [SrZone],
}

impl<'a> EvaluationInput<'a> {
    pub fn new(candles: &'a [Candle]) -> Self {
        Self {
            candles,
            price: None,
            strategies: &[],
            zones: &[],
        }
    }

    pub fn with_price(mut self, price: f64) -> Self {
        self.price = Some(price);
        self
    }

    pub fn with_strategies(mut self, strategies: &'a [ExternalStrategyInput]) -> Self {
        self.strategies = strategies;
        self
    }

    pub fn with_zones(mut self, zones: &'a [SrZone]) -> Self {
        self.zones = zones;
        self
    }

    /// Supplied price, else the last close, else NaN for an empty window.
    pub fn price(&self) -> f64 {
        self.price
            .or_else(|| self.candles.last().map(|c| c.close))
            .unwrap_or(f64::NAN)
    }
}

/// How the assessment ended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Outcome {
    /// The lateral-market veto fired; effectiveness is 0 and direction lateral.
    Vetoed { reason: VetoReason },
    /// Normal scoring path.
    Scored { pullback: PullbackStatus },
}

/// Result of one evaluation. Immutable once returned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assessment {
    /// Final effectiveness in [0, 100], rounded to two decimals.
    pub effectiveness: f64,
    pub direction: Direction,
    /// Weighted sum of level strengths before any adjustment.
    pub base_effectiveness: f64,
    pub alignment: Alignment,
    /// `None` when vetoed or when no external input qualified.
    pub external: Option<ExternalAdjustment>,
    /// `None` when vetoed or when the adjustment is disabled.
    pub trend_strength: Option<StrengthAdjustment>,
    pub levels: BTreeMap<String, LevelResult>,
    #[serde(flatten)]
    pub outcome: Outcome,
    pub config_version: u64,
    pub config_fingerprint: String,
    pub summary: Vec<String>,
}

impl Assessment {
    pub fn is_vetoed(&self) -> bool {
        matches!(self.outcome, Outcome::Vetoed { .. })
    }

    pub fn veto(&self) -> Option<&VetoReason> {
        match &self.outcome {
            Outcome::Vetoed { reason } => Some(reason),
            Outcome::Scored { .. } => None,
        }
    }

    /// Pullback status of a scored assessment; `None` when vetoed.
    pub fn pullback(&self) -> Option<&PullbackStatus> {
        match &self.outcome {
            Outcome::Vetoed { .. } => None,
            Outcome::Scored { pullback } => Some(pullback),
        }
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn clamp_score(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 100.0)
    }
}

/// Stateless decision engine over one level-set snapshot.
#[derive(Debug, Clone)]
pub struct Engine {
    levels: Arc<LevelSet>,
    params: EngineParams,
    fingerprint: String,
}

impl Engine {
    pub fn new(levels: Arc<LevelSet>, params: EngineParams) -> Result<Self, ConfigError> {
        params.validate()?;
        let fingerprint = levels.fingerprint();
        Ok(Self {
            levels,
            params,
            fingerprint,
        })
    }

    /// Engine over the current snapshot of a published level set.
    pub fn from_handle(handle: &LevelSetHandle, params: EngineParams) -> Result<Self, ConfigError> {
        Self::new(handle.snapshot(), params)
    }

    pub fn from_config(config: EngineConfig) -> Result<Self, ConfigError> {
        Self::new(Arc::new(config.levels), config.params)
    }

    pub fn levels(&self) -> &LevelSet {
        &self.levels
    }

    pub fn params(&self) -> &EngineParams {
        &self.params
    }

    /// Score every configured level and aggregate.
    pub fn evaluate(&self, input: &EvaluationInput<'_>) -> Assessment {
        let price = input.price();
        let results = self
            .levels
            .levels()
            .iter()
            .map(|level| score_level(input.candles, price, level, &self.params))
            .collect();
        self.aggregate(input, results)
    }

    /// Aggregate precomputed level results, given in level-set order.
    ///
    /// Missing trailing results count as insufficient data; extra ones are
    /// ignored.
    pub fn aggregate(&self, input: &EvaluationInput<'_>, results: Vec<LevelResult>) -> Assessment {
        let price = input.price();
        let mut supplied = results.into_iter();
        let scored: Vec<(&LevelConfig, LevelResult)> = self
            .levels
            .levels()
            .iter()
            .map(|level| {
                let result = supplied
                    .next()
                    .unwrap_or_else(|| LevelResult::insufficient(level.period, price));
                (level, result)
            })
            .collect();

        let base_effectiveness =
            weighted_effectiveness(scored.iter().map(|(level, r)| (level.weight, r.strength)));
        let alignment = vote_alignment(scored.iter().map(|(_, r)| r.direction));
        let mut effectiveness = clamp_score(base_effectiveness + alignment.bonus);

        let heaviest = self.levels.heaviest();
        let heaviest_direction = scored
            .iter()
            .find(|(level, _)| level.label == heaviest.label)
            .map_or(Direction::Undetermined, |(_, r)| r.direction);

        let veto = check_veto(
            scored.iter().map(|(_, r)| r.direction),
            input.candles,
            &self.params.veto,
        );

        let (direction, external, trend_strength, outcome) = match veto {
            Some(reason) => {
                effectiveness = 0.0;
                (Direction::Lateral, None, None, Outcome::Vetoed { reason })
            }
            None => {
                let external =
                    external_adjustment(input.strategies, alignment.predominant, heaviest_direction);
                if let Some(adj) = &external {
                    effectiveness = clamp_score(effectiveness + adj.total());
                }

                let pullback = if effectiveness >= self.params.pullback.gate {
                    let ctx = PullbackContext::from_candles(
                        input.candles,
                        price,
                        alignment.predominant,
                        heaviest.label.as_str(),
                        heaviest_direction,
                        &self.params.pullback,
                    );
                    let status = validate_pullback(&ctx, input.zones, &self.params.pullback);
                    let gated = apply_gate(effectiveness, &status, &self.params.pullback);
                    info!(before = effectiveness, after = gated, "pullback gate applied");
                    effectiveness = gated;
                    status
                } else {
                    PullbackStatus::NotEvaluated
                };

                let trend_strength = if self.params.trend_strength_adjustment {
                    let reading = assess_trend_strength(input.candles);
                    let adjustment = strength_adjustment(&reading, alignment.predominant);
                    effectiveness = clamp_score(effectiveness + adjustment);
                    Some(StrengthAdjustment {
                        reading,
                        adjustment,
                    })
                } else {
                    None
                };

                (
                    alignment.predominant,
                    external,
                    trend_strength,
                    Outcome::Scored { pullback },
                )
            }
        };

        let effectiveness = round2(clamp_score(effectiveness));
        let summary = build_summary(
            &scored.iter().map(|(l, r)| (*l, r)).collect::<Vec<_>>(),
            &alignment,
            &outcome,
            effectiveness,
            direction,
        );
        debug!(
            effectiveness,
            %direction,
            vetoed = matches!(outcome, Outcome::Vetoed { .. }),
            "assessment complete"
        );

        let levels = scored
            .into_iter()
            .map(|(level, result)| (level.label.clone(), result))
            .collect();

        Assessment {
            effectiveness,
            direction,
            base_effectiveness,
            alignment,
            external,
            trend_strength,
            levels,
            outcome,
            config_version: self.levels.version(),
            config_fingerprint: self.fingerprint.clone(),
            summary,
        }
    }
}

impl Default for Engine {
    fn default() -> Self {
        let levels = Arc::new(LevelSet::standard());
        let fingerprint = levels.fingerprint();
        Self {
            levels,
            params: EngineParams::default(),
            fingerprint,
        }
    }
}
