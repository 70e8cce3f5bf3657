//! Per-level scorer: one moving-average period turned into a direction and a
//! 0–100 strength.
//!
//! strength = angle + consistency + distance + swing bonus + fractal bonus
//!            + impulse adjustment, clamped to [0, 100].

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::{EngineParams, LevelConfig};
use crate::domain::{Candle, Direction};
use crate::error::DataIssue;
use crate::fractal::{classify_fractal, FractalPattern, ImpulseStrength};
use crate::indicators::{last_finite, Indicator, Sma};
use crate::metrics::{
    angle_score, consistency_score, consistency_window, distance_score, measure_angle, AngleClass,
};
use crate::swing::classify_swings;

/// Points awarded when a confirmed swing agrees with the angle direction.
pub const SWING_BONUS: f64 = 10.0;

/// Everything measured for one level, including the raw sub-scores.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LevelDetail {
    pub period: usize,
    pub price: f64,
    pub ma_value: Option<f64>,
    pub angle_degrees: Option<f64>,
    pub slope: Option<f64>,
    pub normalized_slope: Option<f64>,
    pub angle_classification: AngleClass,
    pub angle_direction: Direction,
    pub swing_type: Direction,
    pub swing_confirmed: bool,
    pub fractal_pattern: FractalPattern,
    pub impulse_strength: ImpulseStrength,
    pub impulse_count: usize,
    pub retracement_count: usize,
    pub angle_score: f64,
    pub consistency_score: f64,
    pub distance_score: f64,
    pub swing_bonus: f64,
    pub fractal_bonus: f64,
    pub impulse_adjustment: f64,
    /// First component that degraded to a neutral value, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<DataIssue>,
}

impl LevelDetail {
    fn record(&mut self, issue: DataIssue) {
        if self.error.is_none() {
            self.error = Some(issue);
        }
    }
}

/// Direction and strength of one trend level.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LevelResult {
    pub direction: Direction,
    pub strength: f64,
    pub detail: LevelDetail,
}

impl LevelResult {
    /// Non-voting result for a window shorter than the level's period.
    pub fn insufficient(period: usize, price: f64) -> Self {
        Self {
            direction: Direction::Undetermined,
            strength: 0.0,
            detail: LevelDetail {
                period,
                price,
                error: Some(DataIssue::InsufficientData),
                ..LevelDetail::default()
            },
        }
    }

    /// Level result with a given direction and strength and empty detail.
    ///
    /// Used by callers that inject precomputed level results into
    /// `Engine::aggregate`.
    pub fn with_direction(direction: Direction, strength: f64) -> Self {
        Self {
            direction,
            strength,
            detail: LevelDetail::default(),
        }
    }

    pub fn is_voting(&self) -> bool {
        self.direction != Direction::Undetermined
    }
}

/// Score one level over `candles` with the current `price`.
pub fn score_level(
    candles: &[Candle],
    price: f64,
    level: &LevelConfig,
    params: &EngineParams,
) -> LevelResult {
    if candles.len() < level.period {
        warn!(
            level = %level.label,
            period = level.period,
            candles = candles.len(),
            "window shorter than level period"
        );
        return LevelResult::insufficient(level.period, price);
    }

    let ma = Sma::new(level.period).compute(candles);
    let mut detail = LevelDetail {
        period: level.period,
        price,
        ma_value: last_finite(&ma),
        ..LevelDetail::default()
    };
    let angle = match measure_angle(&ma) {
        Ok(reading) => {
            detail.angle_degrees = Some(reading.degrees);
            detail.slope = Some(reading.slope);
            detail.normalized_slope = Some(reading.normalized_slope);
            detail.angle_classification = reading.class;
            detail.angle_direction = reading.direction;
            detail.angle_score = angle_score(&reading);
            Some(reading)
        }
        Err(issue) => {
            detail.record(issue);
            None
        }
    };

    let window = consistency_window(ma.len(), params.consistency_window);
    match consistency_score(&ma, window) {
        Ok(points) => detail.consistency_score = points,
        Err(issue) => detail.record(issue),
    }

    match detail.ma_value.map(|ma| distance_score(price, ma)) {
        Some(Ok(points)) => detail.distance_score = points,
        Some(Err(issue)) => detail.record(issue),
        None => detail.record(DataIssue::InsufficientData),
    }

    let swing = classify_swings(candles, params.swing_lookback, params.swing_threshold);
    detail.swing_type = swing.swing_type;
    detail.swing_confirmed = swing.confirmed;
    if let Some(reading) = &angle {
        if swing.confirmed && swing.swing_type == reading.direction {
            detail.swing_bonus = SWING_BONUS;
        }
    }

    match classify_fractal(candles, params.fractal_window) {
        Ok(fractal) => {
            detail.fractal_pattern = fractal.pattern;
            detail.impulse_strength = fractal.impulse_strength;
            detail.impulse_count = fractal.impulses;
            detail.retracement_count = fractal.retracements;
            detail.fractal_bonus = fractal.pattern_bonus();
            detail.impulse_adjustment = fractal.impulse_adjustment();
        }
        Err(issue) => detail.record(issue),
    }

    // Without an angle the level neither votes nor weighs in; the sub-scores
    // stay in the detail.
    let strength = if angle.is_some() {
        (detail.angle_score
            + detail.consistency_score
            + detail.distance_score
            + detail.swing_bonus
            + detail.fractal_bonus
            + detail.impulse_adjustment)
            .clamp(0.0, 100.0)
    } else {
        0.0
    };

    let direction = match &angle {
        None => Direction::Undetermined,
        Some(reading)
            if reading.class == AngleClass::Consolidacion
                || reading.direction == Direction::Lateral =>
        {
            Direction::Lateral
        }
        Some(_) if swing.confirmed && swing.swing_type != Direction::Undetermined => {
            swing.swing_type
        }
        Some(reading) => reading.direction,
    };

    if let Some(issue) = detail.error {
        warn!(level = %level.label, %issue, "level degraded");
    }
    debug!(
        level = %level.label,
        %direction,
        strength,
        angle = ?detail.angle_degrees,
        class = detail.angle_classification.as_str(),
        "level scored"
    );

    LevelResult {
        direction,
        strength,
        detail,
    }
}
