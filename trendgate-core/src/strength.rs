//! Complementary trend-strength adjustment (ADX and MACD crossover).
//!
//! Opt-in post-processing applied after the pullback gate when
//! `EngineParams::trend_strength_adjustment` is set.

use serde::{Deserialize, Serialize};

use crate::domain::{Candle, Direction};
use crate::error::DataIssue;
use crate::indicators::macd::macd_lines;
use crate::indicators::{last_finite, Adx, Indicator};

pub const ADX_PERIOD: usize = 14;
pub const MACD_FAST: usize = 12;
pub const MACD_SLOW: usize = 26;
pub const MACD_SIGNAL: usize = 9;

/// ADX strictly above this counts as a strong trend.
pub const STRONG_TREND_ADX: f64 = 25.0;

/// Candles required before the assessment is attempted.
pub const MIN_CANDLES: usize = MACD_SLOW + 10;

const STRONG_TREND_BONUS: f64 = 8.0;
const CROSS_AGREES_BONUS: f64 = 5.0;
const CROSS_OPPOSES_PENALTY: f64 = -10.0;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MacdCross {
    #[serde(rename = "alcista")]
    Bullish,
    #[serde(rename = "bajista")]
    Bearish,
    #[default]
    Neutral,
}

impl MacdCross {
    pub fn as_direction(&self) -> Option<Direction> {
        match self {
            Self::Bullish => Some(Direction::Bullish),
            Self::Bearish => Some(Direction::Bearish),
            Self::Neutral => None,
        }
    }
}

/// ADX and MACD readings of the candle window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TrendStrength {
    pub adx: Option<f64>,
    pub strong_trend: bool,
    pub macd: Option<f64>,
    pub signal: Option<f64>,
    pub histogram: Option<f64>,
    pub cross: MacdCross,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<DataIssue>,
}

/// Reading plus the points it contributed to the assessment.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StrengthAdjustment {
    pub reading: TrendStrength,
    pub adjustment: f64,
}

/// Measure ADX(14) and MACD(12, 26, 9) on the window.
pub fn assess_trend_strength(candles: &[Candle]) -> TrendStrength {
    if candles.len() < MIN_CANDLES {
        return TrendStrength {
            error: Some(DataIssue::InsufficientData),
            ..TrendStrength::default()
        };
    }

    let adx = last_finite(&Adx::new(ADX_PERIOD).compute(candles));
    let closes: Vec<f64> = candles.iter().map(|c| c.close).collect();
    let (macd, signal, histogram) = macd_lines(&closes, MACD_FAST, MACD_SLOW, MACD_SIGNAL);
    let macd = last_finite(&macd);
    let signal = last_finite(&signal);
    let histogram = last_finite(&histogram);

    let cross = match (macd, signal, histogram) {
        (Some(m), Some(s), Some(h)) if m > s && h > 0.0 => MacdCross::Bullish,
        (Some(m), Some(s), Some(h)) if m < s && h < 0.0 => MacdCross::Bearish,
        _ => MacdCross::Neutral,
    };

    TrendStrength {
        adx,
        strong_trend: adx.is_some_and(|v| v > STRONG_TREND_ADX),
        macd,
        signal,
        histogram,
        cross,
        error: None,
    }
}

/// Points for `reading` relative to the assessment direction.
pub fn strength_adjustment(reading: &TrendStrength, direction: Direction) -> f64 {
    if reading.error.is_some() {
        return 0.0;
    }
    let mut points = 0.0;
    if reading.strong_trend {
        points += STRONG_TREND_BONUS;
    }
    if let Some(cross) = reading.cross.as_direction() {
        if cross == direction {
            points += CROSS_AGREES_BONUS;
        } else if Some(cross) == direction.opposite() {
            points += CROSS_OPPOSES_PENALTY;
        }
    }
    points
}
