//! Fractal impulse/retracement classifier.
//!
//! Each candle in the window is an impulse when it closes in the prevailing
//! direction of the window and a retracement when it closes against it.
//! Candle bodies grade the quality of the move.

use serde::{Deserialize, Serialize};

use crate::domain::{Candle, Direction};
use crate::error::DataIssue;

/// Body/range ratio above which a candle is strong.
pub const STRONG_BODY_RATIO: f64 = 0.6;
/// Body/range ratio below which a candle is weak.
pub const WEAK_BODY_RATIO: f64 = 0.3;

/// Points added when the window shows an impulse followed by a retracement.
pub const PATTERN_BONUS: f64 = 5.0;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FractalPattern {
    ImpulsoRetroceso,
    ImpulsoContinuo,
    #[default]
    Indefinido,
}

impl FractalPattern {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ImpulsoRetroceso => "impulso_retroceso",
            Self::ImpulsoContinuo => "impulso_continuo",
            Self::Indefinido => "indefinido",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImpulseStrength {
    FuerteAcelerada,
    FuerteLenta,
    Debil,
    #[default]
    Indefinida,
}

impl ImpulseStrength {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FuerteAcelerada => "fuerte_acelerada",
            Self::FuerteLenta => "fuerte_lenta",
            Self::Debil => "debil",
            Self::Indefinida => "indefinida",
        }
    }

    /// Score adjustment carried into the level score.
    pub fn adjustment(&self) -> f64 {
        match self {
            Self::FuerteAcelerada => 10.0,
            Self::FuerteLenta => 7.0,
            Self::Debil => -5.0,
            Self::Indefinida => 0.0,
        }
    }
}

/// Candle counts and classification of one fractal window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct FractalReading {
    pub prevailing: Direction,
    pub pattern: FractalPattern,
    pub impulse_strength: ImpulseStrength,
    pub window: usize,
    pub impulses: usize,
    pub retracements: usize,
    pub strong: usize,
    pub weak: usize,
}

impl FractalReading {
    pub fn pattern_bonus(&self) -> f64 {
        if self.pattern == FractalPattern::ImpulsoRetroceso {
            PATTERN_BONUS
        } else {
            0.0
        }
    }

    pub fn impulse_adjustment(&self) -> f64 {
        self.impulse_strength.adjustment()
    }
}

/// Classify the last `window` candles.
pub fn classify_fractal(candles: &[Candle], window: usize) -> Result<FractalReading, DataIssue> {
    if window < 2 || candles.len() < window {
        return Err(DataIssue::InsufficientData);
    }
    let slice = &candles[candles.len() - window..];

    let first = slice[0].close;
    let last = slice[window - 1].close;
    let prevailing = if last > first {
        Direction::Bullish
    } else {
        Direction::Bearish
    };
    let against = prevailing.opposite();

    let mut reading = FractalReading {
        prevailing,
        window,
        ..FractalReading::default()
    };

    for candle in slice {
        match candle.direction() {
            Some(d) if d == prevailing => reading.impulses += 1,
            Some(d) if Some(d) == against => reading.retracements += 1,
            _ => {}
        }
        match candle.body_ratio() {
            Some(r) if r > STRONG_BODY_RATIO => reading.strong += 1,
            Some(r) if r < WEAK_BODY_RATIO => reading.weak += 1,
            _ => {}
        }
    }

    // Fractions compared as integers: count / window >= k / 10.
    let at_least = |count: usize, tenths: usize| count * 10 >= window * tenths;

    reading.impulse_strength = if at_least(reading.strong, 6) {
        ImpulseStrength::FuerteAcelerada
    } else if at_least(reading.weak, 5) && at_least(reading.impulses, 7) {
        ImpulseStrength::FuerteLenta
    } else {
        ImpulseStrength::Debil
    };

    reading.pattern = if at_least(reading.impulses, 5) && at_least(reading.retracements, 2) {
        FractalPattern::ImpulsoRetroceso
    } else if at_least(reading.impulses, 5) {
        FractalPattern::ImpulsoContinuo
    } else {
        FractalPattern::Indefinido
    };

    Ok(reading)
}
