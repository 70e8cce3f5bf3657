//! Candle: the fundamental market data unit.

use serde::{Deserialize, Serialize};

use super::Direction;

/// OHLC candle for one fixed-length interval.
///
/// Candles carry no timestamp: position in the slice handed to the engine is
/// the only ordering key (ascending time, fixed periodicity).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
}

impl Candle {
    pub fn new(open: f64, high: f64, low: f64, close: f64) -> Self {
        Self {
            open,
            high,
            low,
            close,
        }
    }

    /// Returns true if any OHLC field is NaN or infinite.
    pub fn is_void(&self) -> bool {
        !(self.open.is_finite()
            && self.high.is_finite()
            && self.low.is_finite()
            && self.close.is_finite())
    }

    /// Basic OHLC sanity check: finite, positive, and high/low enclose open/close.
    pub fn is_sane(&self) -> bool {
        if self.is_void() {
            return false;
        }
        self.high >= self.low
            && self.high >= self.open
            && self.high >= self.close
            && self.low <= self.open
            && self.low <= self.close
            && self.low > 0.0
    }

    /// Absolute size of the real body.
    pub fn body(&self) -> f64 {
        (self.close - self.open).abs()
    }

    /// Full high-low range.
    pub fn range(&self) -> f64 {
        self.high - self.low
    }

    /// Body as a fraction of range. `None` for zero-range candles.
    pub fn body_ratio(&self) -> Option<f64> {
        let range = self.range();
        if range > 0.0 && range.is_finite() {
            Some(self.body() / range)
        } else {
            None
        }
    }

    /// Bullish when close > open, bearish when close < open, `None` for a doji.
    pub fn direction(&self) -> Option<Direction> {
        if self.close > self.open {
            Some(Direction::Bullish)
        } else if self.close < self.open {
            Some(Direction::Bearish)
        } else {
            None
        }
    }
}
