//! Simple moving average of closes: the per-level trend line and the
//! pullback reference average.
//!
//! Lookback: period - 1.

use super::Indicator;
use crate::domain::Candle;

#[derive(Debug, Clone)]
pub struct Sma {
    period: usize,
    name: String,
}

impl Sma {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "SMA period must be >= 1");
        Self {
            period,
            name: format!("sma_{period}"),
        }
    }
}

impl Indicator for Sma {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.period - 1
    }

    fn compute(&self, candles: &[Candle]) -> Vec<f64> {
        let closes: Vec<f64> = candles.iter().map(|c| c.close).collect();
        sma_of_series(&closes, self.period)
    }
}

/// Mean of each trailing `period` window; NaN where the window is incomplete
/// or holds a NaN.
///
/// Each window is summed directly, so one bad value only affects the windows
/// that contain it.
pub fn sma_of_series(values: &[f64], period: usize) -> Vec<f64> {
    let mut result = vec![f64::NAN; values.len()];
    if period == 0 || values.len() < period {
        return result;
    }

    for (slot, window) in result[period - 1..].iter_mut().zip(values.windows(period)) {
        *slot = window.iter().sum::<f64>() / period as f64;
    }
    result
}
