//! Indicator implementations used by the scoring stages.
//!
//! Indicators are pure functions: candle history in, numeric series out, the
//! same length as the input with `f64::NAN` through the warmup prefix.
//! They are computed fresh per evaluation; nothing is cached across calls.

pub mod adx;
pub mod ema;
pub mod macd;
pub mod rsi;
pub mod sma;
pub mod smoothing;

pub use adx::Adx;
pub use macd::{Macd, MacdLine};
pub use rsi::Rsi;
pub use sma::Sma;

use crate::domain::Candle;

/// Trait for indicators.
///
/// Indicators take a full candle series and produce a numeric output series of
/// the same length. The first `lookback()` values are `f64::NAN` (warmup).
///
/// No value at index t may depend on candles after t.
pub trait Indicator: Send + Sync {
    /// Human-readable name (e.g., "sma_20", "adx_14").
    fn name(&self) -> &str;

    /// Number of candles needed before the indicator produces valid output.
    fn lookback(&self) -> usize;

    /// Compute the indicator for the entire candle series.
    fn compute(&self, candles: &[Candle]) -> Vec<f64>;
}

/// Last element of a series if it is finite.
pub fn last_finite(series: &[f64]) -> Option<f64> {
    series.last().copied().filter(|v| v.is_finite())
}

/// Second-to-last element of a series if it is finite.
pub fn previous_finite(series: &[f64]) -> Option<f64> {
    let n = series.len();
    if n < 2 {
        return None;
    }
    Some(series[n - 2]).filter(|v| v.is_finite())
}

/// Create synthetic candles from close prices for testing.
///
/// open = prev_close (or close for the first candle),
/// high = max(open,close) + 1.0, low = min(open,close) - 1.0.
#[cfg(test)]
pub fn make_candles(closes: &[f64]) -> Vec<Candle> {
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| {
            let open = if i == 0 { close } else { closes[i - 1] };
            let high = open.max(close) + 1.0;
            let low = open.min(close) - 1.0;
            Candle::new(open, high, low, close)
        })
        .collect()
}

/// Assert two f64 values are approximately equal (within epsilon).
#[cfg(test)]
pub fn assert_approx(actual: f64, expected: f64, epsilon: f64) {
    assert!(
        (actual - expected).abs() < epsilon,
        "assert_approx failed: actual={actual}, expected={expected}, diff={}, epsilon={epsilon}",
        (actual - expected).abs()
    );
}

/// Default epsilon for indicator tests.
#[cfg(test)]
pub const DEFAULT_EPSILON: f64 = 1e-10;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn last_finite_requires_finite_tail() {
        assert_eq!(last_finite(&[1.0, 2.0]), Some(2.0));
        assert_eq!(last_finite(&[1.0, f64::NAN]), None);
        assert_eq!(last_finite(&[]), None);
    }

    #[test]
    fn previous_finite_reads_second_to_last() {
        assert_eq!(previous_finite(&[1.0, 2.0, 3.0]), Some(2.0));
        assert_eq!(previous_finite(&[3.0]), None);
        assert_eq!(previous_finite(&[f64::NAN, 3.0]), None);
    }
}
