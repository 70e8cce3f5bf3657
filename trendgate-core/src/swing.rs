//! Swing high/low classifier.
//!
//! The last `2 * lookback` candles are split into an older and a newer half.
//! Comparing the halves' highest high and lowest low tells whether the market
//! is printing higher highs and higher lows, lower ones, or flat ones.

use serde::{Deserialize, Serialize};

use crate::domain::{Candle, Direction};

/// Result of the swing classifier.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SwingReading {
    pub swing_type: Direction,
    pub confirmed: bool,
    /// (newer max high - older max high) / older max high.
    pub diff_max: Option<f64>,
    /// (newer min low - older min low) / older min low.
    pub diff_min: Option<f64>,
}

impl SwingReading {
    fn undetermined() -> Self {
        Self::default()
    }
}

fn extremes(candles: &[Candle]) -> (f64, f64) {
    candles.iter().fold((f64::MIN, f64::MAX), |(hi, lo), c| {
        (hi.max(c.high), lo.min(c.low))
    })
}

/// Classify the swing structure of the last `2 * lookback` candles.
///
/// Fewer candles, or non-positive extremes in the older half, yield an
/// unconfirmed `indefinida` reading.
pub fn classify_swings(candles: &[Candle], lookback: usize, threshold: f64) -> SwingReading {
    let span = 2 * lookback;
    if lookback == 0 || candles.len() < span {
        return SwingReading::undetermined();
    }
    let window = &candles[candles.len() - span..];
    let (older, newer) = window.split_at(lookback);

    let (max1, min1) = extremes(older);
    let (max2, min2) = extremes(newer);
    if max1 <= 0.0 || min1 <= 0.0 {
        return SwingReading::undetermined();
    }

    let diff_max = (max2 - max1) / max1;
    let diff_min = (min2 - min1) / min1;
    if !diff_max.is_finite() || !diff_min.is_finite() {
        return SwingReading::undetermined();
    }

    let swing_type = if diff_max > threshold && diff_min > threshold {
        Direction::Bullish
    } else if diff_max < -threshold && diff_min < -threshold {
        Direction::Bearish
    } else if diff_max.abs() <= threshold && diff_min.abs() <= threshold {
        Direction::Lateral
    } else {
        Direction::Undetermined
    };

    SwingReading {
        swing_type,
        confirmed: swing_type != Direction::Undetermined,
        diff_max: Some(diff_max),
        diff_min: Some(diff_min),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candles_from_hl(hl: &[(f64, f64)]) -> Vec<Candle> {
        hl.iter()
            .map(|&(high, low)| Candle::new(low, high, low, high))
            .collect()
    }

    #[test]
    fn higher_highs_and_lows_are_bullish() {
        let candles = candles_from_hl(&[
            (101.0, 99.0),
            (101.5, 99.5),
            (102.0, 100.0),
            (102.5, 100.5),
        ]);
        let reading = classify_swings(&candles, 2, 0.001);
        assert_eq!(reading.swing_type, Direction::Bullish);
        assert!(reading.confirmed);
    }

    #[test]
    fn lower_highs_and_lows_are_bearish() {
        let candles = candles_from_hl(&[
            (102.5, 100.5),
            (102.0, 100.0),
            (101.5, 99.5),
            (101.0, 99.0),
        ]);
        let reading = classify_swings(&candles, 2, 0.001);
        assert_eq!(reading.swing_type, Direction::Bearish);
        assert!(reading.confirmed);
    }

    #[test]
    fn flat_extremes_are_lateral() {
        let candles = candles_from_hl(&[(101.0, 99.0); 10]);
        let reading = classify_swings(&candles, 5, 0.001);
        assert_eq!(reading.swing_type, Direction::Lateral);
        assert!(reading.confirmed);
        assert_eq!(reading.diff_max, Some(0.0));
    }

    #[test]
    fn expanding_range_is_undetermined() {
        // higher high, lower low
        let candles = candles_from_hl(&[
            (101.0, 99.0),
            (101.0, 99.0),
            (103.0, 97.0),
            (103.0, 97.0),
        ]);
        let reading = classify_swings(&candles, 2, 0.001);
        assert_eq!(reading.swing_type, Direction::Undetermined);
        assert!(!reading.confirmed);
    }

    #[test]
    fn only_the_last_window_counts() {
        let mut hl = vec![(500.0, 400.0); 6];
        hl.extend([(101.0, 99.0), (101.5, 99.5), (102.0, 100.0), (102.5, 100.5)]);
        let reading = classify_swings(&candles_from_hl(&hl), 2, 0.001);
        assert_eq!(reading.swing_type, Direction::Bullish);
    }

    #[test]
    fn short_window_is_undetermined() {
        let candles = candles_from_hl(&[(101.0, 99.0); 9]);
        let reading = classify_swings(&candles, 5, 0.001);
        assert_eq!(reading, SwingReading::default());
    }
}
