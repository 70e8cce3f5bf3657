//! Relative Strength Index (RSI), the momentum band of the pullback check.
//!
//! Average gains and losses are Wilder-smoothed over `period` close changes;
//! RSI = 100 - 100 / (1 + avg_gain / avg_loss). Lookback: period.

use super::smoothing::wilder_smooth;
use super::Indicator;
use crate::domain::Candle;

#[derive(Debug, Clone)]
pub struct Rsi {
    period: usize,
    name: String,
}

impl Rsi {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "RSI period must be >= 1");
        Self {
            period,
            name: format!("rsi_{period}"),
        }
    }
}

impl Indicator for Rsi {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.period
    }

    fn compute(&self, candles: &[Candle]) -> Vec<f64> {
        // Index 0 has no previous close.
        let (gains, losses): (Vec<f64>, Vec<f64>) = std::iter::once((f64::NAN, f64::NAN))
            .chain(candles.windows(2).map(|pair| {
                let change = pair[1].close - pair[0].close;
                (change.max(0.0), (-change).max(0.0))
            }))
            .take(candles.len())
            .unzip();

        let avg_gain = wilder_smooth(&gains, self.period);
        let avg_loss = wilder_smooth(&losses, self.period);
        avg_gain
            .iter()
            .zip(&avg_loss)
            .map(|(&gain, &loss)| rsi_from_averages(gain, loss))
            .collect()
    }
}

fn rsi_from_averages(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_gain.is_nan() || avg_loss.is_nan() {
        f64::NAN
    } else if avg_loss == 0.0 {
        // No losses: overbought, or neutral when nothing moved at all.
        if avg_gain == 0.0 {
            50.0
        } else {
            100.0
        }
    } else {
        100.0 - 100.0 / (1.0 + avg_gain / avg_loss)
    }
}
