//! Exponential moving average over a raw series, used by MACD.
//!
//! EMA[t] = alpha * x[t] + (1 - alpha) * EMA[t-1], alpha = 2 / (period + 1),
//! seeded with the mean of the first `period` values.

/// EMA of `values`, NaN through index `period - 2`.
///
/// A NaN inside the seed window leaves the whole result NaN; a later NaN ends
/// the series there.
pub fn ema_of_series(values: &[f64], period: usize) -> Vec<f64> {
    let mut result = vec![f64::NAN; values.len()];
    if period == 0 || values.len() < period {
        return result;
    }

    let (seed_window, rest) = values.split_at(period);
    if seed_window.iter().any(|v| v.is_nan()) {
        return result;
    }

    let alpha = 2.0 / (period as f64 + 1.0);
    let mut ema = seed_window.iter().sum::<f64>() / period as f64;
    result[period - 1] = ema;

    for (slot, &value) in result[period..].iter_mut().zip(rest) {
        if value.is_nan() {
            break;
        }
        ema += alpha * (value - ema);
        *slot = ema;
    }

    result
}
