//! Lateral-market veto.
//!
//! The veto is absolute: once it fires the assessment is forced to
//! `lateral` with effectiveness 0 and the pullback validator never runs.
//! Conditions are checked in a fixed order and the first match is reported.

use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::info;

use crate::config::VetoParams;
use crate::domain::{Candle, Direction};
use crate::indicators::{last_finite, Adx, Indicator};

/// Why the veto fired.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum VetoReason {
    /// Too many levels report a lateral market.
    LateralLevels { count: usize },
    /// ADX below the trend floor.
    WeakTrend { adx: f64, min: f64 },
    /// Recent high-low range too narrow relative to price.
    NarrowRange { ratio: f64, min: f64 },
}

impl fmt::Display for VetoReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LateralLevels { count } => write!(f, "{count} levels report a lateral market"),
            Self::WeakTrend { adx, min } => {
                write!(f, "ADX {adx:.1} below {min:.0}: market without trend")
            }
            Self::NarrowRange { ratio, min } => write!(
                f,
                "range {:.3}% below {:.3}%: market in a narrow band",
                ratio * 100.0,
                min * 100.0
            ),
        }
    }
}

/// (max high - min low) / mean close over the last `window` candles.
///
/// `None` with fewer than `window` candles or a non-positive mean.
pub fn range_ratio(candles: &[Candle], window: usize) -> Option<f64> {
    if window == 0 || candles.len() < window {
        return None;
    }
    let tail = &candles[candles.len() - window..];
    let high = tail.iter().map(|c| c.high).fold(f64::MIN, f64::max);
    let low = tail.iter().map(|c| c.low).fold(f64::MAX, f64::min);
    let mean = tail.iter().map(|c| c.close).sum::<f64>() / window as f64;
    if mean <= 0.0 || !mean.is_finite() {
        return None;
    }
    Some((high - low) / mean)
}

/// Check the veto conditions in order and return the first that holds.
///
/// The ADX condition is skipped when ADX is not yet defined for the window,
/// and the range condition when there are fewer than `range_window` candles.
pub fn check_veto(
    directions: impl IntoIterator<Item = Direction>,
    candles: &[Candle],
    params: &VetoParams,
) -> Option<VetoReason> {
    let lateral = directions
        .into_iter()
        .filter(|d| *d == Direction::Lateral)
        .count();

    let reason = if lateral >= params.lateral_levels {
        Some(VetoReason::LateralLevels { count: lateral })
    } else {
        let adx = last_finite(&Adx::new(params.adx_period).compute(candles));
        match adx {
            Some(adx) if adx < params.min_adx => Some(VetoReason::WeakTrend {
                adx,
                min: params.min_adx,
            }),
            _ => match range_ratio(candles, params.range_window) {
                Some(ratio) if ratio < params.min_range => Some(VetoReason::NarrowRange {
                    ratio,
                    min: params.min_range,
                }),
                _ => None,
            },
        }
    };

    if let Some(reason) = &reason {
        info!(%reason, "veto fired");
    }
    reason
}
