//! Pullback-entry validator.
//!
//! A high pre-gate score is only trusted when the entry looks like a pullback
//! inside the trend. The validator runs an ordered list of named checks; the
//! first failure rejects the entry and is reported. Bonus flags are recorded
//! whether or not the entry passes and never gate it.

use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::info;

use crate::config::PullbackParams;
use crate::domain::{Candle, Direction, SrZone};
use crate::indicators::{last_finite, previous_finite, Adx, Indicator, Rsi, Sma};
use crate::metrics::relative_distance;

/// Bullish entries below this RSI that is rising are recovering.
pub const RSI_RECOVERY_BULLISH: f64 = 45.0;
/// Bearish entries above this RSI that is falling are recovering.
pub const RSI_RECOVERY_BEARISH: f64 = 55.0;

/// Non-gating bonus observations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PullbackFlag {
    RsiRecovering,
    StrongAdx,
    SrZone,
}

impl PullbackFlag {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RsiRecovering => "rsi_recovering",
            Self::StrongAdx => "strong_adx",
            Self::SrZone => "sr_zone",
        }
    }
}

/// Why a pullback entry was rejected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum PullbackRejection {
    NonDirectionalSignal {
        signal: Direction,
    },
    HeaviestLevelDisagrees {
        level: String,
        direction: Direction,
        signal: Direction,
    },
    MovingAverageUnavailable,
    PriceFarFromAverage {
        distance: f64,
        max: f64,
    },
    WeakCandleBody {
        body_ratio: f64,
        min: f64,
    },
    CandleAgainstSignal {
        candle: Direction,
        signal: Direction,
    },
    RsiUnavailable,
    RsiBelowBand {
        rsi: f64,
        min: f64,
    },
    RsiAboveBand {
        rsi: f64,
        max: f64,
    },
    AdxUnavailable,
    InsufficientTrendStrength {
        adx: f64,
        min: f64,
    },
}

impl PullbackRejection {
    /// The check that produced this rejection.
    pub fn check(&self) -> PullbackCheck {
        match self {
            Self::NonDirectionalSignal { .. } | Self::HeaviestLevelDisagrees { .. } => {
                PullbackCheck::TrendAlignment
            }
            Self::MovingAverageUnavailable | Self::PriceFarFromAverage { .. } => {
                PullbackCheck::MaProximity
            }
            Self::WeakCandleBody { .. } | Self::CandleAgainstSignal { .. } => {
                PullbackCheck::ConfirmationCandle
            }
            Self::RsiUnavailable | Self::RsiBelowBand { .. } | Self::RsiAboveBand { .. } => {
                PullbackCheck::RsiBand
            }
            Self::AdxUnavailable | Self::InsufficientTrendStrength { .. } => {
                PullbackCheck::TrendStrength
            }
        }
    }
}

impl fmt::Display for PullbackRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NonDirectionalSignal { signal } => {
                write!(f, "no directional signal ({signal})")
            }
            Self::HeaviestLevelDisagrees {
                level,
                direction,
                signal,
            } => write!(f, "level {level} is {direction}, signal is {signal}"),
            Self::MovingAverageUnavailable => f.write_str("moving average not available"),
            Self::PriceFarFromAverage { distance, max } => write!(
                f,
                "price {:.2}% from the moving average (max {:.2}%)",
                distance * 100.0,
                max * 100.0
            ),
            Self::WeakCandleBody { body_ratio, min } => write!(
                f,
                "confirmation candle body {:.0}% of range (min {:.0}%)",
                body_ratio * 100.0,
                min * 100.0
            ),
            Self::CandleAgainstSignal { candle, signal } => {
                write!(f, "confirmation candle is {candle}, signal is {signal}")
            }
            Self::RsiUnavailable => f.write_str("RSI not available"),
            Self::RsiBelowBand { rsi, min } => write!(f, "RSI {rsi:.1} below {min:.0}"),
            Self::RsiAboveBand { rsi, max } => write!(f, "RSI {rsi:.1} above {max:.0}"),
            Self::AdxUnavailable => f.write_str("ADX not available"),
            Self::InsufficientTrendStrength { adx, min } => {
                write!(f, "insufficient trend strength: ADX {adx:.1} below {min:.0}")
            }
        }
    }
}

/// Market readings the checks run against.
#[derive(Debug, Clone, PartialEq)]
pub struct PullbackContext {
    pub signal: Direction,
    pub heaviest_label: String,
    pub heaviest_direction: Direction,
    pub price: f64,
    pub ma_value: Option<f64>,
    pub body_ratio: Option<f64>,
    /// Direction of the latest candle; undetermined for a doji.
    pub candle_direction: Direction,
    pub rsi: Option<f64>,
    pub previous_rsi: Option<f64>,
    pub adx: Option<f64>,
}

impl PullbackContext {
    /// Compute the readings from the candle window.
    pub fn from_candles(
        candles: &[Candle],
        price: f64,
        signal: Direction,
        heaviest_label: impl Into<String>,
        heaviest_direction: Direction,
        params: &PullbackParams,
    ) -> Self {
        let latest = candles.last();
        let rsi = Rsi::new(params.rsi_period).compute(candles);
        Self {
            signal,
            heaviest_label: heaviest_label.into(),
            heaviest_direction,
            price,
            ma_value: last_finite(&Sma::new(params.ma_period).compute(candles)),
            body_ratio: latest.and_then(Candle::body_ratio),
            candle_direction: latest
                .and_then(Candle::direction)
                .unwrap_or(Direction::Undetermined),
            rsi: last_finite(&rsi),
            previous_rsi: previous_finite(&rsi),
            adx: last_finite(&Adx::new(params.adx_period).compute(candles)),
        }
    }

    pub fn ma_distance(&self) -> Option<f64> {
        self.ma_value
            .and_then(|ma| relative_distance(self.price, ma).ok())
    }
}

/// One named validation step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PullbackCheck {
    TrendAlignment,
    MaProximity,
    ConfirmationCandle,
    RsiBand,
    TrendStrength,
}

impl PullbackCheck {
    /// Evaluation order. The first failing check is the reported one.
    pub const ORDER: [PullbackCheck; 5] = [
        Self::TrendAlignment,
        Self::MaProximity,
        Self::ConfirmationCandle,
        Self::RsiBand,
        Self::TrendStrength,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::TrendAlignment => "trend_alignment",
            Self::MaProximity => "ma_proximity",
            Self::ConfirmationCandle => "confirmation_candle",
            Self::RsiBand => "rsi_band",
            Self::TrendStrength => "trend_strength",
        }
    }

    pub fn run(
        &self,
        ctx: &PullbackContext,
        params: &PullbackParams,
    ) -> Result<(), PullbackRejection> {
        match self {
            Self::TrendAlignment => {
                if !ctx.signal.is_directional() {
                    return Err(PullbackRejection::NonDirectionalSignal { signal: ctx.signal });
                }
                if ctx.heaviest_direction != ctx.signal {
                    return Err(PullbackRejection::HeaviestLevelDisagrees {
                        level: ctx.heaviest_label.clone(),
                        direction: ctx.heaviest_direction,
                        signal: ctx.signal,
                    });
                }
                Ok(())
            }
            Self::MaProximity => {
                let distance = ctx
                    .ma_distance()
                    .ok_or(PullbackRejection::MovingAverageUnavailable)?;
                if distance > params.max_ma_distance {
                    return Err(PullbackRejection::PriceFarFromAverage {
                        distance,
                        max: params.max_ma_distance,
                    });
                }
                Ok(())
            }
            Self::ConfirmationCandle => {
                let body_ratio = ctx.body_ratio.unwrap_or(0.0);
                if body_ratio < params.min_body_ratio {
                    return Err(PullbackRejection::WeakCandleBody {
                        body_ratio,
                        min: params.min_body_ratio,
                    });
                }
                if ctx.candle_direction != ctx.signal {
                    return Err(PullbackRejection::CandleAgainstSignal {
                        candle: ctx.candle_direction,
                        signal: ctx.signal,
                    });
                }
                Ok(())
            }
            Self::RsiBand => {
                let rsi = ctx.rsi.ok_or(PullbackRejection::RsiUnavailable)?;
                let band = if ctx.signal == Direction::Bearish {
                    params.bearish_rsi
                } else {
                    params.bullish_rsi
                };
                if rsi < band.min {
                    return Err(PullbackRejection::RsiBelowBand { rsi, min: band.min });
                }
                if rsi > band.max {
                    return Err(PullbackRejection::RsiAboveBand { rsi, max: band.max });
                }
                Ok(())
            }
            Self::TrendStrength => {
                let adx = ctx.adx.ok_or(PullbackRejection::AdxUnavailable)?;
                if adx < params.min_adx {
                    return Err(PullbackRejection::InsufficientTrendStrength {
                        adx,
                        min: params.min_adx,
                    });
                }
                Ok(())
            }
        }
    }
}

/// Readings and bonus flags recorded for the console.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PullbackDetail {
    pub price: f64,
    pub ma_value: Option<f64>,
    pub ma_distance: Option<f64>,
    pub body_ratio: Option<f64>,
    pub candle_direction: Direction,
    pub rsi: Option<f64>,
    pub previous_rsi: Option<f64>,
    pub adx: Option<f64>,
    pub flags: Vec<PullbackFlag>,
}

/// Pullback validator outcome of a scored (non-vetoed) assessment.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PullbackStatus {
    /// Pre-gate effectiveness was below the gate.
    #[default]
    NotEvaluated,
    Confirmed {
        detail: PullbackDetail,
    },
    Rejected {
        rejection: PullbackRejection,
        detail: PullbackDetail,
    },
}

impl PullbackStatus {
    pub fn is_evaluated(&self) -> bool {
        !matches!(self, Self::NotEvaluated)
    }

    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Confirmed { .. })
    }

    pub fn rejection(&self) -> Option<&PullbackRejection> {
        match self {
            Self::Rejected { rejection, .. } => Some(rejection),
            _ => None,
        }
    }

    pub fn detail(&self) -> Option<&PullbackDetail> {
        match self {
            Self::NotEvaluated => None,
            Self::Confirmed { detail } | Self::Rejected { detail, .. } => Some(detail),
        }
    }
}

fn bonus_flags(ctx: &PullbackContext, zones: &[SrZone], params: &PullbackParams) -> Vec<PullbackFlag> {
    let mut flags = Vec::new();

    if let (Some(rsi), Some(prev)) = (ctx.rsi, ctx.previous_rsi) {
        let recovering = match ctx.signal {
            Direction::Bullish => rsi < RSI_RECOVERY_BULLISH && rsi > prev,
            Direction::Bearish => rsi > RSI_RECOVERY_BEARISH && rsi < prev,
            _ => false,
        };
        if recovering {
            flags.push(PullbackFlag::RsiRecovering);
        }
    }

    if ctx.adx.is_some_and(|adx| adx > params.strong_adx) {
        flags.push(PullbackFlag::StrongAdx);
    }

    let price = ctx.price;
    let near_zone = price > 0.0
        && zones.iter().any(|zone| {
            let close_enough = (price - zone.price_level).abs() / price <= params.sr_proximity;
            let right_side = match ctx.signal {
                Direction::Bullish => zone.price_level <= price,
                Direction::Bearish => zone.price_level >= price,
                _ => false,
            };
            close_enough && right_side
        });
    if near_zone {
        flags.push(PullbackFlag::SrZone);
    }

    flags
}

/// Run every check in order and record the readings.
pub fn validate_pullback(
    ctx: &PullbackContext,
    zones: &[SrZone],
    params: &PullbackParams,
) -> PullbackStatus {
    let detail = PullbackDetail {
        price: ctx.price,
        ma_value: ctx.ma_value,
        ma_distance: ctx.ma_distance(),
        body_ratio: ctx.body_ratio,
        candle_direction: ctx.candle_direction,
        rsi: ctx.rsi,
        previous_rsi: ctx.previous_rsi,
        adx: ctx.adx,
        flags: bonus_flags(ctx, zones, params),
    };

    match PullbackCheck::ORDER
        .iter()
        .try_for_each(|check| check.run(ctx, params))
    {
        Ok(()) => {
            info!(signal = %ctx.signal, flags = detail.flags.len(), "pullback confirmed");
            PullbackStatus::Confirmed { detail }
        }
        Err(rejection) => {
            info!(
                signal = %ctx.signal,
                check = rejection.check().name(),
                %rejection,
                "pullback rejected"
            );
            PullbackStatus::Rejected { rejection, detail }
        }
    }
}

/// Effectiveness after the gate: confirmation adds the bonus (capped at 100),
/// rejection scales down and caps.
pub fn apply_gate(effectiveness: f64, status: &PullbackStatus, params: &PullbackParams) -> f64 {
    match status {
        PullbackStatus::NotEvaluated => effectiveness,
        PullbackStatus::Confirmed { .. } => (effectiveness + params.confirmation_bonus).min(100.0),
        PullbackStatus::Rejected { .. } => {
            (effectiveness * params.rejection_factor).min(params.rejection_cap)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Readings that pass every check for a bullish signal.
    fn passing_context() -> PullbackContext {
        PullbackContext {
            signal: Direction::Bullish,
            heaviest_label: "secundaria".into(),
            heaviest_direction: Direction::Bullish,
            price: 100.1,
            ma_value: Some(100.0),
            body_ratio: Some(0.7),
            candle_direction: Direction::Bullish,
            rsi: Some(42.0),
            previous_rsi: Some(38.0),
            adx: Some(30.0),
        }
    }

    fn rejection_of(ctx: &PullbackContext) -> Option<PullbackRejection> {
        validate_pullback(ctx, &[], &PullbackParams::default())
            .rejection()
            .cloned()
    }

    #[test]
    fn all_checks_pass() {
        let status = validate_pullback(&passing_context(), &[], &PullbackParams::default());
        assert!(status.is_valid());
        let detail = status.detail().unwrap();
        assert_eq!(detail.flags, vec![PullbackFlag::RsiRecovering]);
        assert!((detail.ma_distance.unwrap() - 0.001).abs() < 1e-9);
    }

    #[test]
    fn heaviest_level_must_agree() {
        let ctx = PullbackContext {
            heaviest_direction: Direction::Lateral,
            ..passing_context()
        };
        let rejection = rejection_of(&ctx).unwrap();
        assert_eq!(rejection.check(), PullbackCheck::TrendAlignment);
        assert_eq!(
            rejection.to_string(),
            "level secundaria is lateral, signal is alcista"
        );
    }

    #[test]
    fn lateral_signal_is_rejected() {
        let ctx = PullbackContext {
            signal: Direction::Lateral,
            heaviest_direction: Direction::Lateral,
            ..passing_context()
        };
        assert!(matches!(
            rejection_of(&ctx),
            Some(PullbackRejection::NonDirectionalSignal { .. })
        ));
    }

    #[test]
    fn price_far_from_average() {
        let ctx = PullbackContext {
            price: 100.5,
            ..passing_context()
        };
        assert!(matches!(
            rejection_of(&ctx),
            Some(PullbackRejection::PriceFarFromAverage { .. })
        ));

        let ctx = PullbackContext {
            ma_value: None,
            ..passing_context()
        };
        assert_eq!(
            rejection_of(&ctx),
            Some(PullbackRejection::MovingAverageUnavailable)
        );
    }

    #[test]
    fn confirmation_candle_checks() {
        let ctx = PullbackContext {
            body_ratio: Some(0.3),
            ..passing_context()
        };
        assert!(matches!(
            rejection_of(&ctx),
            Some(PullbackRejection::WeakCandleBody { .. })
        ));

        let ctx = PullbackContext {
            candle_direction: Direction::Bearish,
            ..passing_context()
        };
        assert_eq!(
            rejection_of(&ctx),
            Some(PullbackRejection::CandleAgainstSignal {
                candle: Direction::Bearish,
                signal: Direction::Bullish,
            })
        );
    }

    #[test]
    fn rsi_band_names_the_violated_boundary() {
        let ctx = PullbackContext {
            rsi: Some(60.0),
            ..passing_context()
        };
        assert_eq!(
            rejection_of(&ctx),
            Some(PullbackRejection::RsiAboveBand {
                rsi: 60.0,
                max: 55.0
            })
        );

        let ctx = PullbackContext {
            signal: Direction::Bearish,
            heaviest_direction: Direction::Bearish,
            candle_direction: Direction::Bearish,
            rsi: Some(40.0),
            ..passing_context()
        };
        assert_eq!(
            rejection_of(&ctx),
            Some(PullbackRejection::RsiBelowBand {
                rsi: 40.0,
                min: 45.0
            })
        );
    }

    #[test]
    fn weak_adx_is_insufficient_trend_strength() {
        let ctx = PullbackContext {
            adx: Some(22.0),
            ..passing_context()
        };
        let rejection = rejection_of(&ctx).unwrap();
        assert_eq!(rejection.check(), PullbackCheck::TrendStrength);
        assert!(rejection.to_string().starts_with("insufficient trend strength"));
    }

    #[test]
    fn first_failure_wins() {
        let ctx = PullbackContext {
            price: 110.0,
            rsi: Some(90.0),
            adx: Some(5.0),
            ..passing_context()
        };
        assert_eq!(rejection_of(&ctx).unwrap().check(), PullbackCheck::MaProximity);
    }

    #[test]
    fn flags_do_not_gate() {
        let ctx = PullbackContext {
            adx: Some(40.0),
            price: 110.0,
            ..passing_context()
        };
        let zones = [SrZone::new(109.8, 3.0)];
        let status = validate_pullback(&ctx, &zones, &PullbackParams::default());
        assert!(!status.is_valid());
        let flags = &status.detail().unwrap().flags;
        assert!(flags.contains(&PullbackFlag::StrongAdx));
        assert!(flags.contains(&PullbackFlag::SrZone));
    }

    #[test]
    fn sr_zone_must_be_on_the_right_side() {
        let params = PullbackParams::default();
        let ctx = passing_context();
        let above = [SrZone::new(100.2, 1.0)];
        let status = validate_pullback(&ctx, &above, &params);
        assert!(!status.detail().unwrap().flags.contains(&PullbackFlag::SrZone));

        let below = [SrZone::new(100.0, 1.0)];
        let status = validate_pullback(&ctx, &below, &params);
        assert!(status.detail().unwrap().flags.contains(&PullbackFlag::SrZone));
    }

    #[test]
    fn gate_effect_on_effectiveness() {
        let params = PullbackParams::default();
        let confirmed = validate_pullback(&passing_context(), &[], &params);
        assert_eq!(apply_gate(75.0, &confirmed, &params), 85.0);
        assert_eq!(apply_gate(95.0, &confirmed, &params), 100.0);

        let rejected = validate_pullback(
            &PullbackContext {
                adx: None,
                ..passing_context()
            },
            &[],
            &params,
        );
        assert_eq!(rejected.rejection(), Some(&PullbackRejection::AdxUnavailable));
        assert_eq!(apply_gate(75.0, &rejected, &params), 45.0);
        assert_eq!(apply_gate(100.0, &rejected, &params), 60.0);
        assert_eq!(apply_gate(75.0, &PullbackStatus::NotEvaluated, &params), 75.0);
    }

    #[test]
    fn context_from_rising_candles() {
        let candles: Vec<Candle> = (0..60)
            .map(|i| {
                let close = 100.0 + 0.1 * i as f64;
                let open = close - 0.1;
                Candle::new(open, close + 0.0125, open - 0.0125, close)
            })
            .collect();
        let ctx = PullbackContext::from_candles(
            &candles,
            candles[59].close,
            Direction::Bullish,
            "secundaria",
            Direction::Bullish,
            &PullbackParams::default(),
        );
        assert_eq!(ctx.candle_direction, Direction::Bullish);
        assert!((ctx.body_ratio.unwrap() - 0.8).abs() < 1e-6);
        assert!((ctx.ma_value.unwrap() - 103.45).abs() < 1e-9);
        assert!((ctx.rsi.unwrap() - 100.0).abs() < 1e-9);
        assert!((ctx.adx.unwrap() - 100.0).abs() < 1e-9);
    }

    #[test]
    fn status_wire_format() {
        let json = serde_json::to_value(PullbackStatus::NotEvaluated).unwrap();
        assert_eq!(json["status"], "not_evaluated");

        let rejection = PullbackRejection::RsiBelowBand {
            rsi: 30.0,
            min: 35.0,
        };
        let json = serde_json::to_value(&rejection).unwrap();
        assert_eq!(json["reason"], "rsi_below_band");
        assert_eq!(json["min"], 35.0);
    }
}
