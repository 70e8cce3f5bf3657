//! Property tests for engine invariants.
//!
//! Uses proptest to verify:
//! 1. Bounded output: effectiveness is finite and within [0, 100]
//! 2. Veto consistency: a vetoed assessment is zero, lateral, unvalidated
//! 3. Determinism: identical inputs serialize identically
//! 4. Scale invariance: multiplying prices leaves the angle unchanged
//! 5. Robustness: arbitrary OHLC windows never panic

use proptest::prelude::*;
use trendgate_core::level::LevelResult;
use trendgate_core::metrics::measure_angle;
use trendgate_core::{Candle, Direction, Engine, EvaluationInput, ExternalStrategyInput};

// ── Strategies (proptest) ────────────────────────────────────────────

/// Random walk of sane candles starting near 100.
fn arb_window(max_len: usize) -> impl Strategy<Value = Vec<Candle>> {
    prop::collection::vec((-2.0..2.0_f64, 0.0..1.0_f64, 0.0..1.0_f64), 0..max_len).prop_map(
        |steps| {
            let mut close = 100.0;
            steps
                .into_iter()
                .map(|(step, up_wick, down_wick)| {
                    let open = close;
                    close = (close + step).max(1.0);
                    Candle::new(
                        open,
                        open.max(close) + up_wick,
                        open.min(close) - down_wick,
                        close,
                    )
                })
                .collect()
        },
    )
}

/// Unconstrained OHLC values, including inverted and non-positive bars.
fn arb_raw_candle() -> impl Strategy<Value = Candle> {
    (-50.0..500.0_f64, -50.0..500.0_f64, -50.0..500.0_f64, -50.0..500.0_f64)
        .prop_map(|(o, h, l, c)| Candle::new(o, h, l, c))
}

fn arb_direction() -> impl Strategy<Value = Direction> {
    prop_oneof![
        Just(Direction::Bullish),
        Just(Direction::Bearish),
        Just(Direction::Lateral),
        Just(Direction::Undetermined),
    ]
}

fn arb_strategies() -> impl Strategy<Value = Vec<ExternalStrategyInput>> {
    prop::collection::vec(
        (arb_direction(), 0.0..100.0_f64).prop_map(|(d, e)| ExternalStrategyInput::new(d, e)),
        0..5,
    )
}

// ── 1. Bounded Output ────────────────────────────────────────────────

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Effectiveness is always finite and within [0, 100].
    #[test]
    fn effectiveness_is_bounded(
        candles in arb_window(120),
        strategies in arb_strategies(),
    ) {
        let input = EvaluationInput::new(&candles).with_strategies(&strategies);
        let assessment = Engine::default().evaluate(&input);
        prop_assert!(assessment.effectiveness.is_finite());
        prop_assert!((0.0..=100.0).contains(&assessment.effectiveness));
        for level in assessment.levels.values() {
            prop_assert!((0.0..=100.0).contains(&level.strength));
        }
    }

    /// Injected strengths far outside [0, 100] are still clamped.
    #[test]
    fn injected_extremes_are_clamped(
        candles in arb_window(80),
        strengths in prop::collection::vec(-500.0..500.0_f64, 3),
        directions in prop::collection::vec(arb_direction(), 3),
    ) {
        let results = strengths
            .iter()
            .zip(&directions)
            .map(|(&s, &d)| LevelResult::with_direction(d, s))
            .collect();
        let assessment = Engine::default().aggregate(&EvaluationInput::new(&candles), results);
        prop_assert!((0.0..=100.0).contains(&assessment.effectiveness));
    }
}

// ── 2. Veto Consistency ──────────────────────────────────────────────

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// A vetoed assessment reports zero, lateral, and no pullback status.
    #[test]
    fn veto_forces_zero_lateral(
        candles in arb_window(120),
        strategies in arb_strategies(),
    ) {
        let input = EvaluationInput::new(&candles).with_strategies(&strategies);
        let assessment = Engine::default().evaluate(&input);
        if assessment.is_vetoed() {
            prop_assert_eq!(assessment.effectiveness, 0.0);
            prop_assert_eq!(assessment.direction, Direction::Lateral);
            prop_assert!(assessment.pullback().is_none());
            prop_assert!(assessment.external.is_none());
        } else {
            prop_assert!(assessment.pullback().is_some());
        }
    }

    /// Three lateral levels always veto, whatever their strength.
    #[test]
    fn lateral_majority_always_vetoes(
        candles in arb_window(80),
        strength in 0.0..100.0_f64,
    ) {
        let results = vec![LevelResult::with_direction(Direction::Lateral, strength); 3];
        let assessment = Engine::default().aggregate(&EvaluationInput::new(&candles), results);
        prop_assert!(assessment.is_vetoed());
        prop_assert_eq!(assessment.effectiveness, 0.0);
    }
}

// ── 3. Determinism ───────────────────────────────────────────────────

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn evaluation_is_deterministic(candles in arb_window(100)) {
        let engine = Engine::default();
        let input = EvaluationInput::new(&candles);
        let first = serde_json::to_string(&engine.evaluate(&input)).unwrap();
        let second = serde_json::to_string(&engine.evaluate(&input)).unwrap();
        prop_assert_eq!(first, second);
    }
}

// ── 4. Scale Invariance ──────────────────────────────────────────────

proptest! {
    /// The angle of a series does not depend on its price unit.
    #[test]
    fn angle_ignores_price_scale(
        start in 10.0..1000.0_f64,
        steps in prop::collection::vec(-0.02..0.02_f64, 10..30),
    ) {
        let mut value = start;
        let series: Vec<f64> = steps
            .iter()
            .map(|pct| {
                value *= 1.0 + pct;
                value
            })
            .collect();

        let base = measure_angle(&series).unwrap();
        for factor in [0.01, 100.0, 100_000.0] {
            let scaled: Vec<f64> = series.iter().map(|v| v * factor).collect();
            let reading = measure_angle(&scaled).unwrap();
            prop_assert!((reading.degrees - base.degrees).abs() < 1e-6);
            prop_assert_eq!(reading.class, base.class);
            prop_assert_eq!(reading.direction, base.direction);
        }
    }
}

// ── 5. Robustness ────────────────────────────────────────────────────

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Malformed bars degrade levels instead of panicking.
    #[test]
    fn arbitrary_candles_never_panic(
        candles in prop::collection::vec(arb_raw_candle(), 0..80),
        price in -10.0..500.0_f64,
    ) {
        let input = EvaluationInput::new(&candles).with_price(price);
        let assessment = Engine::default().evaluate(&input);
        prop_assert!((0.0..=100.0).contains(&assessment.effectiveness));
        prop_assert_eq!(assessment.levels.len(), 3);
    }
}
