//! Multi-level aggregation: weighted base score, alignment voting and the
//! external-strategy adjustment.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

use crate::domain::{Direction, ExternalStrategyInput};

/// External inputs at or below this effectiveness do not take part.
pub const EXTERNAL_MIN_EFFECTIVENESS: f64 = 60.0;

/// Flat bonus when the heaviest level agrees with the predominant direction.
pub const HEAVIEST_AGREEMENT_BONUS: f64 = 5.0;

/// Sum of strength times weight. Weights are not renormalized when some levels are
/// undetermined, so missing levels lower the ceiling.
pub fn weighted_effectiveness(levels: impl IntoIterator<Item = (f64, f64)>) -> f64 {
    levels
        .into_iter()
        .map(|(weight, strength)| weight * strength)
        .sum()
}

/// Outcome of the direction vote across levels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Alignment {
    pub predominant: Direction,
    /// Levels voting for the predominant direction.
    pub agreeing: usize,
    /// Levels that voted at all (undetermined levels abstain).
    pub voters: usize,
    pub bonus: f64,
}

/// Bonus for the number of levels agreeing with the predominant direction.
///
/// The table covers three levels; larger sets saturate at the three-level
/// value.
pub fn alignment_bonus(agreeing: usize) -> f64 {
    match agreeing.min(3) {
        3 => 20.0,
        2 => 10.0,
        1 => -10.0,
        _ => -15.0,
    }
}

/// Majority vote over level directions. Undetermined levels abstain; no votes
/// or a tie on the top count yields an undetermined call with no bonus.
pub fn vote_alignment(directions: impl IntoIterator<Item = Direction>) -> Alignment {
    let mut counts: BTreeMap<Direction, usize> = BTreeMap::new();
    for direction in directions {
        if direction != Direction::Undetermined {
            *counts.entry(direction).or_default() += 1;
        }
    }
    let voters: usize = counts.values().sum();

    let top = counts.values().copied().max().unwrap_or(0);
    let leaders: Vec<Direction> = counts
        .iter()
        .filter(|(_, &count)| count == top)
        .map(|(&direction, _)| direction)
        .collect();

    let alignment = match leaders.as_slice() {
        [winner] => Alignment {
            predominant: *winner,
            agreeing: top,
            voters,
            bonus: alignment_bonus(top),
        },
        _ => Alignment {
            predominant: Direction::Undetermined,
            agreeing: 0,
            voters,
            bonus: 0.0,
        },
    };

    debug!(
        predominant = %alignment.predominant,
        agreeing = alignment.agreeing,
        voters,
        bonus = alignment.bonus,
        "alignment vote"
    );
    alignment
}

/// Adjustment contributed by other strategy analyzers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ExternalAdjustment {
    /// Inputs with effectiveness above the participation floor.
    pub qualifying: usize,
    pub agreeing: usize,
    /// Consensus part: +15, +10, 0 or -20.
    pub consensus: f64,
    /// +5 when the heaviest level agrees with the predominant direction.
    pub heaviest_bonus: f64,
}

impl ExternalAdjustment {
    pub fn total(&self) -> f64 {
        self.consensus + self.heaviest_bonus
    }
}

/// Score the external inputs against `predominant`.
///
/// `None` when no input qualifies; the assessment is then left unchanged.
/// A non-directional `predominant` has nothing to agree with: no input counts
/// as agreeing and the heaviest-level bonus is withheld.
pub fn external_adjustment(
    inputs: &[ExternalStrategyInput],
    predominant: Direction,
    heaviest_direction: Direction,
) -> Option<ExternalAdjustment> {
    let qualifying: Vec<&ExternalStrategyInput> = inputs
        .iter()
        .filter(|s| s.effectiveness > EXTERNAL_MIN_EFFECTIVENESS)
        .collect();
    if qualifying.is_empty() {
        return None;
    }

    let total = qualifying.len();
    let directional = predominant.is_directional();
    let agreeing = qualifying
        .iter()
        .filter(|s| directional && s.direction == predominant)
        .count();
    let mean = qualifying.iter().map(|s| s.effectiveness).sum::<f64>() / total as f64;

    // agreeing / total against 0.7 and 0.3, in integer arithmetic
    let consensus = if agreeing == total && mean > 70.0 {
        15.0
    } else if agreeing * 10 >= total * 7 {
        10.0
    } else if agreeing * 10 < total * 3 {
        -20.0
    } else {
        0.0
    };

    let heaviest_bonus = if directional && heaviest_direction == predominant {
        HEAVIEST_AGREEMENT_BONUS
    } else {
        0.0
    };

    Some(ExternalAdjustment {
        qualifying: total,
        agreeing,
        consensus,
        heaviest_bonus,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use Direction::{Bearish, Bullish, Lateral, Undetermined};

    #[test]
    fn weighted_sum_is_not_renormalized() {
        let strengths = [80.0, 60.0, 0.0];
        let weights = [0.5, 0.3, 0.2];
        let base = weighted_effectiveness(weights.into_iter().zip(strengths));
        assert!((base - 58.0).abs() < 1e-9);
    }

    #[test]
    fn full_agreement_gets_twenty() {
        let a = vote_alignment([Bullish, Bullish, Bullish]);
        assert_eq!(a.predominant, Bullish);
        assert_eq!(a.agreeing, 3);
        assert_eq!(a.bonus, 20.0);
    }

    #[test]
    fn two_of_three_gets_ten() {
        let a = vote_alignment([Bearish, Bullish, Bearish]);
        assert_eq!(a.predominant, Bearish);
        assert_eq!(a.bonus, 10.0);
    }

    #[test]
    fn lone_voter_gets_penalty() {
        let a = vote_alignment([Bullish, Undetermined, Undetermined]);
        assert_eq!(a.predominant, Bullish);
        assert_eq!(a.agreeing, 1);
        assert_eq!(a.voters, 1);
        assert_eq!(a.bonus, -10.0);
    }

    #[test]
    fn tie_is_undetermined() {
        let a = vote_alignment([Bullish, Bearish, Lateral]);
        assert_eq!(a.predominant, Undetermined);
        assert_eq!(a.bonus, 0.0);

        let a = vote_alignment([Bullish, Bearish, Undetermined]);
        assert_eq!(a.predominant, Undetermined);
        assert_eq!(a.bonus, 0.0);
    }

    #[test]
    fn no_votes_is_undetermined() {
        let a = vote_alignment([Undetermined, Undetermined, Undetermined]);
        assert_eq!(a.predominant, Undetermined);
        assert_eq!(a.voters, 0);
        assert_eq!(a.bonus, 0.0);
    }

    #[test]
    fn bonus_table_saturates() {
        assert_eq!(alignment_bonus(0), -15.0);
        assert_eq!(alignment_bonus(4), 20.0);
    }

    #[test]
    fn external_unanimous_and_confident() {
        let inputs = [
            ExternalStrategyInput::new(Bullish, 80.0),
            ExternalStrategyInput::new(Bullish, 75.0),
            ExternalStrategyInput::new(Bearish, 50.0), // below the floor
        ];
        let adj = external_adjustment(&inputs, Bullish, Bullish).unwrap();
        assert_eq!(adj.qualifying, 2);
        assert_eq!(adj.consensus, 15.0);
        assert_eq!(adj.heaviest_bonus, 5.0);
        assert_eq!(adj.total(), 20.0);
    }

    #[test]
    fn external_mostly_agreeing() {
        let mut inputs: Vec<_> = (0..7)
            .map(|_| ExternalStrategyInput::new(Bullish, 65.0))
            .collect();
        inputs.extend((0..3).map(|_| ExternalStrategyInput::new(Bearish, 65.0)));
        let adj = external_adjustment(&inputs, Bullish, Bearish).unwrap();
        assert_eq!(adj.consensus, 10.0);
        assert_eq!(adj.heaviest_bonus, 0.0);
    }

    #[test]
    fn external_unanimous_but_lukewarm_gets_ten() {
        let inputs = [ExternalStrategyInput::new(Bullish, 65.0)];
        let adj = external_adjustment(&inputs, Bullish, Bullish).unwrap();
        assert_eq!(adj.consensus, 10.0);
    }

    #[test]
    fn external_disagreement_penalized() {
        let inputs = [
            ExternalStrategyInput::new(Bearish, 90.0),
            ExternalStrategyInput::new(Bearish, 90.0),
            ExternalStrategyInput::new(Bearish, 90.0),
            ExternalStrategyInput::new(Bullish, 61.0),
        ];
        let adj = external_adjustment(&inputs, Bullish, Bullish).unwrap();
        assert_eq!(adj.agreeing, 1);
        assert_eq!(adj.consensus, -20.0);
        assert_eq!(adj.total(), -15.0);
    }

    #[test]
    fn external_split_is_neutral() {
        let inputs = [
            ExternalStrategyInput::new(Bearish, 90.0),
            ExternalStrategyInput::new(Bullish, 90.0),
        ];
        let adj = external_adjustment(&inputs, Bullish, Lateral).unwrap();
        assert_eq!(adj.consensus, 0.0);
        assert_eq!(adj.total(), 0.0);
    }

    #[test]
    fn external_without_qualifiers_is_none() {
        let inputs = [ExternalStrategyInput::new(Bullish, 60.0)];
        assert_eq!(external_adjustment(&inputs, Bullish, Bullish), None);
        assert_eq!(external_adjustment(&[], Bullish, Bullish), None);
    }

    #[test]
    fn external_cannot_agree_with_no_call() {
        let inputs = [
            ExternalStrategyInput::new(Undetermined, 90.0),
            ExternalStrategyInput::new(Undetermined, 80.0),
        ];
        let adj = external_adjustment(&inputs, Undetermined, Undetermined).unwrap();
        assert_eq!(adj.agreeing, 0);
        assert_eq!(adj.heaviest_bonus, 0.0);
        assert_eq!(adj.consensus, -20.0);

        let lateral = [ExternalStrategyInput::new(Lateral, 90.0)];
        let adj = external_adjustment(&lateral, Lateral, Lateral).unwrap();
        assert_eq!(adj.agreeing, 0);
        assert_eq!(adj.total(), -20.0);
    }
}
