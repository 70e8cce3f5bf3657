//! Directional call vocabulary shared by every stage of the engine.
//!
//! The serialized names (`alcista`, `bajista`, `lateral`, `indefinida`) are the
//! wire contract consumed by the scheduler and console collaborators.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Directional call of a level, a vote, or the whole assessment.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub enum Direction {
    #[serde(rename = "alcista")]
    Bullish,
    #[serde(rename = "bajista")]
    Bearish,
    #[serde(rename = "lateral")]
    Lateral,
    #[default]
    #[serde(rename = "indefinida")]
    Undetermined,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Bullish => "alcista",
            Self::Bearish => "bajista",
            Self::Lateral => "lateral",
            Self::Undetermined => "indefinida",
        }
    }

    /// True for bullish or bearish.
    pub fn is_directional(&self) -> bool {
        matches!(self, Self::Bullish | Self::Bearish)
    }

    /// Opposite directional call. Lateral and undetermined have none.
    pub fn opposite(&self) -> Option<Direction> {
        match self {
            Self::Bullish => Some(Self::Bearish),
            Self::Bearish => Some(Self::Bullish),
            Self::Lateral | Self::Undetermined => None,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
