//! Optional read-only inputs supplied by collaborating analyzers.

use serde::{Deserialize, Serialize};

use super::Direction;

/// Directional call published by another strategy analyzer.
///
/// Only inputs with `effectiveness > 60` take part in the external adjustment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExternalStrategyInput {
    pub direction: Direction,
    /// Confidence of the external call (0–100).
    pub effectiveness: f64,
}

impl ExternalStrategyInput {
    pub fn new(direction: Direction, effectiveness: f64) -> Self {
        Self {
            direction,
            effectiveness,
        }
    }
}

/// Support/resistance zone from the zone-detection collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SrZone {
    pub price_level: f64,
    pub strength: f64,
}

impl SrZone {
    pub fn new(price_level: f64, strength: f64) -> Self {
        Self {
            price_level,
            strength,
        }
    }
}
