//! Error and degradation types.
//!
//! `ConfigError` is the only hard failure and is raised when a level set is
//! built, never during an evaluation. Evaluation-time problems degrade to a
//! neutral value tagged with a `DataIssue`.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Structured error for invalid level configuration.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("no trend levels configured")]
    NoLevels,

    #[error("level '{label}' has period 0")]
    ZeroPeriod { label: String },

    #[error("level '{label}' weight {weight} outside [0, 1]")]
    WeightOutOfRange { label: String, weight: f64 },

    #[error("level weights sum to {sum}, expected 1.0")]
    WeightSum { sum: f64 },

    #[error("duplicate level label '{0}'")]
    DuplicateLabel(String),

    #[error("parameter '{name}' {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    #[error("parse configuration: {0}")]
    Parse(String),
}

/// Machine-readable tag for a component that degraded to a neutral value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataIssue {
    /// Window shorter than the component needs.
    InsufficientData,
    /// Zero or non-finite denominator.
    DegenerateSeries,
}

impl DataIssue {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InsufficientData => "insufficient_data",
            Self::DegenerateSeries => "degenerate_series",
        }
    }
}

impl fmt::Display for DataIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
