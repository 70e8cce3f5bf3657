//! TrendGate Core: multi-level trend scoring and entry gating.
//!
//! This crate turns a window of OHLC candles into one directional call and a
//! 0–100 effectiveness score:
//! - Per-level metrics on moving averages (angle, consistency, distance)
//! - Swing high/low and fractal impulse/retracement classifiers
//! - Weighted multi-level aggregation with alignment voting
//! - Absolute lateral-market veto
//! - Pullback-entry validation gating high scores
//!
//! The engine is synchronous and performs no I/O. Level configuration is an
//! immutable, versioned snapshot; see [`config::LevelSetHandle`].

pub mod aggregate;
pub mod config;
pub mod domain;
pub mod engine;
pub mod error;
pub mod fractal;
pub mod indicators;
pub mod level;
pub mod metrics;
pub mod pullback;
pub mod strength;
pub mod summary;
pub mod swing;
pub mod veto;

pub use config::{EngineConfig, EngineParams, LevelConfig, LevelSet, LevelSetHandle};
pub use domain::{Candle, Direction, ExternalStrategyInput, SrZone};
pub use engine::{Assessment, Engine, EvaluationInput, Outcome};
pub use error::{ConfigError, DataIssue};
