//! Domain types for TrendGate

pub mod candle;
pub mod direction;
pub mod inputs;

pub use candle::Candle;
pub use direction::Direction;
pub use inputs::{ExternalStrategyInput, SrZone};
