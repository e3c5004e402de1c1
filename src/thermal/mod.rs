//! Thermal frame decoding and statistical aggregation

pub mod frame;
pub mod stats;

pub use frame::ThermalFrame;
pub use stats::{ThermalSource, ThermalStatistics};
