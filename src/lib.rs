//! Greenhouse Fusion Server
//!
//! Continuously acquires environmental readings from a wireless
//! air-sensor node and a tCam-Mini thermal camera, fuses them into
//! derived agronomic metrics (vapor-pressure deficit), and persists a
//! rolling time series.
//!
//! ## Architecture
//!
//! 1. `endpoint` - ordered multi-endpoint discovery/fallback
//! 2. `node_client` - sensor-node HTTP polling + serial fallback
//! 3. `thermal_client` - framed-socket image protocol + HTTP fallbacks
//! 4. `thermal` - frame decoding and faulty-pixel-filtered statistics
//! 5. `vpd` - Magnus-Tetens vapor-pressure engine
//! 6. `fusion` - fused state model, atomic state store, link tracking
//! 7. `acquisition` - the polling/publishing scheduler
//! 8. `datalog` - append-only CSV log + latest-snapshot JSON + retention
//! 9. `web_api` - read-only presentation boundary

pub mod acquisition;
pub mod config;
pub mod datalog;
pub mod endpoint;
pub mod error;
pub mod fusion;
pub mod node_client;
pub mod state;
pub mod thermal;
pub mod thermal_client;
pub mod vpd;
pub mod web_api;

pub use error::{Error, Result};
