//! Fused reading model and shared state
//!
//! ## Responsibilities
//!
//! - Per-sensor and fused air-reading types
//! - The immutable-per-cycle `FusedState` snapshot
//! - Atomic publish/read of the latest snapshot
//! - Connection transition tracking

pub mod link_tracker;
pub mod store;

pub use link_tracker::{DeviceId, LinkEvent, LinkTracker};
pub use store::StateStore;

use crate::thermal::ThermalStatistics;
use crate::vpd::VpdResult;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Per-sensor reading status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SensorStatus {
    Ok,
    InvalidRange,
    Error,
    Disconnected,
}

/// One physical sensor's reading for one poll cycle.
///
/// Status `Ok` implies both fields are present; any other status implies
/// both are absent. Absent means "no valid value this cycle", never zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorReading {
    pub temperature: Option<f64>,
    pub humidity: Option<f64>,
    pub status: SensorStatus,
}

impl SensorReading {
    /// A reading that carries no data for this cycle
    pub fn absent(status: SensorStatus) -> Self {
        Self {
            temperature: None,
            humidity: None,
            status,
        }
    }

    /// Normalize a raw reading so the status invariant holds: `Ok`
    /// requires both values, anything else clears both.
    pub fn normalized(
        temperature: Option<f64>,
        humidity: Option<f64>,
        status: SensorStatus,
    ) -> Self {
        match (status, temperature, humidity) {
            (SensorStatus::Ok, Some(t), Some(h)) => Self {
                temperature: Some(t),
                humidity: Some(h),
                status: SensorStatus::Ok,
            },
            (SensorStatus::Ok, _, _) => Self::absent(SensorStatus::Error),
            (status, _, _) => Self::absent(status),
        }
    }
}

/// Average over the node's sensors whose status is `Ok`.
/// Absent entirely when zero sensors contribute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FusedAirReading {
    pub temperature: f64,
    pub humidity: f64,
    pub sensor_count: usize,
}

impl FusedAirReading {
    /// Fuse the contributing sensors; `None` when none are `Ok`.
    pub fn fuse<'a, I>(readings: I) -> Option<Self>
    where
        I: IntoIterator<Item = &'a SensorReading>,
    {
        let mut temp_sum = 0.0;
        let mut rh_sum = 0.0;
        let mut count = 0usize;

        for reading in readings {
            if reading.status != SensorStatus::Ok {
                continue;
            }
            // Ok status guarantees both fields by the normalization
            // invariant; a violation here is a programming error.
            if let (Some(t), Some(h)) = (reading.temperature, reading.humidity) {
                temp_sum += t;
                rh_sum += h;
                count += 1;
            }
        }

        if count == 0 {
            return None;
        }

        Some(Self {
            temperature: temp_sum / count as f64,
            humidity: rh_sum / count as f64,
            sensor_count: count,
        })
    }
}

/// Connection status of a logical device for one cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionStatus {
    Connected,
    /// Reached over the serial fallback link
    ConnectedFallback,
    Disconnected,
}

/// The full fused snapshot for one acquisition cycle.
///
/// Built once per cycle by the scheduler and published wholesale; readers
/// never observe a mix of two cycles' data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FusedState {
    pub timestamp: DateTime<Utc>,
    /// Latest per-sensor readings, keyed by sensor id
    pub sensors: BTreeMap<String, SensorReading>,
    pub air: Option<FusedAirReading>,
    pub thermal: Option<ThermalStatistics>,
    pub vpd: VpdResult,
    pub node_status: ConnectionStatus,
    pub camera_status: ConnectionStatus,
}

impl FusedState {
    /// The all-absent snapshot published when every source failed.
    /// Keeps the presentation layer live through a total outage.
    pub fn disconnected(timestamp: DateTime<Utc>) -> Self {
        Self {
            timestamp,
            sensors: BTreeMap::new(),
            air: None,
            thermal: None,
            vpd: VpdResult::default(),
            node_status: ConnectionStatus::Disconnected,
            camera_status: ConnectionStatus::Disconnected,
        }
    }
}
