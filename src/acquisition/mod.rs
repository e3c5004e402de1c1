//! Acquisition Scheduler
//!
//! ## Responsibilities
//!
//! - Periodic polling of the sensor node and thermal camera
//! - Reduction of fresh transport data to fused readings and VPD
//! - Atomic publication of one `FusedState` per cycle
//! - Triggering persistence on its own longer interval
//!
//! A cycle where every source fails still publishes a fully-absent
//! snapshot with both devices disconnected, so the presentation layer
//! stays live. Nothing in the loop is fatal: per-cycle errors are logged
//! and the next tick retries from scratch.

use crate::datalog::DataLogService;
use crate::fusion::{
    ConnectionStatus, DeviceId, FusedAirReading, FusedState, LinkTracker, StateStore,
};
use crate::node_client::{NodeClient, NodePoll};
use crate::thermal::ThermalStatistics;
use crate::thermal_client::ThermalClient;
use crate::vpd::{CanopyStat, VpdResult};
use chrono::Utc;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::{interval, Instant};

/// Which thermal statistic feeds the canopy side of the VPD variants
const CANOPY_SOURCE: CanopyStat = CanopyStat::Mean;

/// AcquisitionScheduler instance
pub struct AcquisitionScheduler {
    node_client: Arc<NodeClient>,
    thermal_client: Arc<ThermalClient>,
    store: Arc<StateStore>,
    datalog: Arc<DataLogService>,
    link_tracker: Arc<LinkTracker>,
    poll_interval: Duration,
    persist_interval: Duration,
    running: Arc<RwLock<bool>>,
}

impl AcquisitionScheduler {
    pub fn new(
        node_client: Arc<NodeClient>,
        thermal_client: Arc<ThermalClient>,
        store: Arc<StateStore>,
        datalog: Arc<DataLogService>,
        link_tracker: Arc<LinkTracker>,
        poll_interval: Duration,
        persist_interval: Duration,
    ) -> Self {
        Self {
            node_client,
            thermal_client,
            store,
            datalog,
            link_tracker,
            poll_interval,
            persist_interval,
            running: Arc::new(RwLock::new(false)),
        }
    }

    /// Start the acquisition loop
    pub async fn start(&self) {
        {
            let mut running = self.running.write().await;
            if *running {
                tracing::warn!("Acquisition already running");
                return;
            }
            *running = true;
        }

        tracing::info!(
            poll_secs = self.poll_interval.as_secs(),
            persist_secs = self.persist_interval.as_secs(),
            "Starting acquisition scheduler"
        );

        let node_client = self.node_client.clone();
        let thermal_client = self.thermal_client.clone();
        let store = self.store.clone();
        let datalog = self.datalog.clone();
        let link_tracker = self.link_tracker.clone();
        let poll_interval = self.poll_interval;
        let persist_interval = self.persist_interval;
        let running = self.running.clone();

        tokio::spawn(async move {
            let mut ticker = interval(poll_interval);
            let mut last_persist = Instant::now();

            loop {
                ticker.tick().await;

                {
                    let is_running = running.read().await;
                    if !*is_running {
                        break;
                    }
                }

                let state = Self::run_cycle(&node_client, &thermal_client, &link_tracker).await;
                let persist_due = last_persist.elapsed() >= persist_interval;
                let to_persist = if persist_due { Some(state.clone()) } else { None };

                store.publish(state).await;

                if let Some(state) = to_persist {
                    last_persist = Instant::now();
                    if let Err(e) = datalog.persist(&state).await {
                        tracing::error!(error = %e, "Persistence failed, will retry next interval");
                    }
                }
            }

            tracing::info!("Acquisition scheduler stopped");
        });
    }

    /// Stop the acquisition loop
    pub async fn stop(&self) {
        let mut running = self.running.write().await;
        *running = false;
        tracing::info!("Stopping acquisition scheduler");
    }

    /// One full poll + fuse cycle
    async fn run_cycle(
        node_client: &NodeClient,
        thermal_client: &ThermalClient,
        link_tracker: &LinkTracker,
    ) -> FusedState {
        let node_poll = match node_client.poll().await {
            Ok(poll) => Some(poll),
            Err(e) => {
                tracing::warn!(error = %e, "Sensor node unreachable this cycle");
                None
            }
        };

        let thermal = match thermal_client.poll().await {
            Ok(observation) => Some(observation.into_statistics()),
            Err(e) => {
                tracing::warn!(error = %e, "Thermal camera unreachable this cycle");
                None
            }
        };

        let state = assemble(node_poll, thermal);

        link_tracker
            .update(DeviceId::SensorNode, state.node_status)
            .await;
        link_tracker
            .update(DeviceId::ThermalCamera, state.camera_status)
            .await;

        state
    }
}

/// Reduce this cycle's transport results to a fused snapshot.
///
/// A failed source contributes absent fields, never stale or fabricated
/// values: readings from a previous cycle are not reused.
pub fn assemble(node_poll: Option<NodePoll>, thermal: Option<ThermalStatistics>) -> FusedState {
    let timestamp = Utc::now();

    let (sensors, node_status) = match node_poll {
        Some(poll) => (poll.sensors, poll.status),
        None => (BTreeMap::new(), ConnectionStatus::Disconnected),
    };

    let camera_status = if thermal.is_some() {
        ConnectionStatus::Connected
    } else {
        ConnectionStatus::Disconnected
    };

    let air = FusedAirReading::fuse(sensors.values());
    let canopy_temp = thermal.as_ref().and_then(|t| CANOPY_SOURCE.select(t));

    let vpd = VpdResult::compute(
        air.as_ref().map(|a| a.temperature),
        air.as_ref().map(|a| a.humidity),
        canopy_temp,
    );

    FusedState {
        timestamp,
        sensors,
        air,
        thermal,
        vpd,
        node_status,
        camera_status,
    }
}

/// Spawn the retention timer: one sweep at startup, then one per period.
pub fn start_retention(datalog: Arc<DataLogService>, period: Duration) {
    tokio::spawn(async move {
        let mut ticker = interval(period);
        loop {
            ticker.tick().await;
            if let Err(e) = datalog.trim_retention().await {
                tracing::error!(error = %e, "Retention sweep failed");
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fusion::{SensorReading, SensorStatus};
    use crate::thermal::ThermalSource;

    fn node_poll_ok() -> NodePoll {
        let mut sensors = BTreeMap::new();
        sensors.insert(
            "sht45".to_string(),
            SensorReading {
                temperature: Some(24.0),
                humidity: Some(60.0),
                status: SensorStatus::Ok,
            },
        );
        sensors.insert(
            "hdc3022".to_string(),
            SensorReading {
                temperature: Some(26.0),
                humidity: Some(50.0),
                status: SensorStatus::Ok,
            },
        );
        NodePoll {
            sensors,
            status: ConnectionStatus::Connected,
        }
    }

    fn thermal_ok() -> ThermalStatistics {
        ThermalStatistics::compute(&[26.0, 27.0, 28.0], ThermalSource::RawSocket)
    }

    #[test]
    fn test_full_cycle_produces_all_vpd_variants() {
        let state = assemble(Some(node_poll_ok()), Some(thermal_ok()));
        assert_eq!(state.node_status, ConnectionStatus::Connected);
        assert_eq!(state.camera_status, ConnectionStatus::Connected);

        let air = state.air.as_ref().unwrap();
        assert_eq!(air.sensor_count, 2);
        assert!((air.temperature - 25.0).abs() < 1e-12);
        assert!((air.humidity - 55.0).abs() < 1e-12);

        assert!(state.vpd.air_vpd.is_some());
        assert!(state.vpd.canopy_vpd.is_some());
        assert!(state.vpd.thermal_vpd.is_some());
        assert!(state.vpd.enhanced_vpd.is_some());
    }

    #[test]
    fn test_node_down_camera_up_leaves_vpd_absent() {
        // Every VPD variant needs air humidity, so a node outage blanks
        // them all even with a live canopy reading.
        let state = assemble(None, Some(thermal_ok()));
        assert_eq!(state.node_status, ConnectionStatus::Disconnected);
        assert_eq!(state.camera_status, ConnectionStatus::Connected);
        assert!(state.air.is_none());
        assert!(state.thermal.is_some());
        assert!(state.vpd.air_vpd.is_none());
        assert!(state.vpd.canopy_vpd.is_none());
        assert!(state.vpd.thermal_vpd.is_none());
        assert!(state.vpd.enhanced_vpd.is_none());
    }

    #[test]
    fn test_camera_down_keeps_air_vpd() {
        let state = assemble(Some(node_poll_ok()), None);
        assert_eq!(state.camera_status, ConnectionStatus::Disconnected);
        assert!(state.thermal.is_none());
        assert!(state.vpd.air_vpd.is_some());
        assert!(state.vpd.canopy_vpd.is_none());
        assert_eq!(state.vpd.enhanced_vpd, state.vpd.air_vpd);
    }

    #[test]
    fn test_total_outage_publishes_absent_state() {
        let state = assemble(None, None);
        assert_eq!(state.node_status, ConnectionStatus::Disconnected);
        assert_eq!(state.camera_status, ConnectionStatus::Disconnected);
        assert!(state.sensors.is_empty());
        assert!(state.air.is_none());
        assert!(state.thermal.is_none());
        assert_eq!(state.vpd, VpdResult::default());
    }

    #[test]
    fn test_fallback_status_flows_through() {
        let mut poll = node_poll_ok();
        poll.status = ConnectionStatus::ConnectedFallback;
        let state = assemble(Some(poll), None);
        assert_eq!(state.node_status, ConnectionStatus::ConnectedFallback);
        // A fallback reading is still trusted for averaging
        assert!(state.air.is_some());
    }

    #[test]
    fn test_all_faulty_thermal_frame_yields_no_canopy_vpd() {
        let thermal = ThermalStatistics::compute(&[-3.0, -8.0], ThermalSource::RawSocket);
        let state = assemble(Some(node_poll_ok()), Some(thermal));
        // Camera answered, but no valid pixels means no canopy temperature
        assert_eq!(state.camera_status, ConnectionStatus::Connected);
        assert!(state.vpd.air_vpd.is_some());
        assert!(state.vpd.canopy_vpd.is_none());
        assert!(state.vpd.thermal_vpd.is_none());
    }
}
