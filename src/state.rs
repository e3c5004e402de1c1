//! Application state
//!
//! Holds all shared components and state

use crate::acquisition::AcquisitionScheduler;
use crate::config::AppConfig;
use crate::datalog::DataLogService;
use crate::fusion::{LinkTracker, StateStore};
use crate::node_client::NodeClient;
use crate::thermal_client::ThermalClient;
use std::sync::Arc;

/// Application state shared across handlers and background tasks
#[derive(Clone)]
pub struct AppState {
    /// Application config
    pub config: AppConfig,
    /// Latest fused snapshot store
    pub store: Arc<StateStore>,
    /// CSV log + snapshot writer
    pub datalog: Arc<DataLogService>,
    /// Connection transition tracker
    pub link_tracker: Arc<LinkTracker>,
    /// Acquisition scheduler handle
    pub scheduler: Arc<AcquisitionScheduler>,
}

impl AppState {
    /// Wire up all services from configuration
    pub fn build(config: AppConfig) -> Self {
        let store = Arc::new(StateStore::new());
        let link_tracker = Arc::new(LinkTracker::new());

        let datalog = Arc::new(DataLogService::new(
            config.csv_path(),
            config.snapshot_path(),
            config.retention_days,
        ));

        let node_client = Arc::new(NodeClient::new(
            config.node_endpoints.clone(),
            config.attempt_timeout,
            config.serial_path.clone(),
            config.serial_baud,
        ));

        let thermal_client = Arc::new(ThermalClient::new(
            config.camera_endpoints.clone(),
            config.attempt_timeout,
        ));

        let scheduler = Arc::new(AcquisitionScheduler::new(
            node_client,
            thermal_client,
            store.clone(),
            datalog.clone(),
            link_tracker.clone(),
            config.poll_interval,
            config.persist_interval,
        ));

        Self {
            config,
            store,
            datalog,
            link_tracker,
            scheduler,
        }
    }
}
