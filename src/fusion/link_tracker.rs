//! Link Tracker
//!
//! Tracks per-device connection status changes so only transitions are
//! logged, keeping the log quiet during a long outage.

use super::ConnectionStatus;
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Logical devices the acquisition loop polls
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceId {
    SensorNode,
    ThermalCamera,
}

impl DeviceId {
    fn name(&self) -> &'static str {
        match self {
            DeviceId::SensorNode => "sensor-node",
            DeviceId::ThermalCamera => "thermal-camera",
        }
    }
}

/// Connection transition event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkEvent {
    /// Device went from reachable to unreachable
    Lost,
    /// Device went from unreachable to reachable
    Recovered,
    /// Network endpoints failed but the serial fallback answered
    FallbackEngaged,
}

/// Tracks device connection status and detects transitions
pub struct LinkTracker {
    statuses: RwLock<HashMap<DeviceId, ConnectionStatus>>,
}

impl LinkTracker {
    pub fn new() -> Self {
        Self {
            statuses: RwLock::new(HashMap::new()),
        }
    }

    /// Record this cycle's status and return the transition, if any.
    ///
    /// The first observation of a device reports `Lost` when it is
    /// already unreachable, so an initially-dead device is not silent.
    pub async fn update(&self, device: DeviceId, status: ConnectionStatus) -> Option<LinkEvent> {
        let mut statuses = self.statuses.write().await;
        let prev = statuses.insert(device, status);

        let event = match (prev, status) {
            (Some(p), s) if p == s => None,
            (_, ConnectionStatus::ConnectedFallback) => Some(LinkEvent::FallbackEngaged),
            (Some(ConnectionStatus::Disconnected), ConnectionStatus::Connected) => {
                Some(LinkEvent::Recovered)
            }
            (Some(ConnectionStatus::ConnectedFallback), ConnectionStatus::Connected) => {
                Some(LinkEvent::Recovered)
            }
            (None, ConnectionStatus::Connected) => None,
            (_, ConnectionStatus::Disconnected) => Some(LinkEvent::Lost),
            _ => None,
        };

        match event {
            Some(LinkEvent::Lost) => {
                tracing::warn!(device = device.name(), "Device connection lost");
            }
            Some(LinkEvent::Recovered) => {
                tracing::info!(device = device.name(), "Device connection recovered");
            }
            Some(LinkEvent::FallbackEngaged) => {
                tracing::warn!(device = device.name(), "Serial fallback engaged");
            }
            None => {}
        }

        event
    }

    /// Current status for a device
    pub async fn status(&self, device: DeviceId) -> ConnectionStatus {
        self.statuses
            .read()
            .await
            .get(&device)
            .copied()
            .unwrap_or(ConnectionStatus::Disconnected)
    }
}

impl Default for LinkTracker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_initial_connected_no_event() {
        let tracker = LinkTracker::new();
        let event = tracker
            .update(DeviceId::SensorNode, ConnectionStatus::Connected)
            .await;
        assert!(event.is_none());
    }

    #[tokio::test]
    async fn test_initial_disconnected_triggers_lost() {
        let tracker = LinkTracker::new();
        let event = tracker
            .update(DeviceId::SensorNode, ConnectionStatus::Disconnected)
            .await;
        assert_eq!(event, Some(LinkEvent::Lost));
    }

    #[tokio::test]
    async fn test_connected_to_disconnected_triggers_lost() {
        let tracker = LinkTracker::new();
        tracker
            .update(DeviceId::ThermalCamera, ConnectionStatus::Connected)
            .await;
        let event = tracker
            .update(DeviceId::ThermalCamera, ConnectionStatus::Disconnected)
            .await;
        assert_eq!(event, Some(LinkEvent::Lost));
    }

    #[tokio::test]
    async fn test_disconnected_to_connected_triggers_recovered() {
        let tracker = LinkTracker::new();
        tracker
            .update(DeviceId::SensorNode, ConnectionStatus::Disconnected)
            .await;
        let event = tracker
            .update(DeviceId::SensorNode, ConnectionStatus::Connected)
            .await;
        assert_eq!(event, Some(LinkEvent::Recovered));
    }

    #[tokio::test]
    async fn test_fallback_transition_reported_once() {
        let tracker = LinkTracker::new();
        tracker
            .update(DeviceId::SensorNode, ConnectionStatus::Connected)
            .await;
        let event = tracker
            .update(DeviceId::SensorNode, ConnectionStatus::ConnectedFallback)
            .await;
        assert_eq!(event, Some(LinkEvent::FallbackEngaged));
        let repeat = tracker
            .update(DeviceId::SensorNode, ConnectionStatus::ConnectedFallback)
            .await;
        assert!(repeat.is_none());
    }

    #[tokio::test]
    async fn test_steady_state_is_quiet() {
        let tracker = LinkTracker::new();
        tracker
            .update(DeviceId::ThermalCamera, ConnectionStatus::Disconnected)
            .await;
        let event = tracker
            .update(DeviceId::ThermalCamera, ConnectionStatus::Disconnected)
            .await;
        assert!(event.is_none());
    }

    #[tokio::test]
    async fn test_devices_tracked_independently() {
        let tracker = LinkTracker::new();
        tracker
            .update(DeviceId::SensorNode, ConnectionStatus::Connected)
            .await;
        assert_eq!(
            tracker.status(DeviceId::SensorNode).await,
            ConnectionStatus::Connected
        );
        assert_eq!(
            tracker.status(DeviceId::ThermalCamera).await,
            ConnectionStatus::Disconnected
        );
    }
}
