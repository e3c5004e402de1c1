//! State Store
//!
//! Holds the latest fused snapshot behind an `Arc` that is swapped
//! wholesale once per cycle. Readers clone the `Arc` and can never see a
//! half-updated state; the write lock is held only for the pointer swap.

use super::FusedState;
use chrono::Utc;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Shared latest-snapshot store
pub struct StateStore {
    latest: RwLock<Arc<FusedState>>,
}

impl StateStore {
    /// Create a store seeded with an all-absent snapshot
    pub fn new() -> Self {
        Self {
            latest: RwLock::new(Arc::new(FusedState::disconnected(Utc::now()))),
        }
    }

    /// Replace the snapshot atomically
    pub async fn publish(&self, state: FusedState) {
        let mut latest = self.latest.write().await;
        *latest = Arc::new(state);
    }

    /// Latest fully-formed snapshot from some completed cycle
    pub async fn latest(&self) -> Arc<FusedState> {
        self.latest.read().await.clone()
    }
}

impl Default for StateStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fusion::ConnectionStatus;

    #[tokio::test]
    async fn test_publish_replaces_whole_snapshot() {
        let store = StateStore::new();
        let before = store.latest().await;
        assert_eq!(before.node_status, ConnectionStatus::Disconnected);

        let mut next = FusedState::disconnected(Utc::now());
        next.node_status = ConnectionStatus::Connected;
        store.publish(next).await;

        let after = store.latest().await;
        assert_eq!(after.node_status, ConnectionStatus::Connected);
        // The earlier reader still holds the old complete snapshot
        assert_eq!(before.node_status, ConnectionStatus::Disconnected);
    }
}
