//! Shared application state injected into all Axum handlers.

use std::sync::Arc;

use crate::domain::Broadcaster;
use crate::persistence::SnapshotStore;

/// Shared application state available to all handlers via Axum's
/// `State` extractor.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Subscriber registry and snapshot fan-out for the `/ws` channel.
    pub broadcaster: Broadcaster,
    /// Snapshot history read by the REST API.
    pub store: Arc<dyn SnapshotStore>,
}
