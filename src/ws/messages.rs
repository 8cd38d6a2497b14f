//! WebSocket message envelope and event names.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Top-level WebSocket message envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WsMessage {
    /// Server-generated message ID.
    pub id: String,
    /// Event name.
    pub event: WsEvent,
    /// ISO-8601 send time.
    pub timestamp: DateTime<Utc>,
    /// Event-specific payload.
    pub payload: serde_json::Value,
}

/// Server → client event names.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum WsEvent {
    /// Sent once after the upgrade, carrying the subscriber id.
    #[serde(rename = "connected")]
    Connected,
    /// A new snapshot; the payload is the snapshot item.
    #[serde(rename = "latest-update")]
    LatestUpdate,
}

impl WsMessage {
    /// Wraps a payload in a fresh envelope.
    #[must_use]
    pub fn new(event: WsEvent, payload: serde_json::Value) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            event,
            timestamp: Utc::now(),
            payload,
        }
    }
}
