//! Per-connection forwarding loop.
//!
//! Each WebSocket connection owns one [`Subscription`]. Snapshots received
//! from the broadcaster are wrapped in a `latest-update` envelope and sent
//! as text frames. Client frames are ignored apart from close.

use axum::extract::ws::{Message, WebSocket};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::broadcast;

use super::messages::{WsEvent, WsMessage};
use crate::domain::{Snapshot, Subscription};

/// Runs the read/write loop for a single WebSocket connection.
///
/// Returns when the client closes, the socket errors, or the broadcaster
/// goes away. Dropping the subscription on return unregisters it.
pub async fn run_connection(socket: WebSocket, mut subscription: Subscription) {
    let (mut ws_tx, mut ws_rx) = socket.split();
    let subscriber = subscription.id();

    let hello = WsMessage::new(
        WsEvent::Connected,
        serde_json::json!({ "subscriber_id": subscriber }),
    );
    if let Some(text) = encode(&hello)
        && ws_tx.send(Message::text(text)).await.is_err()
    {
        return;
    }

    loop {
        tokio::select! {
            msg = ws_rx.next() => {
                match msg {
                    Some(Ok(Message::Close(_)) | Err(_)) | None => break,
                    Some(Ok(_)) => {}
                }
            }
            snapshot = subscription.recv() => {
                match snapshot {
                    Ok(snapshot) => {
                        let Some(text) = latest_update(&snapshot) else {
                            continue;
                        };
                        if ws_tx.send(Message::text(text)).await.is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!(%subscriber, skipped, "subscriber lagged behind broadcaster");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        }
    }

    tracing::debug!(%subscriber, "ws connection closed");
}

/// Encodes a snapshot as a `latest-update` text frame.
fn latest_update(snapshot: &Snapshot) -> Option<String> {
    let payload = match serde_json::to_value(snapshot) {
        Ok(payload) => payload,
        Err(err) => {
            tracing::error!(error = %err, "failed to encode snapshot");
            return None;
        }
    };
    encode(&WsMessage::new(WsEvent::LatestUpdate, payload))
}

fn encode(msg: &WsMessage) -> Option<String> {
    serde_json::to_string(msg).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn latest_update_frame_carries_snapshot_item() {
        let snapshot = Snapshot::build(Utc::now(), vec![]);
        let text = latest_update(&snapshot).unwrap_or_default();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap_or_default();
        assert_eq!(value["event"], "latest-update");
        assert_eq!(value["payload"]["sk"], snapshot.sort_key());
        assert_eq!(value["payload"]["type"], "FeatureCollection");
    }
}
