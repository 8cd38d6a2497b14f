//! End-to-end check of the subscriber channel over a real socket.

#![allow(clippy::panic, clippy::indexing_slicing)]

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures_util::StreamExt;
use tokio::net::TcpStream;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

use volcanic_lightning_monitor::api::build_app;
use volcanic_lightning_monitor::app_state::AppState;
use volcanic_lightning_monitor::domain::{Broadcaster, Coordinates, EventRecord, Severity, Snapshot};
use volcanic_lightning_monitor::persistence::MemoryStore;

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

async fn next_json(stream: &mut Socket) -> serde_json::Value {
    let Ok(Some(Ok(msg))) = tokio::time::timeout(Duration::from_secs(5), stream.next()).await
    else {
        panic!("no message within timeout");
    };
    let Ok(text) = msg.to_text() else {
        panic!("expected a text frame");
    };
    let Ok(value) = serde_json::from_str(text) else {
        panic!("frame is not json");
    };
    value
}

#[tokio::test]
async fn subscriber_receives_latest_update() {
    let broadcaster = Broadcaster::new(8);
    let state = AppState {
        broadcaster: broadcaster.clone(),
        store: Arc::new(MemoryStore::new()),
    };

    let Ok(listener) = tokio::net::TcpListener::bind("127.0.0.1:0").await else {
        panic!("bind failed");
    };
    let Ok(addr) = listener.local_addr() else {
        panic!("no local addr");
    };
    tokio::spawn(async move {
        let _ = axum::serve(listener, build_app(state)).await;
    });

    let Ok((mut socket, _)) = connect_async(format!("ws://{addr}/ws")).await else {
        panic!("websocket handshake failed");
    };

    let hello = next_json(&mut socket).await;
    assert_eq!(hello["event"], "connected");
    assert_eq!(broadcaster.subscriber_count(), 1);

    let Ok(health) = reqwest::get(format!("http://{addr}/health")).await else {
        panic!("health request failed");
    };
    let Ok(health) = health.text().await else {
        panic!("health body unreadable");
    };
    let Ok(health) = serde_json::from_str::<serde_json::Value>(&health) else {
        panic!("health body is not json");
    };
    assert_eq!(health["subscribers"], 1);

    let record = EventRecord {
        identifier: Some("263250".to_string()),
        name: Some("Merapi".to_string()),
        area: Some("Java".to_string()),
        coordinates: Coordinates::new(110.446, -7.54),
        strikes_within_20km: 4,
        strikes_within_100km: 11,
        volcano_type: "Stratovolcano".to_string(),
        severity: Severity::Alert,
    };
    let snapshot = Snapshot::build(Utc::now(), vec![record]);
    let receivers = broadcaster.publish(Arc::new(snapshot.clone()));
    assert_eq!(receivers, 1);

    let update = next_json(&mut socket).await;
    assert_eq!(update["event"], "latest-update");
    assert_eq!(update["payload"]["sk"], snapshot.sort_key());
    assert_eq!(update["payload"]["type"], "FeatureCollection");
    let feature = &update["payload"]["features"][0];
    assert_eq!(feature["properties"]["name"], "Merapi");
    assert_eq!(feature["properties"]["severity"], "alert");
    assert_eq!(feature["geometry"]["coordinates"][0], 110.446);

    drop(socket);
    for _ in 0..50 {
        if broadcaster.subscriber_count() == 0 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert_eq!(broadcaster.subscriber_count(), 0);
}
