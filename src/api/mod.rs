//! REST API layer: route handlers, DTOs, and router composition.
//!
//! Resource endpoints are mounted under `/api/v1`; `/health` and the `/ws`
//! subscriber channel live at the root.

pub mod dto;
pub mod handlers;

use axum::Router;
use axum::routing::get;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;

use crate::app_state::AppState;
use crate::ws::handler::ws_handler;

/// OpenAPI document for the read API.
#[derive(Debug, OpenApi)]
#[openapi(
    info(
        title = "volcanic-lightning-monitor API",
        description = "Health and snapshot history endpoints. Live updates are pushed over the `/ws` WebSocket as `latest-update` messages."
    ),
    paths(handlers::system::health_handler, handlers::snapshot::list_snapshots),
    components(schemas(
        handlers::system::HealthResponse,
        dto::HistoryResponse,
        crate::error::ErrorResponse,
        crate::error::ErrorBody,
    )),
    tags(
        (name = "System", description = "Service health"),
        (name = "Snapshots", description = "Recent snapshot history"),
    )
)]
pub struct ApiDoc;

/// Builds the REST router without state or middleware.
pub fn build_router() -> Router<AppState> {
    Router::new()
        .nest("/api/v1", handlers::routes())
        .merge(handlers::system::routes())
}

/// Builds the complete application: REST routes, the `/ws` endpoint,
/// tracing and CORS layers, and Swagger UI when the feature is on.
pub fn build_app(state: AppState) -> Router {
    let router = build_router().route("/ws", get(ws_handler));

    #[cfg(feature = "swagger-ui")]
    let router = router.merge(
        utoipa_swagger_ui::SwaggerUi::new("/swagger-ui")
            .url("/api-docs/openapi.json", ApiDoc::openapi()),
    );

    router
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[cfg(test)]
#[allow(clippy::panic, clippy::indexing_slicing)]
mod tests {
    use std::sync::Arc;

    use axum::body::{Body, to_bytes};
    use axum::http::{Request, StatusCode};
    use chrono::Utc;
    use tower::ServiceExt;

    use super::*;
    use crate::domain::{Broadcaster, Snapshot};
    use crate::persistence::{MemoryStore, SnapshotStore};

    fn state_with(store: Arc<MemoryStore>) -> AppState {
        AppState {
            broadcaster: Broadcaster::new(4),
            store,
        }
    }

    async fn get_json(app: Router, uri: &str) -> (StatusCode, serde_json::Value) {
        let Ok(request) = Request::builder().uri(uri).body(Body::empty()) else {
            panic!("bad request");
        };
        let Ok(response) = app.oneshot(request).await else {
            panic!("request failed");
        };
        let status = response.status();
        let Ok(bytes) = to_bytes(response.into_body(), usize::MAX).await else {
            panic!("body read failed");
        };
        let Ok(body) = serde_json::from_slice(&bytes) else {
            panic!("body is not json");
        };
        (status, body)
    }

    #[tokio::test]
    async fn health_reports_subscribers() {
        let state = state_with(Arc::new(MemoryStore::new()));
        let _subscription = state.broadcaster.connect();

        let (status, body) = get_json(build_app(state), "/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["subscribers"], 1);
    }

    #[tokio::test]
    async fn snapshots_lists_newest_first() {
        let store = Arc::new(MemoryStore::new());
        let now = Utc::now();
        for offset in [0, 10] {
            let snapshot = Snapshot::build(now + chrono::TimeDelta::seconds(offset), vec![]);
            assert!(store.put(&snapshot).await.is_ok());
        }

        let (status, body) =
            get_json(build_app(state_with(store)), "/api/v1/snapshots?limit=5").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["count"], 2);
        let Some(first) = body["snapshots"][0]["sk"].as_str() else {
            panic!("missing sort key");
        };
        let Some(second) = body["snapshots"][1]["sk"].as_str() else {
            panic!("missing sort key");
        };
        assert!(first > second);
    }

    #[tokio::test]
    async fn zero_limit_is_rejected() {
        let state = state_with(Arc::new(MemoryStore::new()));
        let (status, body) = get_json(build_app(state), "/api/v1/snapshots?limit=0").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], 1001);
    }

    #[test]
    fn openapi_lists_both_paths() {
        let doc = ApiDoc::openapi();
        assert!(doc.paths.paths.contains_key("/health"));
        assert!(doc.paths.paths.contains_key("/api/v1/snapshots"));
    }
}
