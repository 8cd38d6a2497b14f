//! Snapshot history handler.

use axum::extract::{Query, State};
use axum::routing::get;
use axum::{Json, Router};
use chrono::Utc;

use crate::api::dto::{HistoryParams, HistoryResponse};
use crate::app_state::AppState;
use crate::error::{ErrorResponse, MonitorError};

/// `GET /snapshots` — Recent unexpired snapshots, newest first.
///
/// # Errors
///
/// Returns [`MonitorError`] on an invalid limit or store failure.
#[utoipa::path(
    get,
    path = "/api/v1/snapshots",
    tag = "Snapshots",
    summary = "List recent snapshots",
    description = "Returns persisted snapshots that have not yet expired, newest first.",
    params(HistoryParams),
    responses(
        (status = 200, description = "Recent snapshots", body = HistoryResponse),
        (status = 400, description = "Invalid limit", body = ErrorResponse),
        (status = 500, description = "Store failure", body = ErrorResponse),
    )
)]
pub async fn list_snapshots(
    State(state): State<AppState>,
    Query(params): Query<HistoryParams>,
) -> Result<Json<HistoryResponse>, MonitorError> {
    let limit = params.limit()?;
    let snapshots = state.store.recent(Utc::now(), limit).await?;
    Ok(Json(HistoryResponse {
        count: snapshots.len(),
        snapshots,
    }))
}

/// Snapshot routes.
pub fn routes() -> Router<AppState> {
    Router::new().route("/snapshots", get(list_snapshots))
}
