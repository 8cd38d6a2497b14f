//! DTOs for the snapshot history endpoint.

use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::domain::Snapshot;
use crate::error::MonitorError;

/// Most snapshots one request may ask for: an hour of 5-second cycles.
pub const MAX_HISTORY_LIMIT: u32 = 720;

/// Snapshots returned when no limit is given.
pub const DEFAULT_HISTORY_LIMIT: u32 = 12;

/// Query parameters for `GET /api/v1/snapshots`.
#[derive(Debug, Clone, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct HistoryParams {
    /// Number of snapshots to return, newest first (1–720, default 12).
    pub limit: Option<u32>,
}

impl HistoryParams {
    /// Returns the validated limit.
    ///
    /// # Errors
    ///
    /// Returns [`MonitorError::InvalidRequest`] if the limit is zero or
    /// above [`MAX_HISTORY_LIMIT`].
    pub fn limit(&self) -> Result<usize, MonitorError> {
        let limit = self.limit.unwrap_or(DEFAULT_HISTORY_LIMIT);
        if limit == 0 || limit > MAX_HISTORY_LIMIT {
            return Err(MonitorError::InvalidRequest(format!(
                "limit must be between 1 and {MAX_HISTORY_LIMIT}"
            )));
        }
        usize::try_from(limit).map_err(|e| MonitorError::Internal(e.to_string()))
    }
}

/// Response body for `GET /api/v1/snapshots`.
#[derive(Debug, Serialize, ToSchema)]
pub struct HistoryResponse {
    /// Number of snapshots returned.
    pub count: usize,
    /// Unexpired snapshots, newest first, in store item layout.
    #[schema(value_type = Vec<Object>)]
    pub snapshots: Vec<Snapshot>,
}
