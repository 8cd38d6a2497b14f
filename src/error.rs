//! Error types for the scrape → broadcast → persist pipeline and the HTTP
//! surface.
//!
//! Pipeline failures are split by stage ([`FetchError`], [`ParseError`],
//! [`PersistError`]) so the scheduler can decide which ones abort a cycle.
//! [`MonitorError`] is what HTTP handlers return; each variant maps to a
//! status code and a structured JSON error response.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use utoipa::ToSchema;

/// The report source could not be retrieved.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// Network, TLS, timeout or body decoding failure.
    #[error("report request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The source answered with a non-success status.
    #[error("report source returned HTTP {0}")]
    Status(u16),
}

/// The report text is not shaped like a table at all.
///
/// Individual malformed rows never produce this error; they are skipped.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    /// The report body was empty or whitespace only.
    #[error("report is empty")]
    EmptyReport,

    /// No table row markup was found anywhere in the report.
    #[error("report contains no table rows")]
    NoTableRows,
}

/// The durable store rejected or could not complete an operation.
#[derive(Debug, thiserror::Error)]
pub enum PersistError {
    /// Database driver error.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Features could not be encoded or decoded.
    #[error("item encoding error: {0}")]
    Encoding(#[from] serde_json::Error),

    /// A stored item does not describe a valid snapshot.
    #[error("invalid stored item: {0}")]
    InvalidItem(String),

    /// The configured table name is not a plain SQL identifier.
    #[error("invalid table name: {0:?}")]
    InvalidTableName(String),
}

/// A failure that aborts one scheduler cycle before anything is published.
#[derive(Debug, thiserror::Error)]
pub enum CycleError {
    /// Fetching the report failed.
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// The report could not be parsed.
    #[error(transparent)]
    Parse(#[from] ParseError),
}

impl CycleError {
    /// Short stage label used in log fields.
    #[must_use]
    pub const fn stage(&self) -> &'static str {
        match self {
            Self::Fetch(_) => "fetch",
            Self::Parse(_) => "parse",
        }
    }
}

/// Structured JSON error response body.
///
/// ```json
/// {
///   "error": {
///     "code": 3001,
///     "message": "persistence error: database error: ...",
///     "details": null
///   }
/// }
/// ```
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    /// Structured error payload.
    pub error: ErrorBody,
}

/// Inner error body with numeric code and human-readable message.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    /// Numeric error code.
    pub code: u32,
    /// Human-readable error message.
    pub message: String,
    /// Optional additional details.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// Error returned by HTTP handlers.
///
/// # Error Code Ranges
///
/// | Range     | Category   | HTTP Status               |
/// |-----------|------------|---------------------------|
/// | 1000–1999 | Validation | 400 Bad Request           |
/// | 3000–3999 | Server     | 500 Internal Server Error |
#[derive(Debug, thiserror::Error)]
pub enum MonitorError {
    /// Request validation failed.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The snapshot store failed.
    #[error("persistence error: {0}")]
    Persistence(#[from] PersistError),

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl MonitorError {
    /// Returns the numeric error code for this variant.
    #[must_use]
    pub const fn error_code(&self) -> u32 {
        match self {
            Self::InvalidRequest(_) => 1001,
            Self::Internal(_) => 3000,
            Self::Persistence(_) => 3001,
        }
    }

    /// Returns the HTTP status code for this variant.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            Self::Persistence(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for MonitorError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }
        let body = ErrorResponse {
            error: ErrorBody {
                code: self.error_code(),
                message: self.to_string(),
                details: None,
            },
        };
        let mut response = axum::Json(body).into_response();
        *response.status_mut() = status;
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn persistence_maps_to_500() {
        let err = MonitorError::from(PersistError::InvalidItem("bad".to_string()));
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.error_code(), 3001);
    }

    #[test]
    fn invalid_request_maps_to_400() {
        let response = MonitorError::InvalidRequest("limit".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn cycle_error_reports_stage() {
        assert_eq!(CycleError::from(ParseError::EmptyReport).stage(), "parse");
        assert_eq!(CycleError::from(FetchError::Status(503)).stage(), "fetch");
    }
}
