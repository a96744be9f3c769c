use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use calendar_store::StoreError;

/// Errors surfaced to HTTP clients as `{"error": "..."}`.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("invalid date format: {0}")]
    InvalidDate(String),

    #[error("invalid user ID: {0}")]
    InvalidUserId(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequest(_) | Self::InvalidDate(_) | Self::InvalidUserId(_) => {
                StatusCode::BAD_REQUEST
            }
            Self::Store(StoreError::NotFound { .. }) => StatusCode::NOT_FOUND,
        }
    }

    /// Short classification string for logging/metrics.
    pub fn error_kind(&self) -> &'static str {
        match self {
            Self::InvalidRequest(_) => "invalid_request",
            Self::InvalidDate(_) => "invalid_date",
            Self::InvalidUserId(_) => "invalid_user_id",
            Self::Store(e) => e.error_kind(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        tracing::debug!(kind = self.error_kind(), status = status.as_u16(), error = %self, "request rejected");
        (status, Json(serde_json::json!({ "error": self.to_string() }))).into_response()
    }
}
