//! Maps the internal error taxonomy to HTTP status codes and a stable JSON
//! error body: `{"error": {"code": "...", "message": "..."}}`.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};

use sentinel_types::{ChainConflict, ErrorCode, PipelineError};

pub struct AppError {
    status: StatusCode,
    code: String,
    message: String,
}

impl AppError {
    pub fn new(status: StatusCode, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            status,
            code: code.into(),
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        let message = message.into();
        tracing::error!(target: "gateway", error = %message, "internal error");
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", message)
    }

    /// Attaches extra context (e.g. a raft transport error) to the log line
    /// without changing the response body sent to the client.
    pub fn with_source(self, source: impl std::fmt::Display) -> Self {
        tracing::warn!(target: "gateway", error = %source, code = %self.code, "request failed");
        self
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(serde_json::json!({
                "error": { "code": self.code, "message": self.message }
            })),
        )
            .into_response()
    }
}

impl From<PipelineError> for AppError {
    fn from(e: PipelineError) -> Self {
        let status = match &e {
            PipelineError::Malformed(_) => StatusCode::BAD_REQUEST,
            PipelineError::Unauthenticated => StatusCode::UNAUTHORIZED,
            PipelineError::Conflict(ChainConflict::PreviousHashMismatch) => StatusCode::BAD_REQUEST,
            PipelineError::Conflict(_) => StatusCode::CONFLICT,
            PipelineError::NoLeader => StatusCode::SERVICE_UNAVAILABLE,
            PipelineError::Indeterminate => StatusCode::SERVICE_UNAVAILABLE,
            PipelineError::UnknownKey(_) => StatusCode::NOT_FOUND,
            PipelineError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self::new(status, e.code(), e.to_string())
    }
}
