use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use imagegen_cloud::BlobError;
use imagegen_core::error::CoreError;
use imagegen_db::StoreError;
use imagegen_runninghub::RunningHubError;
use serde_json::json;

/// Application-level error type for HTTP handlers.
///
/// Wraps the error types of the lower crates and adds HTTP-specific
/// variants. Implements [`IntoResponse`] to produce consistent
/// `{"message", "code"}` JSON error responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// A domain-level error from `imagegen_core`.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// A job store failure.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// A workflow engine failure (transport, HTTP status, or rejection).
    #[error(transparent)]
    Engine(#[from] RunningHubError),

    /// An input-asset storage failure.
    #[error(transparent)]
    Blob(#[from] BlobError),

    /// A bad request with a human-readable message.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// An internal error with a human-readable message.
    #[error("Internal error: {0}")]
    InternalError(String),
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

const SANITIZED_MESSAGE: &str = "An internal error occurred";

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            // --- CoreError variants ---
            AppError::Core(core) => match core {
                CoreError::NotFound { entity, id } => (
                    StatusCode::NOT_FOUND,
                    "NOT_FOUND",
                    format!("{entity} with id {id} not found"),
                ),
                CoreError::Validation(msg) => {
                    (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone())
                }
                CoreError::Internal(msg) => {
                    tracing::error!(error = %msg, "Internal core error");
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "INTERNAL_ERROR",
                        SANITIZED_MESSAGE.to_string(),
                    )
                }
            },

            // --- Store errors ---
            AppError::Store(err) => {
                tracing::error!(error = %err, "Job store error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    SANITIZED_MESSAGE.to_string(),
                )
            }

            // --- Upstream errors: surfaced verbatim ---
            AppError::Engine(err) => {
                tracing::error!(error = %err, "Workflow engine error");
                (StatusCode::INTERNAL_SERVER_ERROR, "ENGINE_ERROR", err.to_string())
            }
            AppError::Blob(err) => {
                tracing::error!(error = %err, "Blob store error");
                (StatusCode::INTERNAL_SERVER_ERROR, "UPLOAD_ERROR", err.to_string())
            }

            // --- HTTP-specific errors ---
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone()),
            AppError::InternalError(msg) => {
                tracing::error!(error = %msg, "Internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    SANITIZED_MESSAGE.to_string(),
                )
            }
        };

        let body = json!({
            "message": message,
            "code": code,
        });

        (status, axum::Json(body)).into_response()
    }
}
