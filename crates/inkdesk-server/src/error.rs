use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use inkdesk_core::error::InkdeskError;

// ---------------------------------------------------------------------------
// Explicit-status sentinel
// ---------------------------------------------------------------------------

/// Carries an explicit status through the `anyhow::Error` chain for
/// conditions that have no `InkdeskError` variant.
#[derive(Debug)]
struct StatusError {
    status: StatusCode,
    message: String,
}

impl std::fmt::Display for StatusError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for StatusError {}

// ---------------------------------------------------------------------------
// AppError
// ---------------------------------------------------------------------------

/// Unified error type for HTTP responses: `{"error": "..."}` plus a status.
#[derive(Debug)]
pub struct AppError(pub anyhow::Error);

impl AppError {
    fn with_status(status: StatusCode, msg: impl Into<String>) -> Self {
        Self(
            StatusError {
                status,
                message: msg.into(),
            }
            .into(),
        )
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::with_status(StatusCode::BAD_REQUEST, msg)
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::with_status(StatusCode::NOT_FOUND, msg)
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::with_status(StatusCode::CONFLICT, msg)
    }
}

fn status_for(e: &InkdeskError) -> StatusCode {
    match e {
        InkdeskError::NotInitialized
        | InkdeskError::UnknownAction(_)
        | InkdeskError::InvalidPayload { .. } => StatusCode::BAD_REQUEST,
        InkdeskError::UnknownEvent(_) | InkdeskError::UnknownModal(_) => StatusCode::NOT_FOUND,
        InkdeskError::ModalClosed(_) => StatusCode::CONFLICT,
        InkdeskError::Gateway(_) => StatusCode::BAD_GATEWAY,
        InkdeskError::MissingEnv(_)
        | InkdeskError::Io(_)
        | InkdeskError::Yaml(_)
        | InkdeskError::Json(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = if let Some(s) = self.0.downcast_ref::<StatusError>() {
            s.status
        } else if let Some(e) = self.0.downcast_ref::<InkdeskError>() {
            status_for(e)
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        };

        let body = serde_json::json!({ "error": self.0.to_string() });
        (status, axum::Json(body)).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}
