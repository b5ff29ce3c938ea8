use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use inkdesk_core::action::Action;
use inkdesk_core::dispatcher::DispatchOutcome;

use crate::error::AppError;
use crate::state::AppState;

/// POST /api/dispatch — body `{"type": "...", "payload": {...}}`.
///
/// Responds 202 once the side effect has settled. A failed side effect is
/// still 202: the failure is reported as a notice, not as an HTTP error.
pub async fn dispatch_action(
    State(app): State<AppState>,
    Json(body): Json<serde_json::Value>,
) -> Result<(StatusCode, Json<DispatchOutcome>), AppError> {
    let action: Action =
        serde_json::from_value(body).map_err(|e| AppError::bad_request(e.to_string()))?;
    let outcome = app.dispatcher.dispatch(action).await;
    Ok((StatusCode::ACCEPTED, Json(outcome)))
}
