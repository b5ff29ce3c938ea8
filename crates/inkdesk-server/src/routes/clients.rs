use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use inkdesk_core::action::ClientDraft;
use inkdesk_core::refresh::RefreshOutcome;

use crate::error::AppError;
use crate::state::AppState;

/// POST /api/clients — confirm step of the new-client form.
///
/// Errors come back to the form (which stays open) with the gateway's
/// message; 201 closes the form and refreshes client lists.
pub async fn create_client(
    State(app): State<AppState>,
    Json(draft): Json<ClientDraft>,
) -> Result<(StatusCode, Json<serde_json::Value>), AppError> {
    let stored = app.dispatcher.submit_client(draft).await?;
    Ok((StatusCode::CREATED, Json(stored)))
}

/// POST /api/clients/refresh
pub async fn refresh_clients(State(app): State<AppState>) -> Json<RefreshOutcome> {
    Json(app.dispatcher.refresh_clients())
}
