use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use inkdesk_agent::Submission;
use inkdesk_core::dispatcher::DispatchOutcome;
use inkdesk_core::interpret::PendingCommand;
use serde::Deserialize;

use crate::error::AppError;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct InterpretBody {
    text: String,
}

/// POST /api/command/interpret — propose an action for `text`. Never
/// dispatches; 409 when a newer command replaced this one while it was in
/// flight. Blank text changes nothing and answers with what is already shown.
pub async fn interpret(
    State(app): State<AppState>,
    Json(body): Json<InterpretBody>,
) -> Result<Json<Option<PendingCommand>>, AppError> {
    match app.session.submit(&body.text).await {
        Submission::Shown(shown) => Ok(Json(Some(shown))),
        Submission::Ignored(current) => Ok(Json(current)),
        Submission::Superseded => Err(AppError::conflict("superseded by a newer command")),
    }
}

/// GET /api/command — the proposal currently awaiting confirmation.
pub async fn get_command(State(app): State<AppState>) -> Json<Option<PendingCommand>> {
    Json(app.session.shown())
}

#[derive(Deserialize, Default)]
pub struct ConfirmBody {
    #[serde(default)]
    alternative: Option<usize>,
}

/// POST /api/command/confirm — dispatch the shown proposal (or one of its
/// alternatives by index).
pub async fn confirm(
    State(app): State<AppState>,
    Json(body): Json<ConfirmBody>,
) -> Result<(StatusCode, Json<DispatchOutcome>), AppError> {
    let action = app
        .session
        .confirm(body.alternative)
        .ok_or_else(|| AppError::conflict("no understood command to confirm"))?;
    let outcome = app.dispatcher.dispatch(action).await;
    Ok((StatusCode::ACCEPTED, Json(outcome)))
}

/// DELETE /api/command
pub async fn discard(State(app): State<AppState>) -> Json<serde_json::Value> {
    let discarded = app.session.discard();
    Json(serde_json::json!({ "discarded": discarded }))
}
