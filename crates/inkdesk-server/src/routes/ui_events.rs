use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use inkdesk_core::events::UiEvent;

use crate::error::AppError;
use crate::state::AppState;

/// POST /api/ui-events/{name} — emit a global UI event (keyboard shortcut,
/// header button) on the bus. The dispatcher handles it asynchronously.
pub async fn emit_event(
    State(app): State<AppState>,
    Path(name): Path<String>,
) -> Result<(StatusCode, Json<serde_json::Value>), AppError> {
    let event: UiEvent = name.parse()?;
    let receivers = app.bus.emit(event);
    Ok((
        StatusCode::ACCEPTED,
        Json(serde_json::json!({ "event": event.name(), "receivers": receivers })),
    ))
}
