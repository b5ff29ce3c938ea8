use axum::extract::{Path, State};
use axum::Json;
use inkdesk_core::modal::{ModalExit, ModalKind};
use serde::Deserialize;

use crate::error::AppError;
use crate::state::AppState;

/// GET /api/modals — modal states and the palette flag.
pub async fn get_modals(State(app): State<AppState>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "modals": app.dispatcher.modals(),
        "palette_open": app.dispatcher.palette_open(),
    }))
}

#[derive(Deserialize)]
pub struct CloseModalBody {
    #[serde(default)]
    confirmed: bool,
}

/// POST /api/modals/{kind}/close — leave a modal by confirm or cancel.
/// Closing an already-closed modal is a no-op (`closed: false`).
pub async fn close_modal(
    State(app): State<AppState>,
    Path(kind): Path<String>,
    Json(body): Json<CloseModalBody>,
) -> Result<Json<serde_json::Value>, AppError> {
    let kind: ModalKind = kind.parse()?;
    let exit = if body.confirmed {
        ModalExit::Confirmed
    } else {
        ModalExit::Cancelled
    };
    let closed = app.dispatcher.close_modal(kind, exit);
    Ok(Json(serde_json::json!({ "modal": kind, "closed": closed })))
}

/// POST /api/palette/close
pub async fn close_palette(State(app): State<AppState>) -> Json<serde_json::Value> {
    app.dispatcher.set_palette_open(false);
    Json(serde_json::json!({ "palette_open": false }))
}
