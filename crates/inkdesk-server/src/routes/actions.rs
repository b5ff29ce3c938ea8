use axum::Json;
use inkdesk_core::registry::{self, ActionSpec};

/// GET /api/actions — the action registry in palette order.
pub async fn list_actions() -> Json<Vec<ActionSpec>> {
    Json(registry::catalog())
}
