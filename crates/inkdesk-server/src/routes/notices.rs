use axum::extract::State;
use axum::Json;

use crate::state::AppState;

/// GET /api/notices — recent notices (oldest first) and incidents.
pub async fn list_notices(State(app): State<AppState>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "notices": app.notices.recent(),
        "incidents": app.notices.incidents(),
    }))
}
