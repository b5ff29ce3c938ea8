use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use inkdesk_core::notice::Signal;
use std::convert::Infallible;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt as _;

use crate::state::AppState;

fn event_name(signal: &Signal) -> &'static str {
    match signal {
        Signal::Notice(_) => "notice",
        Signal::Incident(_) => "incident",
        Signal::Refresh { .. } => "refresh",
    }
}

/// GET /api/events — SSE stream of notices, incidents and refresh signals.
/// Lagged subscribers skip what they missed.
pub async fn sse_events(State(app): State<AppState>) -> impl axum::response::IntoResponse {
    let rx = app.event_tx.subscribe();
    let stream = BroadcastStream::new(rx).filter_map(|msg| {
        let signal = msg.ok()?;
        Event::default()
            .event(event_name(&signal))
            .json_data(&signal)
            .ok()
            .map(Ok::<Event, Infallible>)
    });
    Sse::new(stream).keep_alive(KeepAlive::default())
}
