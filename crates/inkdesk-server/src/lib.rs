pub mod error;
pub mod routes;
pub mod state;

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Build the axum Router with all API routes and middleware.
/// Used by `serve()` and available for integration testing.
pub fn build_router(app_state: state::AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Events (SSE)
        .route("/api/events", get(routes::events::sse_events))
        // Registry + dispatch
        .route("/api/actions", get(routes::actions::list_actions))
        .route("/api/dispatch", post(routes::dispatch::dispatch_action))
        .route(
            "/api/ui-events/{name}",
            post(routes::ui_events::emit_event),
        )
        // Modals
        .route("/api/modals", get(routes::modals::get_modals))
        .route(
            "/api/modals/{kind}/close",
            post(routes::modals::close_modal),
        )
        .route("/api/palette/close", post(routes::modals::close_palette))
        // Clients
        .route("/api/clients", post(routes::clients::create_client))
        .route(
            "/api/clients/refresh",
            post(routes::clients::refresh_clients),
        )
        // Command interpreter
        .route(
            "/api/command",
            get(routes::command::get_command).delete(routes::command::discard),
        )
        .route(
            "/api/command/interpret",
            post(routes::command::interpret),
        )
        .route("/api/command/confirm", post(routes::command::confirm))
        // Notices
        .route("/api/notices", get(routes::notices::list_notices))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(app_state)
}

/// Start the API server on `port`.
pub async fn serve(app_state: state::AppState, port: u16, open_browser: bool) -> anyhow::Result<()> {
    let addr = format!("0.0.0.0:{port}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    serve_on(app_state, listener, open_browser).await
}

/// Start the API server on a pre-bound listener.
///
/// Accepting a bound `TcpListener` lets the caller read the actual port
/// before starting (useful when `port = 0` and the OS picks a free port).
pub async fn serve_on(
    app_state: state::AppState,
    listener: tokio::net::TcpListener,
    open_browser: bool,
) -> anyhow::Result<()> {
    let actual_port = listener.local_addr()?.port();
    let app = build_router(app_state);

    tracing::info!("inkdesk API listening on http://localhost:{actual_port}");

    if open_browser {
        let url = format!("http://localhost:{actual_port}/api/actions");
        let _ = open::that(&url);
    }

    axum::serve(listener, app).await?;
    Ok(())
}
