use axum::{
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

use super::handlers;
use super::state::AppState;

/// Create the HTTP router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // Session control
        .route("/sessions/:recipe_id/start", post(handlers::start_session))
        .route("/sessions/:recipe_id/stop", post(handlers::stop_session))
        // Session observation and view-driven input
        .route("/sessions/:recipe_id", get(handlers::get_session_state))
        .route("/sessions/:recipe_id/step", post(handlers::select_step))
        .route("/sessions/:recipe_id/mute", post(handlers::toggle_mute))
        // Add tracing middleware for request logging
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
