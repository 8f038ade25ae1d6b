//! HTTP control API for the step-navigation view
//!
//! The view consumes session state and reports user-driven step changes
//! through this surface:
//! - POST /sessions/:recipe_id/start - Create a session and start listening
//! - POST /sessions/:recipe_id/stop - Tear a session down
//! - GET /sessions/:recipe_id - Session state snapshot
//! - POST /sessions/:recipe_id/step - User-driven step navigation
//! - POST /sessions/:recipe_id/mute - Toggle mute
//! - GET /health - Health check

mod handlers;
mod routes;
mod state;

pub use routes::create_router;
pub use state::AppState;
