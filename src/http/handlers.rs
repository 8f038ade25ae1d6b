use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use super::state::AppState;
use crate::audio::MicrophoneCapture;
use crate::recipes::HttpRecipeSource;
use crate::session::{SessionConfig, SessionDeps, VoiceSession};
use crate::speech::{HttpTtsEngine, Synthesizer};
use crate::transport::WsConnector;

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct SelectStepRequest {
    /// User-chosen step index (view-driven navigation)
    pub index: usize,
}

#[derive(Debug, Serialize)]
pub struct SessionActionResponse {
    pub recipe_id: String,
    pub status: String,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /sessions/:recipe_id/start
/// Create a voice session for a recipe and start listening
pub async fn start_session(
    State(state): State<AppState>,
    Path(recipe_id): Path<String>,
) -> impl IntoResponse {
    info!("Starting voice session for recipe: {}", recipe_id);

    {
        let sessions = state.sessions.read().await;
        if sessions.contains_key(&recipe_id) {
            return (
                StatusCode::CONFLICT,
                Json(ErrorResponse {
                    error: format!("Session for recipe {} already exists", recipe_id),
                }),
            )
                .into_response();
        }
    }

    let mut config = SessionConfig::new(recipe_id.clone(), state.api_base_url.clone());
    config.capture = state.capture.clone();
    config.debug_dump_dir = state.debug_dump_dir.clone();

    let (synthesizer, speech_events) =
        Synthesizer::spawn(Box::new(HttpTtsEngine::new(state.tts.clone())));

    let deps = SessionDeps {
        capture: Box::new(MicrophoneCapture::new(config.capture.clone())),
        synthesizer,
        speech_events,
        recipes: Arc::new(HttpRecipeSource::new(state.api_base_url.clone())),
        connector: Arc::new(WsConnector),
    };

    let session = Arc::new(VoiceSession::spawn(config, deps));
    session.start_listening().await;

    {
        let mut sessions = state.sessions.write().await;
        sessions.insert(recipe_id.clone(), session);
    }

    info!("Voice session started for recipe: {}", recipe_id);

    (
        StatusCode::OK,
        Json(SessionActionResponse {
            recipe_id,
            status: "started".to_string(),
        }),
    )
        .into_response()
}

/// POST /sessions/:recipe_id/stop
/// Tear down the voice session for a recipe
pub async fn stop_session(
    State(state): State<AppState>,
    Path(recipe_id): Path<String>,
) -> impl IntoResponse {
    info!("Stopping voice session for recipe: {}", recipe_id);

    let session = {
        let mut sessions = state.sessions.write().await;
        sessions.remove(&recipe_id)
    };

    match session {
        Some(session) => {
            session.shutdown().await;
            (
                StatusCode::OK,
                Json(SessionActionResponse {
                    recipe_id,
                    status: "stopped".to_string(),
                }),
            )
                .into_response()
        }
        None => {
            error!("Session for recipe {} not found", recipe_id);
            (
                StatusCode::NOT_FOUND,
                Json(ErrorResponse {
                    error: format!("Session for recipe {} not found", recipe_id),
                }),
            )
                .into_response()
        }
    }
}

/// GET /sessions/:recipe_id
/// Current session state snapshot
pub async fn get_session_state(
    State(state): State<AppState>,
    Path(recipe_id): Path<String>,
) -> impl IntoResponse {
    let sessions = state.sessions.read().await;

    match sessions.get(&recipe_id) {
        Some(session) => (StatusCode::OK, Json(session.state())).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse {
                error: format!("Session for recipe {} not found", recipe_id),
            }),
        )
            .into_response(),
    }
}

/// POST /sessions/:recipe_id/step
/// Report user-driven step navigation (silent; no speech)
pub async fn select_step(
    State(state): State<AppState>,
    Path(recipe_id): Path<String>,
    Json(req): Json<SelectStepRequest>,
) -> impl IntoResponse {
    let sessions = state.sessions.read().await;

    match sessions.get(&recipe_id) {
        Some(session) => {
            session.select_step(req.index).await;
            (
                StatusCode::OK,
                Json(SessionActionResponse {
                    recipe_id,
                    status: "ok".to_string(),
                }),
            )
                .into_response()
        }
        None => (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse {
                error: format!("Session for recipe {} not found", recipe_id),
            }),
        )
            .into_response(),
    }
}

/// POST /sessions/:recipe_id/mute
/// Toggle mute for a session
pub async fn toggle_mute(
    State(state): State<AppState>,
    Path(recipe_id): Path<String>,
) -> impl IntoResponse {
    let sessions = state.sessions.read().await;

    match sessions.get(&recipe_id) {
        Some(session) => {
            session.toggle_mute().await;
            (
                StatusCode::OK,
                Json(SessionActionResponse {
                    recipe_id,
                    status: "ok".to_string(),
                }),
            )
                .into_response()
        }
        None => (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse {
                error: format!("Session for recipe {} not found", recipe_id),
            }),
        )
            .into_response(),
    }
}

/// GET /health
/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}
