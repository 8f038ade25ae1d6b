use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::audio::CaptureConfig;
use crate::session::VoiceSession;
use crate::speech::TtsConfig;

/// Shared application state for HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Active voice sessions (recipe_id → session)
    pub sessions: Arc<RwLock<HashMap<String, Arc<VoiceSession>>>>,

    /// REST base URL; recipe fetches and the voice-agent WebSocket derive
    /// from it
    pub api_base_url: String,

    pub capture: CaptureConfig,
    pub tts: TtsConfig,
    pub debug_dump_dir: Option<PathBuf>,
}

impl AppState {
    pub fn new(api_base_url: impl Into<String>) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            api_base_url: api_base_url.into(),
            capture: CaptureConfig::default(),
            tts: TtsConfig::default(),
            debug_dump_dir: None,
        }
    }
}
