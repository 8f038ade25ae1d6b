use std::path::PathBuf;

use crate::audio::CaptureConfig;

/// Configuration for a voice-cooking session
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Recipe id; doubles as the session key and the WebSocket path segment
    pub recipe_id: String,

    /// REST base URL; the voice-agent WebSocket URL is derived from it
    pub api_base_url: String,

    /// Microphone capture parameters
    pub capture: CaptureConfig,

    /// Speak the first step once the recipe loads and the synthesizer is ready
    pub speak_first_step: bool,

    /// Directory for the debug WAV dump of captured audio; disabled when absent
    pub debug_dump_dir: Option<PathBuf>,
}

impl SessionConfig {
    pub fn new(recipe_id: impl Into<String>, api_base_url: impl Into<String>) -> Self {
        Self {
            recipe_id: recipe_id.into(),
            api_base_url: api_base_url.into(),
            capture: CaptureConfig::default(),
            speak_first_step: true,
            debug_dump_dir: None,
        }
    }
}
