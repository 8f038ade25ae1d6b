use anyhow::Result;
use serde::Deserialize;

use crate::audio::CaptureConfig;
use crate::speech::TtsConfig;

#[derive(Debug, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub service: ServiceConfig,
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub audio: AudioSettings,
    #[serde(default)]
    pub tts: TtsSettings,
}

#[derive(Debug, Deserialize)]
pub struct ServiceConfig {
    pub name: String,
    pub http: HttpConfig,
}

#[derive(Debug, Deserialize)]
pub struct HttpConfig {
    pub bind: String,
    pub port: u16,
}

#[derive(Debug, Deserialize)]
pub struct ApiConfig {
    /// REST base URL of the recipe backend; the voice-agent WebSocket URL
    /// is derived from it by scheme swap
    pub base_url: String,
}

#[derive(Debug, Deserialize)]
pub struct AudioSettings {
    pub sample_rate: u32,
    pub frame_duration_ms: u64,
    /// Directory for per-session WAV dumps of captured audio; off when unset
    pub debug_dump_dir: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct TtsSettings {
    pub url: String,
    pub model: String,
    pub voice: String,
    pub playback_rate: u32,
    /// Name of the environment variable holding the TTS API key, if any
    pub api_key_env: Option<String>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: "sous-voice".to_string(),
            http: HttpConfig {
                bind: "127.0.0.1".to_string(),
                port: 3920,
            },
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
        }
    }
}

impl Default for AudioSettings {
    fn default() -> Self {
        let capture = CaptureConfig::default();
        Self {
            sample_rate: capture.sample_rate,
            frame_duration_ms: capture.frame_duration_ms,
            debug_dump_dir: None,
        }
    }
}

impl Default for TtsSettings {
    fn default() -> Self {
        let tts = TtsConfig::default();
        Self {
            url: tts.url,
            model: tts.model,
            voice: tts.voice,
            playback_rate: tts.playback_rate,
            api_key_env: None,
        }
    }
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path).required(false))
            .add_source(config::Environment::with_prefix("SOUS_VOICE").separator("__"))
            .build()?;

        Ok(settings.try_deserialize()?)
    }

    pub fn capture_config(&self) -> CaptureConfig {
        CaptureConfig {
            sample_rate: self.audio.sample_rate,
            frame_duration_ms: self.audio.frame_duration_ms,
            ..CaptureConfig::default()
        }
    }

    pub fn tts_config(&self) -> TtsConfig {
        let api_key = self
            .tts
            .api_key_env
            .as_ref()
            .and_then(|name| std::env::var(name).ok());

        TtsConfig {
            url: self.tts.url.clone(),
            api_key,
            model: self.tts.model.clone(),
            voice: self.tts.voice.clone(),
            playback_rate: self.tts.playback_rate,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_without_file() {
        let config = Config::load("config/does-not-exist").unwrap();
        assert_eq!(config.service.name, "sous-voice");
        assert_eq!(config.audio.sample_rate, 16000);
        assert_eq!(config.audio.frame_duration_ms, 100);
        assert!(config.audio.debug_dump_dir.is_none());
    }
}
