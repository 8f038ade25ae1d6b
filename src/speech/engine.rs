use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};

use super::playback;

/// Synthesis backend seam
///
/// `prepare` is awaited once before any utterance is served; `speak`
/// renders and plays one utterance to completion, observing the interrupt
/// flag so an in-flight utterance can be flushed.
#[async_trait::async_trait]
pub trait SynthesisEngine: Send + Sync {
    async fn prepare(&self) -> Result<()>;
    async fn speak(&self, text: &str, interrupted: Arc<AtomicBool>) -> Result<()>;
}

/// Configuration for the HTTP TTS engine
#[derive(Debug, Clone)]
pub struct TtsConfig {
    /// OpenAI-compatible speech endpoint
    pub url: String,
    /// Bearer token, if the endpoint requires one
    pub api_key: Option<String>,
    pub model: String,
    pub voice: String,
    /// Sample rate of the PCM the endpoint returns
    pub playback_rate: u32,
}

impl Default for TtsConfig {
    fn default() -> Self {
        Self {
            url: "https://api.openai.com/v1/audio/speech".to_string(),
            api_key: None,
            model: "tts-1".to_string(),
            voice: "alloy".to_string(),
            playback_rate: 24000,
        }
    }
}

/// Speech synthesis over an OpenAI-compatible HTTP endpoint
///
/// Requests raw PCM16 so the response bytes go straight to the output
/// device with no decode step.
pub struct HttpTtsEngine {
    client: reqwest::Client,
    config: TtsConfig,
}

impl HttpTtsEngine {
    pub fn new(config: TtsConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }
}

#[async_trait::async_trait]
impl SynthesisEngine for HttpTtsEngine {
    async fn prepare(&self) -> Result<()> {
        // Stateless HTTP client; nothing to warm up
        Ok(())
    }

    async fn speak(&self, text: &str, interrupted: Arc<AtomicBool>) -> Result<()> {
        #[derive(serde::Serialize)]
        struct SpeechRequest<'a> {
            model: &'a str,
            input: &'a str,
            voice: &'a str,
            response_format: &'a str,
        }

        let request = SpeechRequest {
            model: &self.config.model,
            input: text,
            voice: &self.config.voice,
            response_format: "pcm",
        };

        let mut builder = self.client.post(&self.config.url).json(&request);
        if let Some(key) = &self.config.api_key {
            builder = builder.header("Authorization", format!("Bearer {key}"));
        }

        let response = builder.send().await.context("TTS request failed")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow!("TTS error {status}: {body}"));
        }

        let audio = response.bytes().await.context("TTS response read failed")?;

        // Flushed while rendering: skip playback entirely
        if interrupted.load(Ordering::SeqCst) {
            return Ok(());
        }

        let samples: Vec<i16> = audio
            .chunks_exact(2)
            .map(|chunk| i16::from_le_bytes([chunk[0], chunk[1]]))
            .collect();
        let rate = self.config.playback_rate;

        tokio::task::spawn_blocking(move || playback::play_pcm16(&samples, rate, &interrupted))
            .await
            .map_err(|e| anyhow!("playback task failed: {e}"))?
    }
}
