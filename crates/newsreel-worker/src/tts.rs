//! Text-to-speech client with character-level timestamps.
//!
//! Talks to an ElevenLabs-style `with-timestamps` endpoint: the response
//! carries base64-encoded audio plus three parallel arrays (characters,
//! per-character start times, per-character end times) that become the
//! caption [`Alignment`].

use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use newsreel_models::Alignment;

use crate::error::{http_error, status_error, PipelineError, PipelineResult};

const SERVICE: &str = "tts";

/// Result of synthesizing a script.
#[derive(Debug)]
pub struct Synthesis {
    /// Raw audio bytes (MP3).
    pub audio: Vec<u8>,
    /// Character-level narration timing.
    pub alignment: Alignment,
}

/// Speech synthesis seam consumed by the pipeline.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    async fn synthesize(&self, text: &str) -> PipelineResult<Synthesis>;
}

/// TTS API configuration.
#[derive(Debug, Clone)]
pub struct TtsConfig {
    pub api_key: String,
    pub base_url: String,
    pub voice_id: String,
}

impl TtsConfig {
    /// Create config from environment variables.
    pub fn from_env() -> PipelineResult<Self> {
        Ok(Self {
            api_key: std::env::var("TTS_API_KEY")
                .map_err(|_| PipelineError::config_error("TTS_API_KEY not set"))?,
            base_url: std::env::var("TTS_BASE_URL")
                .unwrap_or_else(|_| "https://api.elevenlabs.io".to_string()),
            voice_id: std::env::var("TTS_VOICE_ID")
                .map_err(|_| PipelineError::config_error("TTS_VOICE_ID not set"))?,
        })
    }
}

#[derive(Debug, Deserialize)]
struct TimestampsResponse {
    audio_base64: String,
    alignment: AlignmentDto,
}

#[derive(Debug, Deserialize)]
struct AlignmentDto {
    /// One entry per character; the provider sends single-character strings.
    characters: Vec<String>,
    character_start_times_seconds: Vec<f64>,
    character_end_times_seconds: Vec<f64>,
}

/// HTTP TTS client.
pub struct TtsClient {
    config: TtsConfig,
    client: Client,
}

impl TtsClient {
    /// Create a new client.
    pub fn new(config: TtsConfig) -> PipelineResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| PipelineError::config_error(e.to_string()))?;
        Ok(Self { config, client })
    }

    pub fn from_env() -> PipelineResult<Self> {
        Self::new(TtsConfig::from_env()?)
    }
}

#[async_trait]
impl SpeechSynthesizer for TtsClient {
    async fn synthesize(&self, text: &str) -> PipelineResult<Synthesis> {
        let url = format!(
            "{}/v1/text-to-speech/{}/with-timestamps",
            self.config.base_url, self.config.voice_id
        );

        let response = self
            .client
            .post(url)
            .header("xi-api-key", &self.config.api_key)
            .json(&serde_json::json!({ "text": text }))
            .send()
            .await
            .map_err(|e| http_error(SERVICE, e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(status_error(SERVICE, status, body));
        }

        let parsed: TimestampsResponse =
            response.json().await.map_err(|e| http_error(SERVICE, e))?;

        let audio = BASE64
            .decode(&parsed.audio_base64)
            .map_err(|e| PipelineError::fatal(SERVICE, format!("invalid audio payload: {}", e)))?;

        let characters: Vec<char> = parsed
            .alignment
            .characters
            .iter()
            .map(|s| s.chars().next().unwrap_or(' '))
            .collect();
        let alignment = Alignment::new(
            characters,
            parsed.alignment.character_start_times_seconds,
            parsed.alignment.character_end_times_seconds,
        )?;

        debug!(
            "Synthesized {} bytes of audio, {} aligned characters",
            audio.len(),
            alignment.len()
        );
        Ok(Synthesis { audio, alignment })
    }
}
