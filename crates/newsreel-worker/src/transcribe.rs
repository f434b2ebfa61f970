//! Transcription fallback client.
//!
//! Recovers word-level timing when the character alignment from synthesis
//! was lost (crash between the audio commit and the cue commit). Talks to a
//! Whisper-style `/audio/transcriptions` endpoint with word granularity.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde::Deserialize;
use tracing::info;

use newsreel_models::Word;

use crate::error::{http_error, status_error, PipelineError, PipelineResult};

const SERVICE: &str = "transcription";

/// Word-level transcription seam consumed by the cue-recovery path.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Transcriber: Send + Sync {
    async fn transcribe(&self, audio_path: &Path) -> PipelineResult<Vec<Word>>;
}

/// Transcription API configuration.
#[derive(Debug, Clone)]
pub struct TranscribeConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
}

impl TranscribeConfig {
    /// Create config from environment variables.
    pub fn from_env() -> PipelineResult<Self> {
        Ok(Self {
            api_key: std::env::var("TRANSCRIBE_API_KEY")
                .map_err(|_| PipelineError::config_error("TRANSCRIBE_API_KEY not set"))?,
            base_url: std::env::var("TRANSCRIBE_BASE_URL")
                .unwrap_or_else(|_| "https://api.openai.com/v1".to_string()),
            model: std::env::var("TRANSCRIBE_MODEL").unwrap_or_else(|_| "whisper-1".to_string()),
        })
    }
}

#[derive(Debug, Deserialize)]
struct TranscriptionResponse {
    #[serde(default)]
    words: Vec<TranscriptWord>,
}

#[derive(Debug, Deserialize)]
struct TranscriptWord {
    word: String,
    start: f64,
    end: f64,
}

/// HTTP transcription client.
pub struct TranscribeClient {
    config: TranscribeConfig,
    client: Client,
}

impl TranscribeClient {
    /// Create a new client.
    pub fn new(config: TranscribeConfig) -> PipelineResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .map_err(|e| PipelineError::config_error(e.to_string()))?;
        Ok(Self { config, client })
    }

    pub fn from_env() -> PipelineResult<Self> {
        Self::new(TranscribeConfig::from_env()?)
    }
}

#[async_trait]
impl Transcriber for TranscribeClient {
    async fn transcribe(&self, audio_path: &Path) -> PipelineResult<Vec<Word>> {
        let bytes = tokio::fs::read(audio_path).await?;
        info!("Transcribing {} ({} bytes)", audio_path.display(), bytes.len());

        let file_name = audio_path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "audio.mp3".to_string());

        let form = Form::new()
            .part(
                "file",
                Part::bytes(bytes)
                    .file_name(file_name)
                    .mime_str("audio/mpeg")
                    .map_err(|e| PipelineError::fatal(SERVICE, e.to_string()))?,
            )
            .text("model", self.config.model.clone())
            .text("response_format", "verbose_json")
            .text("timestamp_granularities[]", "word");

        let response = self
            .client
            .post(format!("{}/audio/transcriptions", self.config.base_url))
            .bearer_auth(&self.config.api_key)
            .multipart(form)
            .send()
            .await
            .map_err(|e| http_error(SERVICE, e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(status_error(SERVICE, status, body));
        }

        let parsed: TranscriptionResponse =
            response.json().await.map_err(|e| http_error(SERVICE, e))?;

        // Transcript words carry no separators; add a trailing space so cue
        // grouping joins them readably.
        Ok(parsed
            .words
            .into_iter()
            .map(|w| Word::new(format!("{} ", w.word.trim()), w.start, w.end))
            .collect())
    }
}
