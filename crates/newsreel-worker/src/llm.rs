//! LLM client for narration script generation.
//!
//! Talks to an Anthropic-style messages API: the article is folded into a
//! single user prompt and the first text block of the response becomes the
//! reel's narration script.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{http_error, status_error, PipelineError, PipelineResult};

const SERVICE: &str = "llm";

/// Text generation seam consumed by the pipeline.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Generate text for a prompt. An empty completion is the caller's
    /// problem to reject; transport and API errors surface here.
    async fn generate(&self, prompt: &str) -> PipelineResult<String>;
}

/// LLM API configuration.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub max_tokens: u32,
}

impl LlmConfig {
    /// Create config from environment variables.
    pub fn from_env() -> PipelineResult<Self> {
        Ok(Self {
            api_key: std::env::var("LLM_API_KEY")
                .map_err(|_| PipelineError::config_error("LLM_API_KEY not set"))?,
            base_url: std::env::var("LLM_BASE_URL")
                .unwrap_or_else(|_| "https://api.anthropic.com".to_string()),
            model: std::env::var("LLM_MODEL")
                .unwrap_or_else(|_| "claude-3-5-sonnet-20241022".to_string()),
            max_tokens: 1024,
        })
    }
}

/// Messages-API client.
pub struct LlmClient {
    config: LlmConfig,
    client: Client,
}

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: Vec<Message<'a>>,
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(default)]
    text: String,
}

impl LlmClient {
    /// Create a new client.
    pub fn new(config: LlmConfig) -> PipelineResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| PipelineError::config_error(e.to_string()))?;
        Ok(Self { config, client })
    }

    pub fn from_env() -> PipelineResult<Self> {
        Self::new(LlmConfig::from_env()?)
    }
}

#[async_trait]
impl TextGenerator for LlmClient {
    async fn generate(&self, prompt: &str) -> PipelineResult<String> {
        let request = MessagesRequest {
            model: &self.config.model,
            max_tokens: self.config.max_tokens,
            messages: vec![Message {
                role: "user",
                content: prompt,
            }],
        };

        let response = self
            .client
            .post(format!("{}/v1/messages", self.config.base_url))
            .header("x-api-key", &self.config.api_key)
            .header("anthropic-version", "2023-06-01")
            .json(&request)
            .send()
            .await
            .map_err(|e| http_error(SERVICE, e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(status_error(SERVICE, status, body));
        }

        let parsed: MessagesResponse = response.json().await.map_err(|e| http_error(SERVICE, e))?;
        let text = parsed
            .content
            .into_iter()
            .map(|block| block.text)
            .collect::<Vec<_>>()
            .join("");

        debug!("Generated {} characters of script", text.len());
        Ok(text)
    }
}

/// Build the narration prompt for an article.
pub fn script_prompt(title: &str, content: &str) -> String {
    format!(
        "You write narration scripts for short vertical news videos. \
         Rewrite the following article as an engaging spoken script of at \
         most 45 seconds. Output only the words to be spoken: no headings, \
         no stage directions, no emoji.\n\nTitle: {}\n\n{}",
        title, content
    )
}
