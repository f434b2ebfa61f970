//! Reel production worker.
//!
//! Turns fetched news articles into short vertical videos: an LLM writes the
//! narration script, speech synthesis produces audio with character-level
//! timing, the timing is grouped into caption cues, FFmpeg burns the cues
//! into a background video, and the finished reel is uploaded to object
//! storage.

pub mod config;
pub mod error;
pub mod llm;
pub mod news;
pub mod pipeline;
pub mod repo;
pub mod retry;
pub mod transcribe;
pub mod tts;

pub use config::WorkerConfig;
pub use error::{PipelineError, PipelineResult};
pub use llm::{LlmClient, LlmConfig, TextGenerator};
pub use news::{ArticleFilters, NewsClient, NewsConfig};
pub use pipeline::ReelPipeline;
pub use repo::{MemoryRepository, Repository};
pub use retry::{retry_async, RetryConfig};
pub use transcribe::{TranscribeClient, TranscribeConfig, Transcriber};
pub use tts::{SpeechSynthesizer, Synthesis, TtsClient, TtsConfig};
