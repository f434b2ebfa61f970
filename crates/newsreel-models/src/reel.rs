//! Reel model and processing status.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::article::ArticleId;

/// Unique reel identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReelId(pub Uuid);

impl ReelId {
    /// Generate a fresh id.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ReelId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ReelId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Processing status of a reel.
///
/// The status is the authoritative progress marker: the pipeline branches on
/// it when resuming, and no other field may be trusted to infer the phase.
/// Transitions are linear, with `Failed` reachable from any non-terminal
/// state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ReelStatus {
    /// Reel created, script not yet generated.
    #[default]
    Queued,
    /// Script generated and persisted.
    ScriptReady,
    /// Narration audio uploaded; `audio_ref` is set.
    AudioReady,
    /// Final video composited locally, not yet published.
    VideoComposited,
    /// Video uploaded; `video_ref` is set. Terminal.
    Ready,
    /// A stage exhausted its retry budget. Terminal.
    Failed,
}

impl ReelStatus {
    /// Get string representation of the status.
    pub fn as_str(&self) -> &'static str {
        match self {
            ReelStatus::Queued => "queued",
            ReelStatus::ScriptReady => "script_ready",
            ReelStatus::AudioReady => "audio_ready",
            ReelStatus::VideoComposited => "video_composited",
            ReelStatus::Ready => "ready",
            ReelStatus::Failed => "failed",
        }
    }

    /// Check if this is a terminal state (no more transitions expected).
    pub fn is_terminal(&self) -> bool {
        matches!(self, ReelStatus::Ready | ReelStatus::Failed)
    }
}

impl std::fmt::Display for ReelStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The pipeline's unit of work: one article's generated video and its
/// processing state.
///
/// Invariants maintained by the repository:
/// - `audio_ref` is set only once status has reached `AudioReady`
/// - `video_ref` is set atomically with the flip to `Ready`
/// - the cue batch is non-empty only once `audio_ref` is set
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reel {
    pub id: ReelId,
    pub article_id: ArticleId,
    /// Generated narration script. `None` until script generation commits.
    pub script: Option<String>,
    /// Storage key of the narration audio.
    pub audio_ref: Option<String>,
    /// Storage key of the final composited video.
    pub video_ref: Option<String>,
    pub status: ReelStatus,
    pub view_count: u64,
    /// Stage that caused a `Failed` status, if any.
    pub failed_stage: Option<String>,
    /// Error description recorded alongside `failed_stage`.
    pub failure: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Reel {
    /// Create a queued reel for an article.
    pub fn new(article_id: ArticleId) -> Self {
        let now = Utc::now();
        Self {
            id: ReelId::new(),
            article_id,
            script: None,
            audio_ref: None,
            video_ref: None,
            status: ReelStatus::Queued,
            view_count: 0,
            failed_stage: None,
            failure: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}
