//! Shared data models for the Newsreel backend.
//!
//! This crate provides Serde-serializable types for:
//! - Articles fetched from the news provider
//! - Reels and their processing status
//! - Timed caption cues and the character-level timing alignment
//! - Background video assets and watch history

pub mod article;
pub mod background;
pub mod caption;
pub mod reel;
pub mod watch;

// Re-export common types
pub use article::{Article, ArticleId};
pub use background::BackgroundAsset;
pub use caption::{Alignment, CaptionCue, CaptionError, CaptionResult, Word};
pub use reel::{Reel, ReelId, ReelStatus};
pub use watch::ReelWatch;
