//! Background video asset model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A candidate background video looped under the narration.
///
/// The pool is read-only to the pipeline; one asset is chosen uniformly at
/// random per reel. Only metadata lives here, the bytes are in object
/// storage under `storage_ref`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackgroundAsset {
    pub id: Uuid,
    /// Descriptive name.
    pub name: String,
    /// Storage key or URL of the video file.
    pub storage_ref: String,
    /// Duration in seconds, if known.
    pub duration: Option<f64>,
    pub created_at: DateTime<Utc>,
}

impl BackgroundAsset {
    pub fn new(name: impl Into<String>, storage_ref: impl Into<String>, duration: Option<f64>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            storage_ref: storage_ref.into(),
            duration,
            created_at: Utc::now(),
        }
    }
}
