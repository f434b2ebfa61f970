//! Watch history model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::reel::ReelId;

/// Record of a user having watched a reel.
///
/// Kept for the CRUD layer's listing path. Listings do not currently filter
/// out watched reels (infinite scrolling relies on repeats), but the history
/// is recorded so that behavior can change without a data migration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReelWatch {
    pub reel_id: ReelId,
    pub user_id: String,
    pub watched_at: DateTime<Utc>,
}

impl ReelWatch {
    pub fn new(reel_id: ReelId, user_id: impl Into<String>) -> Self {
        Self {
            reel_id,
            user_id: user_id.into(),
            watched_at: Utc::now(),
        }
    }
}
