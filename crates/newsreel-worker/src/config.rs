//! Worker configuration.

use std::path::PathBuf;
use std::time::Duration;

/// Pipeline worker configuration.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Directory for per-run scratch workspaces
    pub work_dir: PathBuf,
    /// Maximum characters per caption cue
    pub max_cue_chars: usize,
    /// Wall-clock ceiling for a single FFmpeg run
    pub ffmpeg_timeout: Duration,
    /// Retry attempts for transient external failures
    pub max_retries: u32,
    /// Base backoff delay between retries
    pub retry_base_delay: Duration,
    /// Lifetime of presigned read URLs handed to the CRUD layer
    pub signed_url_ttl: Duration,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            work_dir: PathBuf::from("/tmp/newsreel"),
            max_cue_chars: 20,
            ffmpeg_timeout: Duration::from_secs(300),
            max_retries: 3,
            retry_base_delay: Duration::from_millis(500),
            signed_url_ttl: Duration::from_secs(3600),
        }
    }
}

impl WorkerConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self {
            work_dir: std::env::var("WORKER_WORK_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("/tmp/newsreel")),
            max_cue_chars: std::env::var("WORKER_MAX_CUE_CHARS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(20),
            ffmpeg_timeout: Duration::from_secs(
                std::env::var("WORKER_FFMPEG_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(300),
            ),
            max_retries: std::env::var("WORKER_MAX_RETRIES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(3),
            retry_base_delay: Duration::from_millis(
                std::env::var("WORKER_RETRY_BASE_MS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(500),
            ),
            signed_url_ttl: Duration::from_secs(
                std::env::var("WORKER_SIGNED_URL_TTL_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(3600),
            ),
        }
    }
}
