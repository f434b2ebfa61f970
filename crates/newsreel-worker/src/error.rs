//! Pipeline error types.

use thiserror::Error;

use newsreel_models::{ArticleId, CaptionError, ReelId};

pub type PipelineResult<T> = Result<T, PipelineError>;

/// Errors that can occur while driving a reel through the pipeline.
///
/// [`PipelineError::is_transient`] decides retryability: transient external
/// failures are retried with backoff up to a fixed budget, everything else
/// fails the stage immediately.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Article not found: {0}")]
    ArticleMissing(ArticleId),

    #[error("Reel not found: {0}")]
    ReelMissing(ReelId),

    #[error("Model returned an empty script")]
    EmptyScript,

    #[error("{service} transient failure: {message}")]
    ServiceTransient {
        service: &'static str,
        message: String,
    },

    #[error("{service} failure: {message}")]
    ServiceFatal {
        service: &'static str,
        message: String,
    },

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Inconsistent pipeline state: {0}")]
    Inconsistent(String),

    #[error("Caption error: {0}")]
    Caption(#[from] CaptionError),

    #[error("Storage error: {0}")]
    Storage(#[from] newsreel_storage::StorageError),

    #[error("Media error: {0}")]
    Media(#[from] newsreel_media::MediaError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl PipelineError {
    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    pub fn inconsistent(msg: impl Into<String>) -> Self {
        Self::Inconsistent(msg.into())
    }

    pub fn transient(service: &'static str, message: impl Into<String>) -> Self {
        Self::ServiceTransient {
            service,
            message: message.into(),
        }
    }

    pub fn fatal(service: &'static str, message: impl Into<String>) -> Self {
        Self::ServiceFatal {
            service,
            message: message.into(),
        }
    }

    /// Check whether retrying can help.
    ///
    /// Transfers to the object store are idempotent, so provider-side upload
    /// and download failures retry; composition retries because encoder
    /// failures and timeouts are often load-induced. Algorithmic errors,
    /// missing objects, and client-side (4xx) service errors never retry.
    pub fn is_transient(&self) -> bool {
        match self {
            PipelineError::ServiceTransient { .. } => true,
            PipelineError::Storage(e) => matches!(
                e,
                newsreel_storage::StorageError::UploadFailed(_)
                    | newsreel_storage::StorageError::DownloadFailed(_)
                    | newsreel_storage::StorageError::PresignFailed(_)
                    | newsreel_storage::StorageError::AwsSdk(_)
            ),
            PipelineError::Media(e) => matches!(
                e,
                newsreel_media::MediaError::CompositionFailed { .. }
                    | newsreel_media::MediaError::Timeout(_)
            ),
            _ => false,
        }
    }
}

/// Convert a reqwest transport error into the transient/fatal split.
///
/// Timeouts, connect errors, and 5xx responses are transient; 4xx responses
/// (bad credentials, malformed requests) are fatal.
pub(crate) fn http_error(service: &'static str, err: reqwest::Error) -> PipelineError {
    if let Some(status) = err.status() {
        if status.is_client_error() {
            return PipelineError::fatal(service, err.to_string());
        }
    }
    PipelineError::transient(service, err.to_string())
}

/// Classify a non-success HTTP status.
pub(crate) fn status_error(
    service: &'static str,
    status: reqwest::StatusCode,
    body: String,
) -> PipelineError {
    let message = format!("HTTP {}: {}", status, body);
    if status.is_client_error() {
        PipelineError::fatal(service, message)
    } else {
        PipelineError::transient(service, message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(PipelineError::transient("tts", "503").is_transient());
        assert!(!PipelineError::fatal("tts", "401").is_transient());
        assert!(!PipelineError::EmptyScript.is_transient());
        assert!(!PipelineError::Caption(CaptionError::InvalidBudget).is_transient());
        assert!(!PipelineError::Storage(
            newsreel_storage::StorageError::not_found("videos/x.mp4")
        )
        .is_transient());
        assert!(PipelineError::Storage(newsreel_storage::StorageError::upload_failed("503"))
            .is_transient());
        assert!(!PipelineError::Media(newsreel_media::MediaError::NoBackgroundAvailable)
            .is_transient());
        assert!(PipelineError::Media(newsreel_media::MediaError::Timeout(300)).is_transient());
    }

    #[test]
    fn test_status_error_split() {
        let err = status_error("llm", reqwest::StatusCode::TOO_MANY_REQUESTS, "slow down".into());
        assert!(matches!(err, PipelineError::ServiceFatal { .. }));

        let err = status_error("llm", reqwest::StatusCode::BAD_GATEWAY, "upstream".into());
        assert!(err.is_transient());
    }
}
