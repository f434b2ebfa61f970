//! Storage key normalization.
//!
//! Persisted references come in several historical shapes: bare keys,
//! virtual-hosted-style URLs, path-style URLs, and `s3://bucket/key` URLs.
//! [`normalize_key`] is the single point that collapses all of them into a
//! canonical, scheme-free key; the rest of the system only ever handles the
//! normalized form.

use url::Url;

use crate::error::{StorageError, StorageResult};

/// Normalize a storage reference into a bare object key.
///
/// Accepts any of:
/// - bare key: `videos/reel_1.mp4`
/// - virtual-hosted URL: `https://<bucket>.s3.<region>.amazonaws.com/videos/reel_1.mp4`
/// - path-style URL: `https://s3.<region>.amazonaws.com/<bucket>/videos/reel_1.mp4`
/// - scheme URL: `s3://<bucket>/videos/reel_1.mp4`
///
/// Leading slashes are stripped, and a path component matching `bucket` is
/// stripped from path-style forms. Empty input is rejected. Pure: no IO, no
/// client state.
pub fn normalize_key(bucket: &str, reference: &str) -> StorageResult<String> {
    let reference = reference.trim();
    if reference.is_empty() {
        return Err(StorageError::invalid_reference(
            "storage reference cannot be empty",
        ));
    }

    // Already a key.
    if !reference.contains("://") {
        return Ok(reference.trim_start_matches('/').to_string());
    }

    let parsed = Url::parse(reference)
        .map_err(|e| StorageError::invalid_reference(format!("{}: {}", reference, e)))?;

    // s3://bucket/key — the bucket is the host, the path is the key.
    if parsed.scheme() == "s3" {
        return Ok(parsed.path().trim_start_matches('/').to_string());
    }

    // https://.../(bucket/)?key
    let path = parsed.path().trim_start_matches('/');
    let key = path
        .strip_prefix(&format!("{}/", bucket))
        .unwrap_or(path);
    Ok(key.to_string())
}
