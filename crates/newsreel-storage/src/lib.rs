//! S3-compatible object store gateway.
//!
//! This crate provides:
//! - Reference normalization across the key/URL forms found in persisted data
//! - File upload/download for reel artifacts
//! - Presigned URL generation
//! - Object deletion and existence checks

pub mod client;
pub mod error;
pub mod key;

pub use client::{ObjectStore, S3Client, S3Config};
pub use error::{StorageError, StorageResult};
pub use key::normalize_key;
