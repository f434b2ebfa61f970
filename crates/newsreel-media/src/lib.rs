//! FFmpeg CLI wrapper for reel composition.
//!
//! This crate provides:
//! - An FFmpeg command builder and runner with a wall-clock ceiling
//! - SRT subtitle emission
//! - Background selection and the fixed composition template

pub mod command;
pub mod compose;
pub mod error;
pub mod subtitle;

pub use command::{check_ffmpeg, FfmpegCommand, FfmpegRunner, ToolRunner};
pub use compose::{compose_command, select_background, Compositor, SUBTITLE_SCALE, SUBTITLE_STYLE};
pub use error::{MediaError, MediaResult};
