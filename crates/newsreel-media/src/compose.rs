//! Final reel composition.
//!
//! Combines a background video, the narration audio, and the burned-in
//! subtitle file into the final reel with a single fixed FFmpeg template.

use std::path::Path;
use std::sync::Arc;

use rand::prelude::IndexedRandom;
use tracing::{info, warn};

use newsreel_models::BackgroundAsset;

use crate::command::{FfmpegCommand, ToolRunner};
use crate::error::{MediaError, MediaResult};

/// Burn style for the subtitles filter.
///
/// Fixed per deployment, not per reel; keep in sync with the frontend's
/// preview rendering if that ever exists.
pub const SUBTITLE_STYLE: &str =
    "Fontname=Impact,Fontsize=14,PrimaryColour=&H00FF4000,OutlineColour=&H000000,Outline=1,Alignment=10";

/// Upscale factor applied before subtitle burn-in so the fixed font size
/// stays legible on small source videos.
pub const SUBTITLE_SCALE: u32 = 3;

/// Pick a background asset uniformly at random from the pool.
///
/// An empty pool is fatal for the reel and is not retried.
pub fn select_background(pool: &[BackgroundAsset]) -> MediaResult<&BackgroundAsset> {
    pool.choose(&mut rand::rng())
        .ok_or(MediaError::NoBackgroundAvailable)
}

/// Build the fixed composition argument template.
///
/// - video comes from the background input, audio from the narration input;
///   the background's own audio track is explicitly excluded
/// - the subtitle file is burned in after upscaling
/// - `-shortest` truncates to the shorter input so the background loop never
///   outruns the narration
pub fn compose_command(
    background: &Path,
    audio: &Path,
    subtitles: &Path,
    output: &Path,
) -> FfmpegCommand {
    FfmpegCommand::new(output)
        .input(background)
        .input(audio)
        .video_filter(format!(
            "scale=iw*{scale}:ih*{scale},subtitles={srt}:force_style='{style}'",
            scale = SUBTITLE_SCALE,
            srt = subtitles.to_string_lossy(),
            style = SUBTITLE_STYLE,
        ))
        .map("0:v:0")
        .map("1:a:0")
        .shortest()
        .video_codec("libx264")
        .audio_codec("aac")
}

/// Invokes the composition template through a [`ToolRunner`].
pub struct Compositor {
    runner: Arc<dyn ToolRunner>,
}

impl Compositor {
    pub fn new(runner: Arc<dyn ToolRunner>) -> Self {
        Self { runner }
    }

    /// Composite the final reel video.
    ///
    /// Missing input files fail before the subprocess is spawned. A failed
    /// or timed-out run removes any partial output file so it can never be
    /// uploaded.
    pub async fn compose(
        &self,
        background: &Path,
        audio: &Path,
        subtitles: &Path,
        output: &Path,
    ) -> MediaResult<()> {
        for input in [background, audio, subtitles] {
            if !input.exists() {
                return Err(MediaError::InputMissing(input.to_path_buf()));
            }
        }

        let cmd = compose_command(background, audio, subtitles, output);
        match self.runner.run(&cmd.build_args()).await {
            Ok(()) => {
                if !output.exists() {
                    return Err(MediaError::composition_failed(
                        format!("FFmpeg succeeded but produced no output at {}", output.display()),
                        None,
                        None,
                    ));
                }
                info!("Composited reel video at {}", output.display());
                Ok(())
            }
            Err(e) => {
                if output.exists() {
                    warn!("Discarding partial output {}", output.display());
                    let _ = tokio::fs::remove_file(output).await;
                }
                Err(e)
            }
        }
    }
}
