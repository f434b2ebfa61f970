//! SRT subtitle emission.
//!
//! Serializes an ordered cue sequence into the numbered-cue SRT format that
//! FFmpeg's `subtitles` filter consumes. Output is always UTF-8: the filter
//! silently stops rendering cues after the first byte it cannot decode, so
//! curly quotes and em-dashes in generated scripts must survive intact.

use std::path::{Path, PathBuf};

use newsreel_models::CaptionCue;

use crate::error::MediaResult;

/// Format a time in seconds as `HH:MM:SS,mmm`.
///
/// Milliseconds are truncated, not rounded, so a cue never leaks into the
/// following display slot.
pub fn format_timestamp(seconds: f64) -> String {
    let hours = (seconds / 3600.0) as u64;
    let minutes = ((seconds % 3600.0) / 60.0) as u64;
    let secs = (seconds % 60.0) as u64;
    let millis = ((seconds * 1000.0) as u64) % 1000;
    format!("{:02}:{:02}:{:02},{:03}", hours, minutes, secs, millis)
}

/// Render cues as an SRT document.
///
/// Cues are numbered 1-based in the order given; each block is the index,
/// the time range, the text, and a blank separator line. Deterministic for
/// identical input.
pub fn render(cues: &[CaptionCue]) -> String {
    let mut out = String::new();
    for (i, cue) in cues.iter().enumerate() {
        out.push_str(&format!(
            "{}\n{} --> {}\n{}\n\n",
            i + 1,
            format_timestamp(cue.start_time),
            format_timestamp(cue.end_time),
            cue.text
        ));
    }
    out
}

/// Write cues to an SRT file at `path`.
pub async fn write_srt(cues: &[CaptionCue], path: impl AsRef<Path>) -> MediaResult<PathBuf> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    // String contents are UTF-8 by construction.
    tokio::fs::write(path, render(cues)).await?;
    Ok(path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cue(text: &str, start: f64, end: f64, order: u32) -> CaptionCue {
        CaptionCue {
            text: text.to_string(),
            start_time: start,
            end_time: end,
            sequence_order: order,
        }
    }

    #[test]
    fn test_timestamp_zero_padding() {
        assert_eq!(format_timestamp(0.0), "00:00:00,000");
        assert_eq!(format_timestamp(0.5), "00:00:00,500");
        assert_eq!(format_timestamp(61.25), "00:01:01,250");
        assert_eq!(format_timestamp(3661.007), "01:01:01,007");
    }

    #[test]
    fn test_timestamp_truncates_milliseconds() {
        // 1.2349 s is 1234.9 ms; truncation keeps 234, never rounds to 235.
        assert_eq!(format_timestamp(1.2349), "00:00:01,234");
    }

    #[test]
    fn test_three_cue_document() {
        let cues = vec![
            cue("hi", 0.0, 0.5, 0),
            cue("there", 0.5, 1.2, 1),
            cue("world", 1.2, 2.0, 2),
        ];
        let srt = render(&cues);
        assert_eq!(
            srt,
            "1\n00:00:00,000 --> 00:00:00,500\nhi\n\n\
             2\n00:00:00,500 --> 00:00:01,200\nthere\n\n\
             3\n00:00:01,200 --> 00:00:02,000\nworld\n\n"
        );
    }

    #[test]
    fn test_unicode_punctuation_preserved() {
        let cues = vec![cue("“smart” — quotes", 0.0, 1.0, 0)];
        let srt = render(&cues);
        assert!(srt.contains("“smart” — quotes"));
    }

    #[tokio::test]
    async fn test_write_srt_creates_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("captions.srt");
        let cues = vec![cue("hello", 0.0, 1.0, 0)];

        let written = write_srt(&cues, &path).await.unwrap();
        assert_eq!(written, path);

        let contents = tokio::fs::read_to_string(&path).await.unwrap();
        assert!(contents.starts_with("1\n00:00:00,000 --> 00:00:01,000\nhello\n"));
    }
}
