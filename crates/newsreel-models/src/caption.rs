//! Caption cues and the character-level timing alignment.
//!
//! The speech-synthesis stage returns three parallel arrays: the characters
//! of the narrated script plus per-character start and end times. That
//! positional contract is wrapped in [`Alignment`], which enforces the
//! length invariant at construction. Words are reconstructed from the
//! character stream and regrouped into display-sized [`CaptionCue`]s under a
//! character budget.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type for caption operations.
pub type CaptionResult<T> = Result<T, CaptionError>;

/// Errors from alignment construction and cue grouping.
///
/// Both variants indicate programmer error (malformed input from the caller,
/// not a flaky dependency) and are never retried.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CaptionError {
    #[error("misaligned timing: {characters} characters, {starts} start times, {ends} end times")]
    MisalignedTiming {
        characters: usize,
        starts: usize,
        ends: usize,
    },

    #[error("invalid cue budget: must be a positive character count")]
    InvalidBudget,
}

/// Punctuation treated as word separators, in addition to whitespace.
const SEPARATORS: &[char] = &['.', ',', '!', '?', ';', ':', '—', '-'];

fn is_separator(c: char) -> bool {
    c.is_whitespace() || SEPARATORS.contains(&c)
}

/// A reconstructed word with its narration timing.
///
/// Trailing separators are glued onto the word that precedes them, so a
/// word's text may end in punctuation or whitespace and its end time covers
/// those trailing characters.
#[derive(Debug, Clone, PartialEq)]
pub struct Word {
    pub text: String,
    /// Narration time of the first character, in seconds.
    pub start_time: f64,
    /// Narration time of the last retained character, in seconds.
    pub end_time: f64,
}

impl Word {
    pub fn new(text: impl Into<String>, start_time: f64, end_time: f64) -> Self {
        Self {
            text: text.into(),
            start_time,
            end_time,
        }
    }

    fn len_chars(&self) -> usize {
        self.text.chars().count()
    }
}

/// A timed caption chunk destined for one subtitle display event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptionCue {
    pub text: String,
    /// Start time in seconds.
    pub start_time: f64,
    /// End time in seconds.
    pub end_time: f64,
    /// Position in the cue sequence, strictly increasing from zero.
    pub sequence_order: u32,
}

/// Character-level timing alignment returned by speech synthesis.
///
/// Construction fails unless all three arrays have identical length, so the
/// parallel-array invariant holds everywhere downstream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alignment {
    characters: Vec<char>,
    start_times: Vec<f64>,
    end_times: Vec<f64>,
}

impl Alignment {
    /// Wrap parallel timing arrays, validating the length invariant.
    pub fn new(
        characters: Vec<char>,
        start_times: Vec<f64>,
        end_times: Vec<f64>,
    ) -> CaptionResult<Self> {
        if characters.len() != start_times.len() || characters.len() != end_times.len() {
            return Err(CaptionError::MisalignedTiming {
                characters: characters.len(),
                starts: start_times.len(),
                ends: end_times.len(),
            });
        }
        Ok(Self {
            characters,
            start_times,
            end_times,
        })
    }

    pub fn len(&self) -> usize {
        self.characters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.characters.is_empty()
    }

    /// Reconstruct words from the character stream.
    ///
    /// A contiguous run of non-separator characters forms a word that
    /// remembers the timing of its first and last character. A separator hit
    /// immediately after a word extends that word: its character is appended
    /// to the word's text and its end time becomes the word's end time.
    /// Separators with no preceding word (leading, or runs of them) are
    /// dropped.
    pub fn words(&self) -> Vec<Word> {
        let mut words: Vec<Word> = Vec::new();
        let mut current = String::new();
        let mut word_start_idx = 0usize;

        for (i, &ch) in self.characters.iter().enumerate() {
            if is_separator(ch) {
                if !current.is_empty() {
                    words.push(Word {
                        text: std::mem::take(&mut current),
                        start_time: self.start_times[word_start_idx],
                        end_time: self.end_times[i - 1],
                    });
                }
                // Glue the separator onto the previous word.
                if let Some(last) = words.last_mut() {
                    last.end_time = self.end_times[i];
                    last.text.push(ch);
                }
            } else {
                if current.is_empty() {
                    word_start_idx = i;
                }
                current.push(ch);
            }
        }

        // Close out a word that runs to the end of the input.
        if !current.is_empty() {
            words.push(Word {
                text: current,
                start_time: self.start_times[word_start_idx],
                end_time: self.end_times[self.characters.len() - 1],
            });
        }

        words
    }

    /// Reconstruct words and regroup them into cues under `max_chars`.
    pub fn group_into_cues(&self, max_chars: usize) -> CaptionResult<Vec<CaptionCue>> {
        group_words(&self.words(), max_chars)
    }
}

/// Group timed words into caption cues under a character budget.
///
/// Words accumulate into a cue while the running length stays within
/// `max_chars`; a word that would overflow a non-empty cue closes it and
/// starts the next one. A single word is never split, so a word longer than
/// the budget still yields its own one-word cue. Cue text is trimmed of
/// incidental surrounding whitespace; cue timing spans from the first word's
/// start to the last word's end.
///
/// Also used directly by the transcription fallback path, which produces
/// word-level timings without a character alignment.
pub fn group_words(words: &[Word], max_chars: usize) -> CaptionResult<Vec<CaptionCue>> {
    if max_chars == 0 {
        return Err(CaptionError::InvalidBudget);
    }

    let mut cues: Vec<CaptionCue> = Vec::new();
    let mut group: Vec<&Word> = Vec::new();
    let mut group_len = 0usize;

    for word in words {
        let word_len = word.len_chars();
        if !group.is_empty() && group_len + word_len > max_chars {
            cues.push(close_group(&group, cues.len() as u32));
            group.clear();
            group.push(word);
            group_len = word_len;
        } else {
            group.push(word);
            group_len += word_len;
        }
    }

    if !group.is_empty() {
        cues.push(close_group(&group, cues.len() as u32));
    }

    Ok(cues)
}

fn close_group(group: &[&Word], sequence_order: u32) -> CaptionCue {
    let text: String = group.iter().map(|w| w.text.as_str()).collect();
    CaptionCue {
        text: text.trim().to_string(),
        start_time: group[0].start_time,
        end_time: group[group.len() - 1].end_time,
        sequence_order,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Build an alignment from a script with synthetic per-character timing:
    /// character `i` spans `[i * 0.1, (i + 1) * 0.1)`.
    fn aligned(text: &str) -> Alignment {
        let characters: Vec<char> = text.chars().collect();
        let start_times: Vec<f64> = (0..characters.len()).map(|i| i as f64 * 0.1).collect();
        let end_times: Vec<f64> = (0..characters.len()).map(|i| (i + 1) as f64 * 0.1).collect();
        Alignment::new(characters, start_times, end_times).unwrap()
    }

    #[test]
    fn test_misaligned_arrays_rejected() {
        let err = Alignment::new(vec!['h', 'i'], vec![0.0], vec![0.1, 0.2]).unwrap_err();
        assert_eq!(
            err,
            CaptionError::MisalignedTiming {
                characters: 2,
                starts: 1,
                ends: 2,
            }
        );
    }

    #[test]
    fn test_zero_budget_rejected() {
        let err = aligned("hi there").group_into_cues(0).unwrap_err();
        assert_eq!(err, CaptionError::InvalidBudget);
    }

    #[test]
    fn test_empty_input_yields_empty_cues() {
        let alignment = Alignment::new(vec![], vec![], vec![]).unwrap();
        assert!(alignment.is_empty());
        assert!(alignment.group_into_cues(20).unwrap().is_empty());
    }

    #[test]
    fn test_separator_only_input_yields_no_words() {
        let alignment = aligned("  ,, -- ");
        assert!(alignment.words().is_empty());
        assert!(alignment.group_into_cues(10).unwrap().is_empty());
    }

    #[test]
    fn test_word_reconstruction_glues_punctuation() {
        // "hi, yes" -> chars 0..=1 are "hi", 2 is ',', 3 is ' ', 4..=6 "yes"
        let words = aligned("hi, yes").words();
        assert_eq!(words.len(), 2);

        // Both the comma and the following space extend the first word.
        assert_eq!(words[0].text, "hi, ");
        assert!((words[0].start_time - 0.0).abs() < 1e-9);
        assert!((words[0].end_time - 0.4).abs() < 1e-9);

        assert_eq!(words[1].text, "yes");
        assert!((words[1].start_time - 0.4).abs() < 1e-9);
        assert!((words[1].end_time - 0.7).abs() < 1e-9);
    }

    #[test]
    fn test_trailing_word_without_separator_is_closed() {
        let words = aligned("end").words();
        assert_eq!(words.len(), 1);
        assert_eq!(words[0].text, "end");
        assert!((words[0].end_time - 0.3).abs() < 1e-9);
    }

    #[test]
    fn test_budget_one_gives_one_cue_per_word() {
        let cues = aligned("one two three").group_into_cues(1).unwrap();
        assert_eq!(cues.len(), 3);
        assert_eq!(cues[0].text, "one");
        assert_eq!(cues[1].text, "two");
        assert_eq!(cues[2].text, "three");
        for (i, cue) in cues.iter().enumerate() {
            assert_eq!(cue.sequence_order, i as u32);
        }
    }

    #[test]
    fn test_budget_exactly_word_length() {
        // "hello" occupies exactly the budget; the next word starts a new cue.
        let cues = aligned("hello world").group_into_cues(6).unwrap();
        assert_eq!(cues.len(), 2);
        assert_eq!(cues[0].text, "hello");
        assert_eq!(cues[1].text, "world");
    }

    #[test]
    fn test_single_word_longer_than_budget_gets_own_cue() {
        let cues = aligned("extraordinary yes").group_into_cues(5).unwrap();
        assert_eq!(cues[0].text, "extraordinary");
        assert_eq!(cues[1].text, "yes");
    }

    #[test]
    fn test_cues_never_split_words_and_reconstruct_text() {
        let script = "Breaking news today: markets rallied, then dipped sharply.";
        let alignment = aligned(script);
        let words = alignment.words();
        let cues = alignment.group_into_cues(18).unwrap();

        // Every word appears whole in exactly one cue.
        let joined: String = cues.iter().map(|c| c.text.as_str()).collect::<Vec<_>>().join(" ");
        for word in &words {
            assert!(
                joined.contains(word.text.trim()),
                "word {:?} missing from {:?}",
                word.text,
                joined
            );
        }

        // Cue timing is monotonic and sequence order is dense.
        for pair in cues.windows(2) {
            assert!(pair[0].start_time <= pair[1].start_time);
            assert_eq!(pair[0].sequence_order + 1, pair[1].sequence_order);
        }
        // First cue starts where the first word starts; last cue ends where
        // the last word ends.
        assert!((cues[0].start_time - words[0].start_time).abs() < 1e-9);
        assert!((cues.last().unwrap().end_time - words.last().unwrap().end_time).abs() < 1e-9);
    }

    #[test]
    fn test_group_words_direct_for_transcript_fallback() {
        let words = vec![
            Word::new("hello ", 0.0, 0.6),
            Word::new("from ", 0.6, 1.0),
            Word::new("whisper", 1.0, 1.8),
        ];
        let cues = group_words(&words, 11).unwrap();
        assert_eq!(cues.len(), 2);
        assert_eq!(cues[0].text, "hello from");
        assert!((cues[0].end_time - 1.0).abs() < 1e-9);
        assert_eq!(cues[1].text, "whisper");
    }
}
