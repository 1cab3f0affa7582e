//! Transcript cleanup and speaker-turn segmentation.
//!
//! NASA oral histories follow a `LASTNAME: text...` convention. The
//! segmenter is an explicit two-state machine over cleaned lines, so the
//! flush/open transitions stay independently testable.

use std::mem;
use std::sync::LazyLock;

use common::storage::types::oral_history_segment::Speaker;
use regex::Regex;

/// Turns whose normalized text is not longer than this are discarded as
/// extraction noise (stray "Yes." fragments, orphaned page furniture).
pub const MIN_TURN_CHARS: usize = 20;

#[allow(clippy::expect_used)]
static SPEAKER_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([A-Z][A-Za-z\s.\-']+?):\s*").expect("valid regex"));
#[allow(clippy::expect_used)]
static PAGE_NUMBER_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^\s*\d+\s*$").expect("valid regex"));
#[allow(clippy::expect_used)]
static HEADER_LINES: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)(NASA\s+Johnson\s+Space\s+Center\s+Oral\s+History\s+Project[^\n]*\n?|Edited\s+Oral\s+History\s+Transcript[^\n]*\n?|JOHNSON SPACE CENTER ORAL HISTORY PROJECT[^\n]*\n?)",
    )
    .expect("valid regex")
});
#[allow(clippy::expect_used)]
static BLANK_RUNS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n{3,}").expect("valid regex"));
#[allow(clippy::expect_used)]
static BROKEN_WORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\w)-\n(\w)").expect("valid regex"));

/// Strips page numbers and known header/footer lines, collapses runs of
/// blank lines, and repairs words hyphen-broken across line breaks.
pub fn clean_transcript(raw: &str) -> String {
    let text = PAGE_NUMBER_LINE.replace_all(raw, "");
    let text = HEADER_LINES.replace_all(&text, "");
    let text = BLANK_RUNS.replace_all(&text, "\n\n");
    let text = BROKEN_WORD.replace_all(&text, "${1}${2}");
    text.trim().to_string()
}

/// One attributed stretch of transcript text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpeakerTurn {
    pub speaker: Speaker,
    pub text: String,
}

#[derive(Debug)]
enum SegmenterState {
    Idle,
    Accumulating { speaker: String, parts: Vec<String> },
}

/// Line-at-a-time speaker-turn state machine.
pub struct TurnSegmenter<'a> {
    interviewer_surname: &'a str,
    state: SegmenterState,
    turns: Vec<SpeakerTurn>,
}

impl<'a> TurnSegmenter<'a> {
    pub fn new(interviewer_surname: &'a str) -> Self {
        Self {
            interviewer_surname,
            state: SegmenterState::Idle,
            turns: Vec::new(),
        }
    }

    /// Feed one line. A speaker marker closes any open turn and opens a
    /// new one seeded with the line's remainder; other non-blank lines
    /// append to the open turn; blank lines and pre-marker preamble are
    /// ignored.
    pub fn push_line(&mut self, line: &str) {
        if let Some(captures) = SPEAKER_LINE.captures(line) {
            let speaker = captures[1].trim().to_string();
            let remainder = &line[captures[0].len()..];

            self.flush();

            let parts = if remainder.trim().is_empty() {
                Vec::new()
            } else {
                vec![remainder.to_string()]
            };
            self.state = SegmenterState::Accumulating { speaker, parts };
            return;
        }

        let trimmed = line.trim();
        if trimmed.is_empty() {
            return;
        }
        if let SegmenterState::Accumulating { parts, .. } = &mut self.state {
            parts.push(trimmed.to_string());
        }
    }

    /// End of input: flush the open turn under the same length gate.
    pub fn finish(mut self) -> Vec<SpeakerTurn> {
        self.flush();
        self.turns
    }

    fn flush(&mut self) {
        let state = mem::replace(&mut self.state, SegmenterState::Idle);
        let SegmenterState::Accumulating { speaker, parts } = state else {
            return;
        };

        let text = normalize_whitespace(&parts.join(" "));
        if text.chars().count() <= MIN_TURN_CHARS {
            return;
        }

        let role = if speaker
            .to_uppercase()
            .contains(&self.interviewer_surname.to_uppercase())
        {
            Speaker::Interviewer
        } else {
            Speaker::Astronaut
        };
        self.turns.push(SpeakerTurn {
            speaker: role,
            text,
        });
    }
}

/// Segments a cleaned transcript into ordered speaker turns. Input with
/// no speaker markers yields an empty sequence.
pub fn split_speaker_turns(text: &str, interviewer_surname: &str) -> Vec<SpeakerTurn> {
    let mut segmenter = TurnSegmenter::new(interviewer_surname);
    for line in text.lines() {
        segmenter.push_line(line);
    }
    segmenter.finish()
}

fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_interview_into_roles() {
        let text = "WRIGHT: Hi there, how are you doing today?\n\
                    WHITSON: I am doing well thank you for asking me.";
        let turns = split_speaker_turns(text, "Wright");

        assert_eq!(turns.len(), 2);
        assert_eq!(turns[0].speaker, Speaker::Interviewer);
        assert_eq!(turns[0].text, "Hi there, how are you doing today?");
        assert_eq!(turns[1].speaker, Speaker::Astronaut);
        assert_eq!(turns[1].text, "I am doing well thank you for asking me.");
    }

    #[test]
    fn continuation_lines_join_with_single_spaces() {
        let text = "WHITSON: The first part of the answer\n\
                    continues onto   the next line\n\
                    and then a third.";
        let turns = split_speaker_turns(text, "Wright");

        assert_eq!(turns.len(), 1);
        assert_eq!(
            turns[0].text,
            "The first part of the answer continues onto the next line and then a third."
        );
    }

    #[test]
    fn short_turns_are_discarded_as_noise() {
        let text = "WRIGHT: Yes.\n\
                    WHITSON: That mission changed how we train crews for long stays.";
        let turns = split_speaker_turns(text, "Wright");

        assert_eq!(turns.len(), 1);
        assert_eq!(turns[0].speaker, Speaker::Astronaut);
    }

    #[test]
    fn trailing_turn_is_flushed_at_end_of_input() {
        let text = "WHITSON: We spent six months preparing for that single docking.";
        let turns = split_speaker_turns(text, "Wright");
        assert_eq!(turns.len(), 1);
    }

    #[test]
    fn no_speaker_markers_yields_empty_output() {
        let text = "This transcript never names a speaker.\nIt is just prose.";
        assert!(split_speaker_turns(text, "Wright").is_empty());
    }

    #[test]
    fn preamble_before_first_marker_is_dropped() {
        let text = "Interview conducted in Houston, Texas.\n\
                    WHITSON: The preamble above should not leak into this turn.";
        let turns = split_speaker_turns(text, "Wright");

        assert_eq!(turns.len(), 1);
        assert!(turns[0].text.starts_with("The preamble"));
    }

    #[test]
    fn blank_lines_inside_a_turn_are_ignored() {
        let text = "WHITSON: First half of the thought\n\n\
                    second half after a stray blank line.";
        let turns = split_speaker_turns(text, "Wright");

        assert_eq!(turns.len(), 1);
        assert_eq!(
            turns[0].text,
            "First half of the thought second half after a stray blank line."
        );
    }

    #[test]
    fn interviewer_match_is_case_insensitive_substring() {
        let text = "REBECCA WRIGHT: Could you walk us through the launch morning?";
        let turns = split_speaker_turns(text, "wright");

        assert_eq!(turns.len(), 1);
        assert_eq!(turns[0].speaker, Speaker::Interviewer);
    }

    #[test]
    fn cleaning_strips_page_numbers_and_headers() {
        let raw = "NASA Johnson Space Center Oral History Project 12 June 2002\n\
                   WHITSON: We started the increment with a three person crew.\n\
                   14\n\
                   More of the same answer here.";
        let cleaned = clean_transcript(raw);

        assert!(!cleaned.contains("Oral History Project"));
        assert!(!cleaned.contains("\n14\n"));
        assert!(cleaned.starts_with("WHITSON:"));
    }

    #[test]
    fn cleaning_repairs_hyphen_broken_words() {
        let raw = "WHITSON: The experi-\nment ran for two weeks.";
        let cleaned = clean_transcript(raw);
        assert!(cleaned.contains("experiment ran"));
    }

    #[test]
    fn cleaning_collapses_blank_line_runs() {
        let raw = "line one\n\n\n\n\nline two";
        assert_eq!(clean_transcript(raw), "line one\n\nline two");
    }
}
