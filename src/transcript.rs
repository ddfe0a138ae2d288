use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{Result, ScriptCutError};
use crate::timestamp::{format_timestamp, parse_timestamp};

/// Delimiter between the time range and the text in the editable form.
pub const LINE_DELIMITER: &str = ":|:";

/// A half-open playback range `[start, end)` in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: f64,
    pub end: f64,
}

impl TimeRange {
    pub fn new(start: f64, end: f64) -> Result<Self> {
        if !start.is_finite() || !end.is_finite() || start < 0.0 {
            return Err(ScriptCutError::InvalidRange(format!(
                "bounds must be finite and non-negative, got {} - {}",
                start, end
            )));
        }
        if end <= start {
            return Err(ScriptCutError::InvalidRange(format!(
                "end must be after start, got {} - {}",
                start, end
            )));
        }
        Ok(Self { start, end })
    }

    pub fn duration(&self) -> f64 {
        self.end - self.start
    }

    /// Structural equality on the millisecond grid, so a format round-trip
    /// never makes two identical ranges look different.
    pub fn same_as(&self, other: &TimeRange) -> bool {
        to_millis(self.start) == to_millis(other.start) && to_millis(self.end) == to_millis(other.end)
    }
}

fn to_millis(seconds: f64) -> i64 {
    (seconds * 1000.0).round() as i64
}

/// One timed line of a transcript. Immutable once constructed; edits
/// produce new lines.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptLine {
    pub range: TimeRange,
    pub text: String,
}

impl TranscriptLine {
    pub fn new(range: TimeRange, text: impl Into<String>) -> Self {
        Self {
            range,
            text: text.into(),
        }
    }

    /// Encode as the editable line form: `[start - end] :|: text`.
    pub fn encode(&self) -> String {
        format!(
            "[{} - {}] {} {}",
            format_timestamp(self.range.start),
            format_timestamp(self.range.end),
            LINE_DELIMITER,
            self.text
        )
    }

    /// Structural identity used for set membership and diffing: millisecond
    /// range equality plus exact text equality.
    pub fn matches(&self, other: &TranscriptLine) -> bool {
        self.range.same_as(&other.range) && self.text == other.text
    }
}

/// A parse failure scoped to one line of an edited transcript. These are
/// collected as warnings; a single bad line never discards the document.
#[derive(Debug, Clone)]
pub struct LineError {
    pub line_number: usize,
    pub message: String,
}

impl fmt::Display for LineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}: {}", self.line_number, self.message)
    }
}

/// An ordered, chronological sequence of transcript lines.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Transcript {
    pub lines: Vec<TranscriptLine>,
}

impl Transcript {
    pub fn new(lines: Vec<TranscriptLine>) -> Self {
        Self { lines }
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// Render the editable line-oriented form, one line per segment.
    pub fn to_lines(&self) -> String {
        self.lines
            .iter()
            .map(|line| line.encode())
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Parse the editable form back into a transcript.
    ///
    /// Parsing is resilient: each malformed line is reported as a
    /// [`LineError`] and skipped, and the remaining lines are kept. Lines
    /// whose end is not after their start are rejected the same way.
    pub fn from_lines(text: &str) -> (Transcript, Vec<LineError>) {
        let mut lines = Vec::new();
        let mut errors = Vec::new();

        for (index, raw) in text.lines().enumerate() {
            if raw.trim().is_empty() {
                continue;
            }
            match parse_line(raw) {
                Ok(line) => lines.push(line),
                Err(e) => errors.push(LineError {
                    line_number: index + 1,
                    message: e.to_string(),
                }),
            }
        }

        (Transcript { lines }, errors)
    }

    /// Concatenated text of all lines, used as the reference text for voice
    /// synthesis. Lines are joined with single spaces, except that a line
    /// holding bare punctuation attaches to the preceding word directly.
    pub fn full_text(&self) -> String {
        let mut text = String::new();
        for line in &self.lines {
            if !text.is_empty() && !is_bare_punctuation(&line.text) {
                text.push(' ');
            }
            text.push_str(&line.text);
        }
        text
    }

    /// Positional diff against an edited successor of this transcript.
    ///
    /// Returns one flag per line: `true` where the edited line differs from
    /// the original (range or text) and its audio must be resynthesized.
    /// The two transcripts must have the same line count; an unequal count
    /// means the edit dropped or added lines and positional alignment would
    /// silently mismatch segments, so it is rejected outright.
    pub fn diff_against(&self, edited: &Transcript) -> Result<Vec<bool>> {
        if self.len() != edited.len() {
            return Err(ScriptCutError::TranscriptParse(format!(
                "line count mismatch: original has {} lines, edited has {}",
                self.len(),
                edited.len()
            )));
        }

        Ok(self
            .lines
            .iter()
            .zip(edited.lines.iter())
            .map(|(old, new)| !old.matches(new))
            .collect())
    }
}

/// Whisper emits sentence punctuation as standalone words; these must not
/// get a space in front of them when the text is stitched back together.
fn is_bare_punctuation(text: &str) -> bool {
    matches!(text, "," | "." | "!" | "?")
}

fn parse_line(raw: &str) -> Result<TranscriptLine> {
    let mut parts = raw.splitn(2, LINE_DELIMITER);
    let stamp_part = parts.next().unwrap_or_default();
    let text_part = parts
        .next()
        .ok_or_else(|| ScriptCutError::TranscriptParse(format!("missing '{}' delimiter", LINE_DELIMITER)))?;

    let stamp = stamp_part.trim();
    if !stamp.starts_with('[') || !stamp.ends_with(']') {
        return Err(ScriptCutError::TranscriptParse(format!(
            "time range must be bracketed, got '{}'",
            stamp
        )));
    }
    let stamp = &stamp[1..stamp.len() - 1];

    let mut bounds = stamp.splitn(2, '-');
    let start_text = bounds.next().unwrap_or_default();
    let end_text = bounds
        .next()
        .ok_or_else(|| ScriptCutError::TranscriptParse(format!("missing '-' between bounds in '{}'", stamp)))?;

    let start = parse_timestamp(start_text)?;
    let end = parse_timestamp(end_text)?;
    let range = TimeRange::new(start, end)?;

    Ok(TranscriptLine::new(range, text_part.trim()))
}
