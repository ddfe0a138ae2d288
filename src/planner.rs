use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::transcript::{TimeRange, Transcript};

/// One planned output segment: a time range in the source, the text it
/// should speak, and whether its audio is replaced with synthesized speech.
/// Directive order is final-output order; each directive maps to exactly
/// one clip.
#[derive(Debug, Clone, PartialEq)]
pub struct EditDirective {
    pub range: TimeRange,
    pub text: String,
    pub resynthesize: bool,
}

/// Wire form of a directive as submitted by the HTTP layer. `sync`
/// defaults to false when absent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirectiveRequest {
    pub start: f64,
    pub end: f64,
    pub text: String,
    #[serde(default)]
    pub sync: bool,
}

/// Trim mode: one directive per line the user kept, source audio reused.
/// Removed lines are simply absent; cutting is implicit in omission.
pub fn plan_trim(kept: &Transcript) -> Vec<EditDirective> {
    kept.lines
        .iter()
        .map(|line| EditDirective {
            range: line.range,
            text: line.text.clone(),
            resynthesize: false,
        })
        .collect()
}

/// Bloopers mode: the complement of trim, directives for the lines the
/// user removed, in original order. Membership is structural (range on the
/// millisecond grid plus text), so a re-formatted but otherwise identical
/// kept line still counts as kept.
pub fn plan_bloopers(original: &Transcript, kept: &Transcript) -> Vec<EditDirective> {
    original
        .lines
        .iter()
        .filter(|line| !kept.lines.iter().any(|kept_line| kept_line.matches(line)))
        .map(|line| EditDirective {
            range: line.range,
            text: line.text.clone(),
            resynthesize: false,
        })
        .collect()
}

/// Resync mode: positionally diff the edited transcript against its
/// predecessor and flag every changed line for audio resynthesis. Fails
/// when the line counts differ (see [`Transcript::diff_against`]).
pub fn plan_resync(original: &Transcript, edited: &Transcript) -> Result<Vec<EditDirective>> {
    let flags = original.diff_against(edited)?;

    Ok(edited
        .lines
        .iter()
        .zip(flags)
        .map(|(line, resynthesize)| EditDirective {
            range: line.range,
            text: line.text.clone(),
            resynthesize,
        })
        .collect())
}

/// Convert HTTP-boundary directive requests into validated directives.
pub fn from_requests(requests: &[DirectiveRequest]) -> Result<Vec<EditDirective>> {
    requests
        .iter()
        .map(|req| {
            Ok(EditDirective {
                range: TimeRange::new(req.start, req.end)?,
                text: req.text.clone(),
                resynthesize: req.sync,
            })
        })
        .collect()
}
