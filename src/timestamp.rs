use crate::error::{Result, ScriptCutError};

/// Parse a transcript timestamp in `HH:MM:SS.mmm` form into seconds.
///
/// The shape is strict: two digits for hours, minutes and seconds, exactly
/// three fractional digits. Anything else is rejected so that a mangled
/// transcript line fails loudly instead of producing a bogus time range.
pub fn parse_timestamp(text: &str) -> Result<f64> {
    let text = text.trim();

    let bytes = text.as_bytes();
    if bytes.len() != 12 || bytes[2] != b':' || bytes[5] != b':' || bytes[8] != b'.' {
        return Err(ScriptCutError::MalformedTimestamp(format!(
            "expected HH:MM:SS.mmm, got '{}'",
            text
        )));
    }

    let field = |s: &str| -> Result<u64> {
        if s.bytes().all(|b| b.is_ascii_digit()) {
            s.parse::<u64>()
                .map_err(|e| ScriptCutError::MalformedTimestamp(format!("'{}': {}", text, e)))
        } else {
            Err(ScriptCutError::MalformedTimestamp(format!(
                "non-digit field in '{}'",
                text
            )))
        }
    };

    let hours = field(&text[0..2])?;
    let minutes = field(&text[3..5])?;
    let seconds = field(&text[6..8])?;
    let millis = field(&text[9..12])?;

    if minutes >= 60 || seconds >= 60 {
        return Err(ScriptCutError::MalformedTimestamp(format!(
            "minute/second field out of range in '{}'",
            text
        )));
    }

    let total_millis = ((hours * 60 + minutes) * 60 + seconds) * 1000 + millis;
    Ok(total_millis as f64 / 1000.0)
}

/// Format seconds as `HH:MM:SS.mmm`, zero-padded.
pub fn format_timestamp(seconds: f64) -> String {
    let total_milliseconds = (seconds * 1000.0).round() as u64;
    let hours = total_milliseconds / 3_600_000;
    let minutes = (total_milliseconds % 3_600_000) / 60_000;
    let secs = (total_milliseconds % 60_000) / 1_000;
    let millis = total_milliseconds % 1_000;

    format!("{:02}:{:02}:{:02}.{:03}", hours, minutes, secs, millis)
}
