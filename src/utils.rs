//! Log previews of CLI output
//!
//! Stdout fragments and stderr lines are arbitrary UTF-8 of any length. Logs
//! only ever see a bounded head, cut on a character boundary.

use std::borrow::Cow;

/// Bounded preview of a line of CLI output
///
/// Lines within `max_bytes` come back borrowed. Longer lines are cut at the
/// last character boundary at or before `max_bytes` and marked with the
/// total length.
///
/// ```
/// use claude_code_sdk::utils::preview;
///
/// assert_eq!(preview("ready", 16), "ready");
/// assert_eq!(preview("Status: 🔍 Active", 10), "Status: ... (19 bytes)");
/// ```
#[must_use]
pub fn preview(line: &str, max_bytes: usize) -> Cow<'_, str> {
    if line.len() <= max_bytes {
        return Cow::Borrowed(line);
    }
    let head = &line[..floor_char_boundary(line, max_bytes)];
    Cow::Owned(format!("{head}... ({} bytes)", line.len()))
}

fn floor_char_boundary(s: &str, index: usize) -> usize {
    (0..=index.min(s.len()))
        .rev()
        .find(|&i| s.is_char_boundary(i))
        .unwrap_or(0)
}
