//! JSON string escaping for the extra-heartbeats payload.
//!
//! wakatime-cli parses the payload with a standard JSON decoder, but the
//! objects are assembled by hand from flag renderings, so string values are
//! escaped here rather than through serde.

use std::fmt::Write;

/// Escape a string for embedding inside a JSON string literal.
///
/// `None` maps to `None` and the empty string maps to itself. Control
/// characters, C1 controls and the U+2000..U+20FF punctuation block are
/// written as `\uXXXX` with uppercase hex digits.
pub fn json_escape(value: Option<&str>) -> Option<String> {
    let value = value?;
    if value.is_empty() {
        return Some(String::new());
    }

    let mut escaped = String::with_capacity(value.len() + 8);
    for c in value.chars() {
        match c {
            '\\' => escaped.push_str("\\\\"),
            '"' => escaped.push_str("\\\""),
            '\u{0008}' => escaped.push_str("\\b"),
            '\u{000C}' => escaped.push_str("\\f"),
            '\n' => escaped.push_str("\\n"),
            '\r' => escaped.push_str("\\r"),
            '\t' => escaped.push_str("\\t"),
            '\u{0000}'..='\u{001F}' | '\u{007F}'..='\u{009F}' | '\u{2000}'..='\u{20FF}' => {
                let _ = write!(escaped, "\\u{:04X}", c as u32);
            }
            _ => escaped.push(c),
        }
    }
    Some(escaped)
}
