//! Line scanner
//!
//!     IATF is strictly line-oriented, so lexing is a single stateless pass:
//!     the raw text is split into EOL-normalized lines, and each line is
//!     classified into exactly one [`LineEvent`]. No parsing decisions are
//!     made here; whether an `@summary:` line is section-header metadata or
//!     plain body text depends on position, and that state lives in the fold
//!     performed by [`parsing`](crate::iatf::parsing).
//!
//!     Keeping classification flat makes the later fold safe against the
//!     aliasing bugs that plague in-place line mutation: absolute line numbers
//!     shift when the index block is regenerated, and nothing in the event
//!     list holds a position that could go stale.

use crate::iatf::document::{LineEnding, CONTENT_DELIMITER, FORMAT_MARKER, INDEX_DELIMITER};
use once_cell::sync::Lazy;
use regex::Regex;

/// `{#id}` at the start of a line.
pub static OPEN_TAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\{#([A-Za-z][A-Za-z0-9_-]{0,63})\}").expect("valid regex"));

/// `{/id}` at the start of a line.
pub static CLOSE_TAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\{/([A-Za-z][A-Za-z0-9_-]{0,63})\}").expect("valid regex"));

/// `{@id}` anywhere in a line.
pub static REFERENCE_TOKEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{@([A-Za-z][A-Za-z0-9_-]{0,63})\}").expect("valid regex"));

/// `@key: value` metadata line.
static METADATA_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^@([A-Za-z][A-Za-z0-9_-]*):[ \t]*(.*)$").expect("valid regex"));

/// What a single line is, independent of any surrounding state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineEvent {
    /// `:::IATF` or `:::IATF/<version>`.
    FormatMarker { version: Option<String> },
    /// `===INDEX===`.
    IndexDelimiter,
    /// `===CONTENT===`.
    ContentDelimiter,
    /// `{#id}` open tag.
    Open { id: String },
    /// `{/id}` close tag.
    Close { id: String },
    /// `@key: value`.
    Metadata { key: String, value: String },
    /// Markdown-style heading; carries the text with `#` markers stripped.
    Heading { text: String },
    /// Whitespace-only line.
    Blank,
    /// Anything else.
    Text,
}

/// Split raw text into EOL-normalized lines plus the detected ending style.
///
/// Lone `\r` is normalized as well so stray carriage returns cannot poison
/// hashes or line counts.
pub fn split_lines(raw: &str) -> (Vec<String>, LineEnding) {
    let eol = LineEnding::detect(raw);
    let normalized = raw.replace("\r\n", "\n").replace('\r', "\n");
    let lines = normalized.split('\n').map(str::to_string).collect();
    (lines, eol)
}

/// Whether a line toggles the fenced-code-block flag.
pub fn is_code_fence(line: &str) -> bool {
    line.trim_start().starts_with("```")
}

/// Classify every line into an event. One event per line, same order.
pub fn scan(lines: &[String]) -> Vec<LineEvent> {
    lines.iter().map(|line| classify(line)).collect()
}

fn classify(line: &str) -> LineEvent {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return LineEvent::Blank;
    }
    if trimmed == INDEX_DELIMITER {
        return LineEvent::IndexDelimiter;
    }
    if trimmed == CONTENT_DELIMITER {
        return LineEvent::ContentDelimiter;
    }
    if let Some(rest) = trimmed.strip_prefix(FORMAT_MARKER) {
        if rest.is_empty() {
            return LineEvent::FormatMarker { version: None };
        }
        if let Some(version) = rest.strip_prefix('/') {
            return LineEvent::FormatMarker {
                version: Some(version.to_string()),
            };
        }
    }
    if let Some(captures) = OPEN_TAG.captures(line) {
        return LineEvent::Open {
            id: captures[1].to_string(),
        };
    }
    if let Some(captures) = CLOSE_TAG.captures(line) {
        return LineEvent::Close {
            id: captures[1].to_string(),
        };
    }
    if let Some(captures) = METADATA_LINE.captures(line) {
        return LineEvent::Metadata {
            key: captures[1].to_string(),
            value: captures[2].trim_end().to_string(),
        };
    }
    if line.starts_with('#') {
        return LineEvent::Heading {
            text: line.trim_start_matches('#').trim().to_string(),
        };
    }
    LineEvent::Text
}
