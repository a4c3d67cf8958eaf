//! Data model for parsed IATF documents
//!
//! A [`Document`] is created fresh on every parse and owned exclusively by
//! whichever caller parsed it: the CLI keeps one per invocation, the editor
//! server keeps one per open file and replaces it wholesale on each edit.
//! Nothing in here is shared or mutated after parsing.
//!
//! Line-number conventions:
//!
//! - [`Section::start`] / [`Section::end`] are absolute 1-indexed line numbers,
//!   matching the `lines:start-end` fields rendered into the index.
//! - [`Reference::line`] and diagnostic positions are 0-indexed, matching the
//!   LSP protocol, and are converted at display time.

use std::fmt;

/// First line of every IATF file, optionally followed by `/<version>`.
pub const FORMAT_MARKER: &str = ":::IATF";
/// Opens the machine-generated index block.
pub const INDEX_DELIMITER: &str = "===INDEX===";
/// Opens the human-edited content region. Everything from this line to the end
/// of the file is the source of truth and is never rewritten by the engine.
pub const CONTENT_DELIMITER: &str = "===CONTENT===";

/// Maximum section nesting depth.
pub const MAX_NESTING_DEPTH: usize = 2;

/// Line-ending style detected from the raw bytes and preserved on write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LineEnding {
    #[default]
    Lf,
    CrLf,
}

impl LineEnding {
    /// Prefer CRLF if the raw text contains any CRLF sequence. This avoids
    /// introducing mixed line endings and keeps diffs small on Windows.
    pub fn detect(raw: &str) -> Self {
        if raw.contains("\r\n") {
            LineEnding::CrLf
        } else {
            LineEnding::Lf
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LineEnding::Lf => "\n",
            LineEnding::CrLf => "\r\n",
        }
    }
}

/// A named, nestable block of content delimited by `{#id}` / `{/id}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    /// Unique ID matching `^[A-Za-z][A-Za-z0-9_-]{0,63}$`.
    pub id: String,
    /// First markdown-style heading inside the block, else the ID.
    pub title: String,
    /// Nesting depth. 1 or 2 in a valid document; deeper sections still parse
    /// and carry their real depth so the validator can name them.
    pub level: usize,
    /// 1-indexed line number of the `{#id}` open tag.
    pub start: usize,
    /// 1-indexed line number of the `{/id}` close tag. For an unclosed
    /// section this is forced to the last line so ranges stay usable.
    pub end: usize,
    /// `@summary:` header metadata, continuation lines folded in.
    pub summary: Option<String>,
    /// `@created:` header metadata (`YYYY-MM-DD`).
    pub created: Option<String>,
    /// `@modified:` header metadata (`YYYY-MM-DD`).
    pub modified: Option<String>,
    /// `@hash:` header metadata (7-hex digest recorded at last rebuild).
    pub hash: Option<String>,
    /// Words in this section's own body: tag lines, header metadata, the
    /// title heading line, and nested children are excluded.
    pub word_count: usize,
}

impl Section {
    pub fn new(id: impl Into<String>, start: usize, level: usize) -> Self {
        let id = id.into();
        Self {
            title: id.clone(),
            id,
            level,
            start,
            end: 0,
            summary: None,
            created: None,
            modified: None,
            hash: None,
            word_count: 0,
        }
    }

    /// Rendered length of the open tag, for editor ranges.
    pub fn open_tag_len(&self) -> usize {
        self.id.len() + 3
    }

    /// Whether a 0-indexed line falls inside this section's span.
    pub fn contains_line(&self, line: usize) -> bool {
        self.end >= self.start && line + 1 >= self.start && line + 1 <= self.end
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{#{} | lines:{}-{}}}", self.id, self.start, self.end)
    }
}

/// The index block's declared view of a section. It must always equal the
/// section it mirrors; divergence is a consistency error, not a separate
/// entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexEntry {
    pub id: String,
    pub title: String,
    pub level: usize,
    pub start: usize,
    pub end: usize,
    pub word_count: usize,
    pub summary: Option<String>,
    pub created: Option<String>,
    pub modified: Option<String>,
    pub hash: Option<String>,
    /// 0-indexed line of the entry's heading line within the file.
    pub line: usize,
}

/// A `{@id}` cross-reference token found outside fenced code blocks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference {
    /// ID of the innermost section containing the token, if any.
    pub source: Option<String>,
    /// The referenced section ID.
    pub target: String,
    /// 0-indexed line of the token.
    pub line: usize,
    /// 0-indexed column of the opening `{`.
    pub column: usize,
    /// Byte length of the full `{@id}` token.
    pub len: usize,
}

/// A fully parsed IATF document.
///
/// `lines` are EOL-normalized; `eol` remembers the original style so output
/// can be re-joined byte-identically. `errors` holds every structural and
/// format problem found while parsing; the validator folds them into its
/// report rather than re-discovering them.
#[derive(Debug, Clone, Default)]
pub struct Document {
    pub lines: Vec<String>,
    pub eol: LineEnding,
    /// Whether line 1 is the `:::IATF` format declaration.
    pub has_format_marker: bool,
    /// Version suffix from `:::IATF/<version>`, if present.
    pub format_version: Option<String>,
    /// File-level `@key: value` lines between the format marker and the index.
    pub header_meta: Vec<(String, String)>,
    /// 0-indexed positions of every `===INDEX===` line (exactly one is valid).
    pub index_delims: Vec<usize>,
    /// 0-indexed positions of every `===CONTENT===` line (exactly one is valid).
    pub content_delims: Vec<usize>,
    /// Sections in document order, including re-definitions of duplicate IDs.
    pub sections: Vec<Section>,
    /// Cross-references in document order.
    pub references: Vec<Reference>,
    /// Structural and format problems collected during parsing.
    pub errors: Vec<crate::iatf::diagnostics::Diagnostic>,
}

impl Document {
    /// 0-indexed line of the `===INDEX===` delimiter.
    pub fn index_delim(&self) -> Option<usize> {
        self.index_delims.first().copied()
    }

    /// 0-indexed line of the `===CONTENT===` delimiter.
    pub fn content_delim(&self) -> Option<usize> {
        self.content_delims.first().copied()
    }

    /// 0-indexed line where the content region begins.
    pub fn content_start(&self) -> Option<usize> {
        self.content_delim().map(|delim| delim + 1)
    }

    /// Look up a section by ID. The first definition wins for duplicates.
    pub fn section(&self, id: &str) -> Option<&Section> {
        self.sections.iter().find(|section| section.id == id)
    }

    /// The innermost section whose span contains the given 0-indexed line.
    pub fn section_at_line(&self, line: usize) -> Option<&Section> {
        self.sections
            .iter()
            .filter(|section| section.contains_line(line))
            .max_by_key(|section| (section.level, section.start))
    }

    /// The reference token at the given 0-indexed line/column, if any.
    pub fn reference_at(&self, line: usize, column: usize) -> Option<&Reference> {
        self.references.iter().find(|reference| {
            reference.line == line
                && column >= reference.column
                && column <= reference.column + reference.len
        })
    }
}
