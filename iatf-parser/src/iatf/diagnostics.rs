//! Structured diagnostics for validation and editor tooling
//!
//! The parser and validator never abort on the first problem: every issue is
//! collected into a `Diagnostic` list so one `validate` pass can report the
//! full picture. The same structs feed the CLI (rendered as text) and the LSP
//! server (converted to protocol diagnostics).

use std::fmt;

/// Diagnostic severity. `Error` entries are fatal: `rebuild` refuses to run
/// while any Format or Structure error is present. `Warning` entries are
/// advisory conditions that `rebuild` corrects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
        }
    }
}

/// The error taxonomy a diagnostic belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IssueKind {
    /// Missing format declaration, missing/duplicated/misordered delimiters.
    Format,
    /// Duplicate ID, unclosed section, mismatched close, nesting too deep,
    /// orphan content.
    Structure,
    /// Dangling reference target or self-reference.
    Reference,
    /// Index/content drift: line-range or ID-set mismatch, stale hashes.
    Consistency,
}

impl fmt::Display for IssueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IssueKind::Format => write!(f, "format"),
            IssueKind::Structure => write!(f, "structure"),
            IssueKind::Reference => write!(f, "reference"),
            IssueKind::Consistency => write!(f, "consistency"),
        }
    }
}

/// A single validation finding with its location.
///
/// `line` and `column` are 0-indexed (LSP convention); `Display` renders them
/// 1-indexed for humans. `len` is the length of the offending span on that
/// line, used by editor tooling to underline the token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub kind: IssueKind,
    pub severity: Severity,
    pub message: String,
    pub line: usize,
    pub column: usize,
    pub len: usize,
}

impl Diagnostic {
    pub fn error(kind: IssueKind, message: impl Into<String>, line: usize) -> Self {
        Self {
            kind,
            severity: Severity::Error,
            message: message.into(),
            line,
            column: 0,
            len: 0,
        }
    }

    pub fn warning(kind: IssueKind, message: impl Into<String>, line: usize) -> Self {
        Self {
            severity: Severity::Warning,
            ..Self::error(kind, message, line)
        }
    }

    pub fn at(mut self, column: usize, len: usize) -> Self {
        self.column = column;
        self.len = len;
        self
    }

    pub fn is_fatal(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} [{}]: {} (line {})",
            self.severity,
            self.kind,
            self.message,
            self.line + 1
        )
    }
}
