//! Error types for engine operations
//!
//! `IatfError` carries the failures that surface at the operation boundary
//! (file-level rebuild/read/validate and the query layer). In-document
//! findings are not errors in this sense: they are accumulated as
//! [`Diagnostic`](crate::iatf::diagnostics::Diagnostic)s so a single pass can
//! report all of them. An `IatfError` is what makes an operation stop.

use std::fmt;

/// Errors surfaced by file-level and query operations.
#[derive(Debug, Clone)]
pub enum IatfError {
    /// The file is not an IATF document that can be operated on
    /// (missing header or delimiters, wrong delimiter order).
    Format(String),
    /// The content region is not safely re-indexable
    /// (duplicate IDs, unclosed sections, mismatched closes).
    Structure(String),
    /// A cross-reference problem reported at the operation boundary.
    Reference(String),
    /// Index and content disagree in a way the caller asked us to treat
    /// as an error rather than correct.
    Consistency(String),
    /// A section ID or title query matched nothing.
    NotFound(String),
    /// Unreadable/unwritable file, or a non-convergent index layout.
    Io(String),
}

impl fmt::Display for IatfError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IatfError::Format(msg) => write!(f, "invalid iatf file format: {}", msg),
            IatfError::Structure(msg) => write!(f, "invalid section structure: {}", msg),
            IatfError::Reference(msg) => write!(f, "reference error: {}", msg),
            IatfError::Consistency(msg) => write!(f, "index/content mismatch: {}", msg),
            IatfError::NotFound(query) => write!(f, "section not found: {}", query),
            IatfError::Io(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for IatfError {}

impl From<std::io::Error> for IatfError {
    fn from(err: std::io::Error) -> Self {
        IatfError::Io(err.to_string())
    }
}

pub type IatfResult<T> = Result<T, IatfError>;
