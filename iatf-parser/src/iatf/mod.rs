//! Main module for IATF library functionality

pub mod diagnostics;
pub mod document;
pub mod engine;
pub mod error;
pub mod graph;
pub mod hashing;
pub mod index;
pub mod lexing;
pub mod parsing;
pub mod query;
pub mod service;
pub mod validate;
pub mod watch_state;

pub use diagnostics::{Diagnostic, IssueKind, Severity};
pub use document::{Document, IndexEntry, LineEnding, Reference, Section};
pub use error::{IatfError, IatfResult};
pub use parsing::parse;
