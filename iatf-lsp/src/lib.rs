//! Language Server Protocol implementation for IATF
//!
//!     Rich editor support for IATF documents: live validation diagnostics,
//!     section ID completion inside `{@`/`{#`/`{/` tags, hover cards for
//!     sections and references, go-to-definition from a reference to its
//!     section, find-references the other way, and a document outline built
//!     from the section hierarchy.
//!
//!     Documents are re-parsed in full on every change notification. Parsing
//!     a file of realistic size is microseconds, and a fresh [`Document`]
//!     per edit means no incremental-update state to corrupt.
//!
//! [`Document`]: iatf_parser::iatf::Document

pub mod server;

pub use server::IatfLanguageServer;
