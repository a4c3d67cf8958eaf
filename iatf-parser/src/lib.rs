//! # iatf-parser
//!
//! Parser and index-synchronization engine for the IATF format.
//!
//! IATF is a plain-text, section-addressable document format: a machine-generated
//! INDEX block followed by a human-edited CONTENT block made of named, nestable
//! `{#id}` / `{/id}` sections. Automated readers load the small index instead of
//! the whole file; this crate keeps the two byte-consistent.
//!
//! The crate is a side-effect-free library shared by two very different front
//! ends (the `iatf` command-line tool and the `iatf-lsp` editor server), so the
//! core pipeline operates purely on its inputs:
//!
//!     raw text -> parse -> Document -> hash -> synchronize -> validate -> queries
//!
//! File-level orchestration (read, rebuild, write) lives in [`iatf::engine`];
//! everything below it never touches the filesystem.

#![allow(rustdoc::invalid_html_tags)]

pub mod iatf;
