//! Structural validator
//!
//!     One pass, complete picture: the validator folds the parser's collected
//!     structural errors together with its own format, reference and
//!     index-consistency checks, and always returns the full list. Errors are
//!     fatal conditions; warnings are the advisory staleness conditions that
//!     a rebuild corrects (stale hashes, missing index block).
//!
//!     Messages are stable strings asserted by the CLI tests; change them
//!     deliberately.

use crate::iatf::diagnostics::{Diagnostic, IssueKind, Severity};
use crate::iatf::document::Document;
use crate::iatf::hashing;
use crate::iatf::index::{self, IndexBlock};
use std::collections::HashSet;

/// The validator's full output, in discovery order.
#[derive(Debug, Default)]
pub struct ValidationReport {
    pub diagnostics: Vec<Diagnostic>,
}

impl ValidationReport {
    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics
            .iter()
            .filter(|diag| diag.severity == Severity::Error)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics
            .iter()
            .filter(|diag| diag.severity == Severity::Warning)
    }

    pub fn is_valid(&self) -> bool {
        self.errors().next().is_none()
    }

    /// Whether `rebuild` must refuse to touch the file. Only Format and
    /// Structure errors make re-indexing unsafe; reference errors do not
    /// change where sections live.
    pub fn blocks_rebuild(&self) -> bool {
        self.errors()
            .any(|diag| matches!(diag.kind, IssueKind::Format | IssueKind::Structure))
    }
}

/// Run every check against a parsed document.
pub fn validate(doc: &Document) -> ValidationReport {
    let mut report = ValidationReport::default();

    check_format(doc, &mut report);
    report.diagnostics.extend(doc.errors.iter().cloned());
    check_references(doc, &mut report);

    if doc.index_delim().is_some() && doc.content_delim().is_some() {
        let block = index::parse_index(doc);
        check_index_consistency(doc, &block, &mut report);
        check_content_hash(doc, &block, &mut report);
    }
    check_section_hashes(doc, &mut report);

    report
}

fn check_format(doc: &Document, report: &mut ValidationReport) {
    if !doc.has_format_marker {
        report.diagnostics.push(Diagnostic::error(
            IssueKind::Format,
            "Missing :::IATF format declaration on line 1",
            0,
        ));
    }
    match doc.content_delims.len() {
        0 => report.diagnostics.push(Diagnostic::error(
            IssueKind::Format,
            "Missing ===CONTENT=== delimiter",
            doc.lines.len().saturating_sub(1),
        )),
        1 => {}
        _ => {
            for &extra in &doc.content_delims[1..] {
                report.diagnostics.push(Diagnostic::error(
                    IssueKind::Format,
                    "Multiple ===CONTENT=== delimiters",
                    extra,
                ));
            }
        }
    }
    match doc.index_delims.len() {
        // A missing index block is what a first rebuild creates.
        0 => report.diagnostics.push(Diagnostic::warning(
            IssueKind::Format,
            "Missing ===INDEX=== delimiter (run rebuild to add one)",
            0,
        )),
        1 => {}
        _ => {
            for &extra in &doc.index_delims[1..] {
                report.diagnostics.push(Diagnostic::error(
                    IssueKind::Format,
                    "Multiple ===INDEX=== delimiters",
                    extra,
                ));
            }
        }
    }
    if let (Some(index), Some(content)) = (doc.index_delim(), doc.content_delim()) {
        if index > content {
            report.diagnostics.push(Diagnostic::error(
                IssueKind::Format,
                "===INDEX=== must precede ===CONTENT===",
                index,
            ));
        }
    }
}

fn check_references(doc: &Document, report: &mut ValidationReport) {
    for reference in &doc.references {
        if doc.section(&reference.target).is_none() {
            report.diagnostics.push(
                Diagnostic::error(
                    IssueKind::Reference,
                    format!(
                        "Reference {{@{}}} at line {}: target section does not exist",
                        reference.target,
                        reference.line + 1
                    ),
                    reference.line,
                )
                .at(reference.column, reference.len),
            );
        } else if reference.source.as_deref() == Some(reference.target.as_str()) {
            report.diagnostics.push(
                Diagnostic::error(
                    IssueKind::Reference,
                    format!(
                        "Reference {{@{}}} at line {}: self-reference not allowed",
                        reference.target,
                        reference.line + 1
                    ),
                    reference.line,
                )
                .at(reference.column, reference.len),
            );
        }
    }
}

fn check_index_consistency(doc: &Document, block: &IndexBlock, report: &mut ValidationReport) {
    let mut seen: HashSet<&str> = HashSet::new();
    for entry in &block.entries {
        if !seen.insert(&entry.id) {
            report.diagnostics.push(Diagnostic::error(
                IssueKind::Consistency,
                format!("Duplicate INDEX section ID: {}", entry.id),
                entry.line,
            ));
            continue;
        }
        match doc.section(&entry.id) {
            None => report.diagnostics.push(Diagnostic::error(
                IssueKind::Consistency,
                format!("INDEX references missing CONTENT section: {}", entry.id),
                entry.line,
            )),
            Some(section) => {
                if entry.start > entry.end {
                    report.diagnostics.push(Diagnostic::error(
                        IssueKind::Consistency,
                        format!("Invalid line range for INDEX section: {}", entry.id),
                        entry.line,
                    ));
                } else if entry.start != section.start || entry.end != section.end {
                    report.diagnostics.push(Diagnostic::error(
                        IssueKind::Consistency,
                        format!("INDEX line range mismatch for section: {}", entry.id),
                        entry.line,
                    ));
                }
            }
        }
    }
    for section in &doc.sections {
        if block.entry(&section.id).is_none() {
            report.diagnostics.push(Diagnostic::error(
                IssueKind::Consistency,
                format!("CONTENT section missing from INDEX: {}", section.id),
                section.start.saturating_sub(1),
            ));
        }
    }
}

fn check_content_hash(doc: &Document, block: &IndexBlock, report: &mut ValidationReport) {
    if let Some(line) = block.malformed_hash_line {
        report.diagnostics.push(Diagnostic::warning(
            IssueKind::Consistency,
            "Invalid Content-Hash format in INDEX",
            line,
        ));
        return;
    }
    let index_line = doc.index_delim().unwrap_or(0);
    match (&block.hash_algo, &block.content_hash) {
        (Some(algo), Some(_)) if algo != "sha256" => {
            report.diagnostics.push(Diagnostic::warning(
                IssueKind::Consistency,
                format!("Unsupported Content-Hash algorithm: {}", algo),
                index_line,
            ));
        }
        (Some(_), Some(recorded)) => {
            if hashing::content_hash(doc).as_ref() != Some(recorded) {
                report.diagnostics.push(Diagnostic::warning(
                    IssueKind::Consistency,
                    "INDEX Content-Hash does not match CONTENT (index may be stale)",
                    index_line,
                ));
            }
        }
        _ => report.diagnostics.push(Diagnostic::warning(
            IssueKind::Consistency,
            "INDEX missing Content-Hash (run rebuild to add it)",
            index_line,
        )),
    }
}

fn check_section_hashes(doc: &Document, report: &mut ValidationReport) {
    for section in &doc.sections {
        let Some(recorded) = &section.hash else { continue };
        if let Some(current) = hashing::section_hash(doc, section) {
            if *recorded != current {
                report.diagnostics.push(Diagnostic::warning(
                    IssueKind::Consistency,
                    format!("Stale @hash for section: {}", section.id),
                    section.start.saturating_sub(1),
                ));
            }
        }
    }
}
