//! Go-to-definition and find-references
//!
//! Definition goes from a `{@id}` token to the section's open tag. Find-
//! references works from either end: on a reference it collects every other
//! reference to the same target, on an open or close tag it collects every
//! reference to that section. The declaration itself is included when the
//! caller asks, matching the protocol's `include_declaration` flag.

use crate::{open_tag_range, reference_range};
use iatf_parser::iatf::Document;
use lsp_types::{Position, Range};

/// The section ID a navigation request at this position is about, if any.
pub fn target_id_at(doc: &Document, position: Position) -> Option<String> {
    let line = position.line as usize;
    let character = position.character as usize;

    if let Some(reference) = doc.reference_at(line, character) {
        return Some(reference.target.clone());
    }
    // On a section's own open or close tag line.
    doc.sections
        .iter()
        .find(|section| {
            (section.start == line + 1 && character < section.open_tag_len())
                || (section.end == line + 1 && character < section.id.len() + 3)
        })
        .map(|section| section.id.clone())
}

/// Range of the open tag defining the section a position points at.
pub fn definition(doc: &Document, position: Position) -> Option<Range> {
    let id = target_id_at(doc, position)?;
    doc.section(&id).map(open_tag_range)
}

/// Every `{@id}` token referencing the section at the position, in document
/// order, optionally preceded by the open tag itself.
pub fn references(doc: &Document, position: Position, include_declaration: bool) -> Vec<Range> {
    let Some(id) = target_id_at(doc, position) else {
        return Vec::new();
    };
    let mut ranges = Vec::new();
    if include_declaration {
        if let Some(section) = doc.section(&id) {
            ranges.push(open_tag_range(section));
        }
    }
    ranges.extend(
        doc.references
            .iter()
            .filter(|reference| reference.target == id)
            .map(reference_range),
    );
    ranges
}
