//! Hover content
//!
//! Hovering a `{@id}` reference or a section's own `{#id}` tag shows the
//! section card: title, ID, line span, word count and summary.

use crate::{open_tag_range, reference_range};
use iatf_parser::iatf::{Document, Section};
use lsp_types::{Position, Range};

/// Markdown hover content plus the range it applies to.
pub fn hover_at(doc: &Document, position: Position) -> Option<(String, Range)> {
    let line = position.line as usize;
    let character = position.character as usize;

    if let Some(reference) = doc.reference_at(line, character) {
        let section = doc.section(&reference.target)?;
        return Some((section_card(section), reference_range(reference)));
    }

    // Hovering the open tag line of a section within the tag's extent.
    let section = doc
        .sections
        .iter()
        .find(|section| section.start == line + 1 && character < section.open_tag_len())?;
    Some((section_card(section), open_tag_range(section)))
}

fn section_card(section: &Section) -> String {
    let mut card = format!(
        "**{}** `{{#{}}}`\n\nlines {}-{} \u{00b7} {} words",
        section.title, section.id, section.start, section.end, section.word_count
    );
    if let Some(summary) = &section.summary {
        card.push_str("\n\n> ");
        card.push_str(summary);
    }
    if let (Some(created), Some(modified)) = (&section.created, &section.modified) {
        card.push_str(&format!("\n\ncreated {} \u{00b7} modified {}", created, modified));
    }
    card
}
