//! Editor-facing analysis over parsed IATF documents
//!
//! Everything here is a pure function from a [`Document`] plus a cursor
//! position to protocol-shaped data (`lsp_types` positions, ranges and
//! symbol kinds). The server crate owns the transport and the document
//! store; this crate owns what the answers are.
//!
//! [`Document`]: iatf_parser::iatf::Document

pub mod completion;
pub mod hover;
pub mod navigation;
pub mod symbols;

use iatf_parser::iatf::{Reference, Section};
use lsp_types::{Position, Range};

/// Range of a `{@id}` token.
pub fn reference_range(reference: &Reference) -> Range {
    span(reference.line, reference.column, reference.len)
}

/// Range of a section's `{#id}` open tag.
pub fn open_tag_range(section: &Section) -> Range {
    span(section.start.saturating_sub(1), 0, section.open_tag_len())
}

/// Range covering a section's full line span, close tag included.
pub fn section_range(section: &Section) -> Range {
    Range {
        start: Position {
            line: section.start.saturating_sub(1) as u32,
            character: 0,
        },
        end: Position {
            line: section.end.saturating_sub(1) as u32,
            character: (section.id.len() + 3) as u32,
        },
    }
}

fn span(line: usize, column: usize, len: usize) -> Range {
    Range {
        start: Position {
            line: line as u32,
            character: column as u32,
        },
        end: Position {
            line: line as u32,
            character: (column + len) as u32,
        },
    }
}
