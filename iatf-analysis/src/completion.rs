//! ID completion inside partially typed tags
//!
//! Triggered while the cursor sits after a `{@`, `{#` or `{/` that has no
//! closing brace yet. All three suggest section IDs filtered by the typed
//! prefix; reference completion additionally drops the enclosing section,
//! since a self-reference would only earn a validation error.

use iatf_parser::iatf::Document;
use lsp_types::{CompletionItemKind, Position};

/// A semantic completion candidate, translated into protocol items by the
/// server crate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionCandidate {
    pub label: String,
    pub detail: Option<String>,
    pub kind: CompletionItemKind,
    /// Text to insert, completing the token through its closing brace.
    pub insert_text: String,
}

/// Which tag form the cursor is inside.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Trigger {
    Reference,
    Open,
    Close,
}

/// Completion candidates at the given cursor position.
pub fn completion_items(doc: &Document, position: Position) -> Vec<CompletionCandidate> {
    let line = match doc.lines.get(position.line as usize) {
        Some(line) => line,
        None => return Vec::new(),
    };
    let Some((trigger, partial)) = trigger_at(line, position.character as usize) else {
        return Vec::new();
    };

    let enclosing = doc
        .section_at_line(position.line as usize)
        .map(|section| section.id.as_str());

    let mut seen: Vec<&str> = Vec::new();
    let mut items = Vec::new();
    for section in &doc.sections {
        if seen.contains(&section.id.as_str()) {
            continue;
        }
        seen.push(&section.id);
        if !section.id.starts_with(&partial) {
            continue;
        }
        if trigger == Trigger::Reference && Some(section.id.as_str()) == enclosing {
            continue;
        }
        let kind = match trigger {
            Trigger::Reference => CompletionItemKind::REFERENCE,
            Trigger::Open | Trigger::Close => CompletionItemKind::STRUCT,
        };
        items.push(CompletionCandidate {
            label: section.id.clone(),
            detail: Some(section.title.clone()),
            kind,
            insert_text: format!("{}}}", section.id),
        });
    }
    items
}

/// Find an unclosed `{@`, `{#` or `{/` ending at the cursor and return the
/// partial ID typed so far.
fn trigger_at(line: &str, character: usize) -> Option<(Trigger, String)> {
    let upto: String = line.chars().take(character).collect();
    let open = upto.rfind('{')?;
    let rest = &upto[open + 1..];
    if rest.contains('}') {
        return None;
    }
    let mut chars = rest.chars();
    let trigger = match chars.next() {
        Some('@') => Trigger::Reference,
        Some('#') => Trigger::Open,
        Some('/') => Trigger::Close,
        _ => return None,
    };
    let partial: String = chars.collect();
    if partial
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    {
        Some((trigger, partial))
    } else {
        None
    }
}
