//! Document symbol tree
//!
//! Level-1 sections become root symbols, level-2 sections nest under their
//! enclosing parent. Deeper sections (already flagged by validation) attach
//! to the nearest valid ancestor so the outline stays complete.

use crate::{open_tag_range, section_range};
use iatf_parser::iatf::{Document, Section};
use lsp_types::{DocumentSymbol, SymbolKind};

/// Build the outline from the section hierarchy.
pub fn document_symbols(doc: &Document) -> Vec<DocumentSymbol> {
    let mut roots: Vec<DocumentSymbol> = Vec::new();
    for section in &doc.sections {
        let symbol = symbol_for(section);
        if section.level <= 1 {
            roots.push(symbol);
            continue;
        }
        match roots.last_mut() {
            Some(parent) => attach(parent, symbol, section.level - 1),
            None => roots.push(symbol),
        }
    }
    roots
}

fn attach(parent: &mut DocumentSymbol, symbol: DocumentSymbol, depth: usize) {
    if depth <= 1 {
        parent.children.get_or_insert_with(Vec::new).push(symbol);
        return;
    }
    match parent.children.as_mut().and_then(|children| children.last_mut()) {
        Some(child) => attach(child, symbol, depth - 1),
        None => parent.children.get_or_insert_with(Vec::new).push(symbol),
    }
}

fn symbol_for(section: &Section) -> DocumentSymbol {
    #[allow(deprecated)]
    DocumentSymbol {
        name: section.title.clone(),
        detail: Some(format!("{{#{}}}", section.id)),
        kind: SymbolKind::NAMESPACE,
        tags: None,
        deprecated: None,
        range: section_range(section),
        selection_range: open_tag_range(section),
        children: None,
    }
}
