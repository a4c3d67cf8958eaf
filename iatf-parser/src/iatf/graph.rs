//! Cross-reference extraction and the section reference graph
//!
//!     `{@id}` tokens are collected in a single pass over the content region.
//!     A fenced code block (``` ... ```) suspends collection so documentation
//!     about the reference syntax does not create edges. Each token records
//!     the innermost section containing it as its source; a token outside any
//!     section still resolves, with no source.
//!
//!     [`ReferenceGraph`] is the adjacency view both directions at once,
//!     feeding the `graph` CLI command and the editor's find-references.

use crate::iatf::document::{Document, Reference};
use crate::iatf::lexing::{self, REFERENCE_TOKEN};
use std::collections::BTreeMap;
use std::fmt::Write as _;

/// Extract every `{@id}` token outside fenced code blocks, in document order.
pub fn collect_references(doc: &Document) -> Vec<Reference> {
    let start = match doc.content_start() {
        Some(start) => start,
        None => return Vec::new(),
    };
    let mut references = Vec::new();
    let mut in_fence = false;
    for (i, line) in doc.lines.iter().enumerate().skip(start) {
        if lexing::is_code_fence(line) {
            in_fence = !in_fence;
            continue;
        }
        if in_fence {
            continue;
        }
        for token in REFERENCE_TOKEN.find_iter(line) {
            let id = &line[token.start() + 2..token.end() - 1];
            references.push(Reference {
                source: doc.section_at_line(i).map(|section| section.id.clone()),
                target: id.to_string(),
                line: i,
                column: token.start(),
                len: token.end() - token.start(),
            });
        }
    }
    references
}

/// Adjacency view of the document's cross-references.
///
/// Edges are deduplicated per (source, target) pair but keep first-seen order.
#[derive(Debug, Default)]
pub struct ReferenceGraph {
    outgoing: BTreeMap<String, Vec<String>>,
    incoming: BTreeMap<String, Vec<String>>,
}

impl ReferenceGraph {
    pub fn build(doc: &Document) -> Self {
        let mut graph = ReferenceGraph::default();
        for reference in &doc.references {
            let source = match &reference.source {
                Some(source) => source.clone(),
                None => continue,
            };
            push_unique(
                graph.outgoing.entry(source.clone()).or_default(),
                &reference.target,
            );
            push_unique(
                graph.incoming.entry(reference.target.clone()).or_default(),
                &source,
            );
        }
        graph
    }

    /// Targets the given section references, in first-seen order.
    pub fn outgoing(&self, id: &str) -> &[String] {
        self.outgoing.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Sections that reference the given section, in first-seen order.
    pub fn incoming(&self, id: &str) -> &[String] {
        self.incoming.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Render the graph report: a `@graph:` header line naming the file,
    /// then one line per section in document order. With edges in the
    /// selected direction the line is `id -> t1, t2` (or `id <- s1, s2`),
    /// targets alphabetically sorted; a section with no edges renders as a
    /// bare `id` line. Duplicate IDs render once.
    pub fn render(&self, doc: &Document, label: &str, show_incoming: bool) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "@graph: {}", label);
        let mut seen: Vec<&str> = Vec::new();
        for section in &doc.sections {
            if seen.contains(&section.id.as_str()) {
                continue;
            }
            seen.push(&section.id);
            let edges = if show_incoming {
                self.incoming(&section.id)
            } else {
                self.outgoing(&section.id)
            };
            if edges.is_empty() {
                let _ = writeln!(out, "{}", section.id);
            } else {
                let mut edges: Vec<&str> = edges.iter().map(String::as_str).collect();
                edges.sort_unstable();
                let arrow = if show_incoming { "<-" } else { "->" };
                let _ = writeln!(out, "{} {} {}", section.id, arrow, edges.join(", "));
            }
        }
        out
    }
}

fn push_unique(edges: &mut Vec<String>, id: &str) {
    if !edges.iter().any(|existing| existing == id) {
        edges.push(id.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::iatf::parsing::parse;

    fn doc(content: &str) -> Document {
        parse(&format!(
            ":::IATF\n===INDEX===\n===CONTENT===\n{}",
            content
        ))
    }

    #[test]
    fn fenced_code_suppresses_references() {
        let doc = doc("{#a}\nsee {@b}\n```\nignored {@c}\n```\nafter {@d}\n{/a}");
        let targets: Vec<_> = doc.references.iter().map(|r| r.target.as_str()).collect();
        assert_eq!(targets, vec!["b", "d"]);
    }

    #[test]
    fn multiple_references_on_one_line() {
        let doc = doc("{#a}\n{@x} and {@y}\n{/a}");
        assert_eq!(doc.references.len(), 2);
        assert_eq!(doc.references[0].column, 0);
        assert_eq!(doc.references[0].len, 4);
        assert!(doc.references[1].column > doc.references[0].column);
    }

    #[test]
    fn graph_tracks_both_directions() {
        let doc = doc("{#a}\n{@b} {@c}\n{/a}\n{#b}\n{@c}\n{/b}\n{#c}\ndone\n{/c}");
        let graph = ReferenceGraph::build(&doc);
        assert_eq!(graph.outgoing("a"), ["b", "c"]);
        assert_eq!(graph.incoming("c"), ["a", "b"]);
        assert!(graph.outgoing("c").is_empty());
    }

    #[test]
    fn repeated_edges_dedupe() {
        let doc = doc("{#a}\n{@b} again {@b}\n{/a}\n{#b}\nx\n{/b}");
        let graph = ReferenceGraph::build(&doc);
        assert_eq!(graph.outgoing("a"), ["b"]);
        assert_eq!(graph.incoming("b"), ["a"]);
    }

    #[test]
    fn render_selects_direction_and_sorts_targets() {
        let doc = doc("{#a}\n{@c} then {@b}\n{/a}\n{#b}\n{@a}\n{/b}\n{#c}\nquiet\n{/c}");
        let graph = ReferenceGraph::build(&doc);

        let outgoing = graph.render(&doc, "notes.iatf", false);
        assert_eq!(outgoing, "@graph: notes.iatf\na -> b, c\nb -> a\nc\n");

        let incoming = graph.render(&doc, "notes.iatf", true);
        assert_eq!(incoming, "@graph: notes.iatf\na <- b\nb <- a\nc <- a\n");
    }
}
