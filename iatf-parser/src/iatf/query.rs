//! Read-only queries over a parsed document
//!
//! These back the CLI's `index`, `read` and `graph` commands and the editor
//! server's hover text. Everything returns owned strings joined with the
//! document's own line-ending style.

use crate::iatf::document::Document;
use crate::iatf::error::{IatfError, IatfResult};
use crate::iatf::graph::ReferenceGraph;

/// The verbatim index block, `===INDEX===` line included, up to but not
/// including `===CONTENT===`.
pub fn index_text(doc: &Document) -> IatfResult<String> {
    let (start, end) = match (doc.index_delim(), doc.content_delim()) {
        (Some(index), Some(content)) if index < content => (index, content),
        _ => {
            return Err(IatfError::Format(
                "no index block present (run rebuild to create one)".to_string(),
            ))
        }
    };
    Ok(doc.lines[start..end].join(doc.eol.as_str()))
}

/// A document with no content region has no sections to look up; surfacing
/// the format problem keeps a missing section distinguishable from a file
/// that is not IATF at all.
fn require_content(doc: &Document) -> IatfResult<()> {
    if !doc.has_format_marker {
        return Err(IatfError::Format(
            "missing :::IATF format declaration".to_string(),
        ));
    }
    if doc.content_delim().is_none() {
        return Err(IatfError::Format(
            "missing ===CONTENT=== delimiter".to_string(),
        ));
    }
    Ok(())
}

/// Exact line span of a section, open and close tags included.
pub fn read_section(doc: &Document, id: &str) -> IatfResult<String> {
    require_content(doc)?;
    let section = doc
        .section(id)
        .ok_or_else(|| IatfError::NotFound(id.to_string()))?;
    if section.start == 0 || section.end < section.start || section.end > doc.lines.len() {
        return Err(IatfError::NotFound(id.to_string()));
    }
    Ok(doc.lines[section.start - 1..section.end].join(doc.eol.as_str()))
}

/// Case-insensitive substring match against titles; the first match in
/// document order wins.
pub fn read_by_title(doc: &Document, query: &str) -> IatfResult<String> {
    require_content(doc)?;
    let needle = query.to_lowercase();
    let section = doc
        .sections
        .iter()
        .find(|section| section.title.to_lowercase().contains(&needle))
        .ok_or_else(|| IatfError::NotFound(query.to_string()))?;
    let id = section.id.clone();
    read_section(doc, &id)
}

/// The reference-graph report for the CLI.
pub fn graph_text(doc: &Document, label: &str, show_incoming: bool) -> String {
    ReferenceGraph::build(doc).render(doc, label, show_incoming)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::iatf::parsing::parse;

    fn doc() -> Document {
        parse(
            ":::IATF\n===INDEX===\n# Alpha {#a | lines:4-7 | words:2}\n===CONTENT===\n{#a}\n# Alpha\nhello there\n{/a}\n{#b}\n# Beta Notes\nsee {@a}\n{/b}",
        )
    }

    #[test]
    fn index_text_is_verbatim() {
        let text = index_text(&doc()).expect("index present");
        assert_eq!(text, "===INDEX===\n# Alpha {#a | lines:4-7 | words:2}");
    }

    #[test]
    fn index_text_requires_the_block() {
        let doc = parse(":::IATF\n===CONTENT===\n{#a}\n{/a}");
        assert!(matches!(index_text(&doc), Err(IatfError::Format(_))));
    }

    #[test]
    fn read_section_returns_the_exact_span() {
        let text = read_section(&doc(), "a").expect("section a");
        assert_eq!(text, "{#a}\n# Alpha\nhello there\n{/a}");
    }

    #[test]
    fn read_section_unknown_id_is_not_found() {
        let err = read_section(&doc(), "ghost").expect_err("missing");
        assert!(matches!(err, IatfError::NotFound(_)));
        assert_eq!(err.to_string(), "section not found: ghost");
    }

    #[test]
    fn read_requires_a_content_region() {
        let doc = parse(":::IATF\n===INDEX===\nno content delimiter here");
        assert!(matches!(read_section(&doc, "a"), Err(IatfError::Format(_))));
        assert!(matches!(read_by_title(&doc, "a"), Err(IatfError::Format(_))));

        let unmarked = parse("===CONTENT===\n{#a}\nx\n{/a}");
        assert!(matches!(read_section(&unmarked, "a"), Err(IatfError::Format(_))));
    }

    #[test]
    fn read_by_title_matches_substring_case_insensitively() {
        let text = read_by_title(&doc(), "beta").expect("title match");
        assert!(text.starts_with("{#b}"));

        // First match in document order wins for an ambiguous query.
        let text = read_by_title(&doc(), "A").expect("title match");
        assert!(text.starts_with("{#a}"));
    }

    #[test]
    fn read_by_title_takes_the_first_of_two_substring_matches() {
        let doc = parse(
            ":::IATF\n===INDEX===\n===CONTENT===\n{#guide}\n# Setup Guide\nx\n{/guide}\n{#setup}\n# Setup\ny\n{/setup}",
        );
        let text = read_by_title(&doc, "setup").expect("title match");
        assert!(text.starts_with("{#guide}"));
    }

    #[test]
    fn graph_text_labels_the_file() {
        let text = graph_text(&doc(), "demo.iatf", false);
        assert!(text.starts_with("@graph: demo.iatf\n"));
        assert!(text.contains("b -> a"));
    }
}
