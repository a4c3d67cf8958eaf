//! Parsing module for the IATF format
//!
//!     The pipeline from source text to [`Document`] is an immutable two-pass
//!     build:
//!
//!         1. Scanning: the raw text is split into EOL-normalized lines and
//!            each line is classified into a flat [`LineEvent`] list. See the
//!            [lexing](crate::iatf::lexing) module.
//!         2. Folding: the event list is folded into a section tree via an
//!            explicit builder stack. All positional state (header windows,
//!            summary continuations, nesting depth) lives in the stack frames.
//!
//!     Parsing never aborts on a single structural problem. Unclosed sections,
//!     closes without opens, mismatched closes, duplicate IDs, orphan content
//!     and excessive nesting are all collected into `Document::errors` so that
//!     one `validate` pass can report the complete picture. A mismatched close
//!     deliberately does not pop the stack: the expected close is still
//!     pending, which keeps later parsing resynchronized.
//!
//! Header windows
//!
//!     Section metadata (`@summary:`, `@created:`, `@modified:`, `@hash:`) is
//!     only recognized while the innermost open section is still "in header",
//!     i.e. before its first non-metadata, non-blank line. Blank lines do not
//!     end the window, but they do terminate an active `@summary`
//!     continuation. The first markdown-style heading inside a section sets
//!     its title and ends the window.

use crate::iatf::diagnostics::{Diagnostic, IssueKind};
use crate::iatf::document::{Document, Section, MAX_NESTING_DEPTH};
use crate::iatf::graph;
use crate::iatf::lexing::{self, LineEvent};
use std::collections::HashMap;

/// Per-open-section state used while folding.
struct Frame {
    /// Index into the sections vec being built.
    section: usize,
    in_header: bool,
    summary_continuation: bool,
    title_set: bool,
}

/// Parse raw text into a `Document`, collecting every structural problem
/// into `Document::errors` instead of failing.
pub fn parse(raw: &str) -> Document {
    let (lines, eol) = lexing::split_lines(raw);
    let events = lexing::scan(&lines);

    let mut doc = Document {
        eol,
        ..Document::default()
    };

    for (i, event) in events.iter().enumerate() {
        match event {
            LineEvent::IndexDelimiter => doc.index_delims.push(i),
            LineEvent::ContentDelimiter => doc.content_delims.push(i),
            _ => {}
        }
    }

    if let Some(LineEvent::FormatMarker { version }) = events.first() {
        doc.has_format_marker = true;
        doc.format_version = version.clone();
    }

    let preamble_end = doc
        .index_delim()
        .or_else(|| doc.content_delim())
        .unwrap_or(lines.len());
    for event in events.iter().take(preamble_end).skip(1) {
        if let LineEvent::Metadata { key, value } = event {
            doc.header_meta.push((key.clone(), value.clone()));
        }
    }

    let mut sections: Vec<Section> = Vec::new();
    let mut errors: Vec<Diagnostic> = Vec::new();

    if let Some(content_start) = doc.content_delim().map(|delim| delim + 1) {
        fold_content(
            &lines,
            &events,
            content_start,
            &mut sections,
            &mut errors,
        );
    }

    doc.lines = lines;
    doc.sections = sections;
    doc.errors = errors;
    doc.references = graph::collect_references(&doc);
    doc
}

fn fold_content(
    lines: &[String],
    events: &[LineEvent],
    content_start: usize,
    sections: &mut Vec<Section>,
    errors: &mut Vec<Diagnostic>,
) {
    let mut stack: Vec<Frame> = Vec::new();
    let mut first_definition: HashMap<String, usize> = HashMap::new();

    for i in content_start..events.len() {
        match &events[i] {
            LineEvent::Open { id } => {
                // Entering a child ends the parent's header window.
                if let Some(frame) = stack.last_mut() {
                    frame.in_header = false;
                    frame.summary_continuation = false;
                }
                let level = stack.len() + 1;
                if let Some(&first) = first_definition.get(id) {
                    errors.push(
                        Diagnostic::error(
                            IssueKind::Structure,
                            format!(
                                "Duplicate section ID '{}' (first defined on line {})",
                                id,
                                first + 1
                            ),
                            i,
                        )
                        .at(0, id.len() + 3),
                    );
                } else {
                    first_definition.insert(id.clone(), i);
                }
                if level > MAX_NESTING_DEPTH {
                    errors.push(
                        Diagnostic::error(
                            IssueKind::Structure,
                            format!(
                                "Section nesting exceeds maximum depth of {}: {}",
                                MAX_NESTING_DEPTH, id
                            ),
                            i,
                        )
                        .at(0, id.len() + 3),
                    );
                }
                sections.push(Section::new(id.clone(), i + 1, level));
                stack.push(Frame {
                    section: sections.len() - 1,
                    in_header: true,
                    summary_continuation: false,
                    title_set: false,
                });
            }
            LineEvent::Close { id } => {
                let top_matches = stack
                    .last()
                    .map(|frame| sections[frame.section].id == *id);
                match top_matches {
                    None => errors.push(
                        Diagnostic::error(
                            IssueKind::Structure,
                            format!("Closing tag {{/{}}} without matching opening tag", id),
                            i,
                        )
                        .at(0, id.len() + 3),
                    ),
                    Some(false) => {
                        // Do not pop: the expected close is still pending, and
                        // leaving the stack alone resynchronizes later parsing.
                        let expected = stack
                            .last()
                            .map(|frame| sections[frame.section].id.clone())
                            .unwrap_or_default();
                        errors.push(
                            Diagnostic::error(
                                IssueKind::Structure,
                                format!(
                                    "Closing tag {{/{}}} does not match expected {{/{}}}",
                                    id, expected
                                ),
                                i,
                            )
                            .at(0, id.len() + 3),
                        );
                    }
                    Some(true) => {
                        if let Some(frame) = stack.pop() {
                            sections[frame.section].end = i + 1;
                        }
                    }
                }
            }
            LineEvent::Metadata { key, value } => {
                if let Some(frame) = stack.last_mut() {
                    if frame.in_header {
                        frame.summary_continuation = false;
                        let section = &mut sections[frame.section];
                        match key.as_str() {
                            "summary" => {
                                section.summary = Some(value.clone());
                                frame.summary_continuation = true;
                            }
                            "created" => section.created = non_empty(value),
                            "modified" => section.modified = non_empty(value),
                            "hash" => section.hash = non_empty(value),
                            // Unknown metadata keys are tolerated in the header.
                            _ => {}
                        }
                    } else {
                        // A metadata-looking line in the body is plain text.
                        sections[frame.section].word_count +=
                            lines[i].split_whitespace().count();
                    }
                } else {
                    errors.push(orphan(i));
                }
            }
            LineEvent::Heading { text } => {
                if let Some(frame) = stack.last_mut() {
                    frame.in_header = false;
                    frame.summary_continuation = false;
                    let section = &mut sections[frame.section];
                    if !frame.title_set {
                        if !text.is_empty() {
                            section.title = text.clone();
                        }
                        frame.title_set = true;
                    } else {
                        section.word_count += text.split_whitespace().count();
                    }
                } else {
                    errors.push(orphan(i));
                }
            }
            LineEvent::Blank => {
                if let Some(frame) = stack.last_mut() {
                    if frame.in_header {
                        frame.summary_continuation = false;
                    }
                }
            }
            LineEvent::Text => {
                if let Some(frame) = stack.last_mut() {
                    let line = &lines[i];
                    if frame.in_header {
                        let continues = frame.summary_continuation
                            && (line.starts_with(' ') || line.starts_with('\t'));
                        if continues {
                            if let Some(summary) = sections[frame.section].summary.as_mut() {
                                summary.push(' ');
                                summary.push_str(line.trim());
                            }
                        } else {
                            frame.in_header = false;
                            frame.summary_continuation = false;
                            sections[frame.section].word_count +=
                                line.split_whitespace().count();
                        }
                    } else {
                        sections[frame.section].word_count +=
                            line.split_whitespace().count();
                    }
                } else {
                    errors.push(orphan(i));
                }
            }
            // A stray format marker or extra delimiter inside the content
            // region is reported by the validator, not here.
            LineEvent::FormatMarker { .. }
            | LineEvent::IndexDelimiter
            | LineEvent::ContentDelimiter => {}
        }
    }

    while let Some(frame) = stack.pop() {
        let end = lines.len();
        let section = &mut sections[frame.section];
        errors.push(
            Diagnostic::error(
                IssueKind::Structure,
                format!("Unclosed section: {}", section.id),
                section.start.saturating_sub(1),
            )
            .at(0, section.open_tag_len()),
        );
        // Clamp so ranges stay usable for tooling.
        section.end = end;
    }
}

fn orphan(line: usize) -> Diagnostic {
    Diagnostic::error(
        IssueKind::Structure,
        format!("Content outside any section at line {}", line + 1),
        line,
    )
}

fn non_empty(value: &str) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::iatf::diagnostics::Severity;

    fn doc(content: &str) -> Document {
        parse(&format!(
            ":::IATF\n===INDEX===\n===CONTENT===\n{}",
            content
        ))
    }

    #[test]
    fn parses_a_simple_section() {
        let doc = doc("{#a}\n@summary: short\n# A\nhello\n{/a}");
        assert!(doc.errors.is_empty(), "unexpected errors: {:?}", doc.errors);
        assert_eq!(doc.sections.len(), 1);
        let section = &doc.sections[0];
        assert_eq!(section.id, "a");
        assert_eq!(section.title, "A");
        assert_eq!(section.summary.as_deref(), Some("short"));
        assert_eq!(section.level, 1);
        assert_eq!(section.start, 4);
        assert_eq!(section.end, 8);
        assert_eq!(section.word_count, 1);
    }

    #[test]
    fn summary_continuation_folds_indented_lines() {
        let doc = doc("{#a}\n@summary: first part\n  second part\nbody\n{/a}");
        assert_eq!(
            doc.sections[0].summary.as_deref(),
            Some("first part second part")
        );
        // The continuation line is header metadata, not body words.
        assert_eq!(doc.sections[0].word_count, 1);
    }

    #[test]
    fn blank_line_ends_summary_continuation_but_not_header() {
        let doc = doc("{#a}\n@summary: first\n\n@created: 2024-01-01\n  indented body\n{/a}");
        assert_eq!(doc.sections[0].summary.as_deref(), Some("first"));
        assert_eq!(doc.sections[0].created.as_deref(), Some("2024-01-01"));
        // The indented line no longer continues the summary.
        assert_eq!(doc.sections[0].word_count, 2);
    }

    #[test]
    fn nested_sections_attribute_words_to_the_innermost() {
        let doc = doc("{#outer}\nparent words here\n{#inner}\nchild words\n{/inner}\n{/outer}");
        assert!(doc.errors.is_empty());
        let outer = doc.section("outer").expect("outer parsed");
        let inner = doc.section("inner").expect("inner parsed");
        assert_eq!(outer.level, 1);
        assert_eq!(inner.level, 2);
        assert_eq!(outer.word_count, 3);
        assert_eq!(inner.word_count, 2);
        assert!(outer.start < inner.start && inner.end < outer.end);
    }

    #[test]
    fn mismatched_close_does_not_pop() {
        let doc = doc("{#a}\n{#b}\n{/a}\n{/b}\n{/a}");
        // {/a} against open b: mismatch, b stays open; {/b} then closes b and
        // the final {/a} closes a. One mismatch error, no unclosed errors.
        let messages: Vec<_> = doc.errors.iter().map(|e| e.message.as_str()).collect();
        assert_eq!(
            messages,
            vec!["Closing tag {/a} does not match expected {/b}"]
        );
        assert_eq!(doc.section("a").map(|s| s.end), Some(8));
        assert_eq!(doc.section("b").map(|s| s.end), Some(7));
    }

    #[test]
    fn close_without_open_is_reported() {
        let doc = doc("{/ghost}");
        assert_eq!(doc.errors.len(), 1);
        assert_eq!(
            doc.errors[0].message,
            "Closing tag {/ghost} without matching opening tag"
        );
    }

    #[test]
    fn unclosed_sections_are_reported_and_clamped() {
        let doc = doc("{#a}\ntext");
        assert!(doc
            .errors
            .iter()
            .any(|e| e.message == "Unclosed section: a" && e.severity == Severity::Error));
        assert_eq!(doc.sections[0].end, doc.lines.len());
    }

    #[test]
    fn duplicate_ids_name_the_first_definition() {
        let doc = doc("{#x}\n{#x}\n{/x}\n{/x}");
        let dup: Vec<_> = doc
            .errors
            .iter()
            .filter(|e| e.message.starts_with("Duplicate section ID"))
            .collect();
        assert_eq!(dup.len(), 1);
        assert_eq!(
            dup[0].message,
            "Duplicate section ID 'x' (first defined on line 4)"
        );
    }

    #[test]
    fn third_nesting_level_errors_but_still_parses() {
        let doc = doc("{#a}\n{#b}\n{#c}\ndeep\n{/c}\n{/b}\n{/a}");
        assert!(doc
            .errors
            .iter()
            .any(|e| e.message.contains("maximum depth") && e.message.contains('c')));
        // The deep section and its siblings are still fully parsed.
        assert_eq!(doc.sections.len(), 3);
        assert_eq!(doc.section("c").map(|s| s.level), Some(3));
        assert_eq!(doc.section("c").map(|s| s.word_count), Some(1));
    }

    #[test]
    fn orphan_content_is_flagged() {
        let doc = doc("stray text\n{#a}\nok\n{/a}");
        assert!(doc
            .errors
            .iter()
            .any(|e| e.message == "Content outside any section at line 4"));
    }

    #[test]
    fn header_metadata_in_body_is_plain_text() {
        let doc = doc("{#a}\nbody starts\n@summary: not metadata anymore\n{/a}");
        assert_eq!(doc.sections[0].summary, None);
        assert_eq!(doc.sections[0].word_count, 6);
    }

    #[test]
    fn file_header_metadata_is_collected() {
        let doc = parse(":::IATF/1.0\n@title: Demo\n@author: someone\n===INDEX===\n===CONTENT===\n{#a}\n{/a}");
        assert!(doc.has_format_marker);
        assert_eq!(doc.format_version.as_deref(), Some("1.0"));
        assert_eq!(
            doc.header_meta,
            vec![
                ("title".to_string(), "Demo".to_string()),
                ("author".to_string(), "someone".to_string()),
            ]
        );
    }

    #[test]
    fn references_are_collected_with_sources() {
        let doc = doc("{#a}\nsee {@b}\n{/a}\n{#b}\nback to {@a}\n{/b}");
        assert_eq!(doc.references.len(), 2);
        assert_eq!(doc.references[0].target, "b");
        assert_eq!(doc.references[0].source.as_deref(), Some("a"));
        assert_eq!(doc.references[1].target, "a");
        assert_eq!(doc.references[1].source.as_deref(), Some("b"));
    }

    #[test]
    fn missing_content_delimiter_parses_no_sections() {
        let doc = parse(":::IATF\n===INDEX===\n{#a}\n{/a}");
        assert!(doc.sections.is_empty());
        assert_eq!(doc.content_delim(), None);
    }
}
