//! End-to-end rebuild behavior over whole documents
//!
//! These tests exercise the parse -> synchronize -> re-parse loop the CLI
//! performs, and pin the two invariants everything else leans on: the content
//! region is byte-untouched by a rebuild, and a second rebuild of the same
//! bytes is a no-op.

use iatf_parser::iatf::index::{synchronize, Clock};
use iatf_parser::iatf::validate::validate;
use iatf_parser::iatf::{parse, query};

struct FixedClock;

impl Clock for FixedClock {
    fn today(&self) -> String {
        "2026-01-02".to_string()
    }

    fn now(&self) -> String {
        "2026-01-02T03:04:05Z".to_string()
    }
}

fn rebuild(raw: &str) -> String {
    let doc = parse(raw);
    let result = synchronize(&doc, &FixedClock).expect("synchronize");
    result.lines.join(doc.eol.as_str())
}

const SAMPLE: &str = "\
:::IATF
@title: Service Notes
===INDEX===
===CONTENT===
{#intro}
@summary: what this file is
  and who maintains it
# Introduction
Start here, then read {@setup}.
{/intro}
{#setup}
# Setup
Install things.
{#setup-linux}
## Linux
apt install things
{/setup-linux}
{/setup}
";

#[test]
fn rebuild_is_byte_idempotent() {
    let once = rebuild(SAMPLE);
    let twice = rebuild(&once);
    assert_eq!(once, twice);
}

#[test]
fn content_region_is_byte_untouched() {
    let rebuilt = rebuild(SAMPLE);
    let original_content = SAMPLE
        .split_once("===CONTENT===")
        .expect("delimiter in input")
        .1;
    let rebuilt_content = rebuilt
        .split_once("===CONTENT===")
        .expect("delimiter in output")
        .1;
    assert_eq!(original_content, rebuilt_content);
}

#[test]
fn index_entries_point_at_real_tags() {
    let rebuilt = rebuild(SAMPLE);
    let doc = parse(&rebuilt);
    let block = iatf_parser::iatf::index::parse_index(&doc);
    assert_eq!(block.entries.len(), 3);
    for entry in &block.entries {
        assert_eq!(
            doc.lines[entry.start - 1],
            format!("{{#{}}}", entry.id),
            "open tag for {}",
            entry.id
        );
        assert_eq!(doc.lines[entry.end - 1], format!("{{/{}}}", entry.id));
    }
    let child = block.entry("setup-linux").expect("nested entry");
    assert_eq!(child.level, 2);
}

#[test]
fn validate_is_clean_after_rebuild() {
    let rebuilt = rebuild(SAMPLE);
    let report = validate(&parse(&rebuilt));
    assert!(report.is_valid(), "errors: {:?}", report.diagnostics);
    assert_eq!(report.warnings().count(), 0);
}

#[test]
fn summary_continuation_lands_in_the_entry() {
    let rebuilt = rebuild(SAMPLE);
    assert!(rebuilt.contains("> what this file is and who maintains it"));
}

#[test]
fn crlf_document_round_trips() {
    let crlf = SAMPLE.replace('\n', "\r\n");
    let once = rebuild(&crlf);
    assert!(once.contains("===INDEX===\r\n"));
    assert_eq!(once, rebuild(&once));
    let original_content = crlf.split_once("===CONTENT===").expect("input").1;
    let rebuilt_content = once.split_once("===CONTENT===").expect("output").1;
    assert_eq!(original_content, rebuilt_content);
}

#[test]
fn large_documents_converge() {
    // Enough sections that entry line numbers cross the 100 and 1000
    // boundaries, changing printed widths between rounds.
    let mut content = String::new();
    for i in 0..150 {
        content.push_str(&format!("{{#sec{i}}}\n# Section {i}\nbody text here\n{{/sec{i}}}\n"));
    }
    let raw = format!(":::IATF\n===INDEX===\n===CONTENT===\n{content}");
    let once = rebuild(&raw);
    assert_eq!(once, rebuild(&once));

    let doc = parse(&once);
    let block = iatf_parser::iatf::index::parse_index(&doc);
    assert_eq!(block.entries.len(), 150);
    for entry in &block.entries {
        assert_eq!(doc.lines[entry.start - 1], format!("{{#{}}}", entry.id));
    }
}

#[test]
fn read_and_graph_queries_survive_a_rebuild() {
    let doc = parse(&rebuild(SAMPLE));

    let intro = query::read_section(&doc, "intro").expect("intro span");
    assert!(intro.starts_with("{#intro}"));
    assert!(intro.ends_with("{/intro}"));

    let by_title = query::read_by_title(&doc, "introduction").expect("title match");
    assert_eq!(by_title, intro);

    let graph = query::graph_text(&doc, "notes.iatf", false);
    assert!(graph.contains("intro -> setup"));
}
