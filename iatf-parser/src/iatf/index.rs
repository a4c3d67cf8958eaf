//! Index block parsing, rendering and synchronization
//!
//!     The index block between `===INDEX===` and `===CONTENT===` is machine
//!     territory: three HTML-comment header lines (auto-generated notice,
//!     generation timestamp, whole-content hash), a blank line, then one entry
//!     per section in document order. `synchronize` regenerates the whole
//!     block from the parsed content region and splices it back in. The
//!     content region itself is carried over by slicing the original line
//!     vector from the `===CONTENT===` delimiter onward, so it is
//!     byte-untouched by construction.
//!
//! Line-number convergence
//!
//!     Entry line ranges refer to positions in the file being written, but
//!     regenerating the index moves the content region. Rather than patching
//!     ranges after the fact, rendering is repeated with the delta implied by
//!     the previous round's block height until the delta stops moving. The
//!     block height does not depend on the numbers printed, so this settles
//!     in at most two rounds; the bound exists to turn any future layout bug
//!     into a hard error instead of an infinite loop.
//!
//! Metadata reuse
//!
//!     Per-section `Created`/`Modified`/`Hash` are copied verbatim from the
//!     prior index while the section's recomputed hash is unchanged, and
//!     refreshed to today when it moved. The `Generated:` timestamp is reused
//!     verbatim while the whole-content hash is unchanged, which is what
//!     makes a rebuild of an already-synchronized file byte-identical.

use crate::iatf::document::{Document, IndexEntry, INDEX_DELIMITER};
use crate::iatf::error::{IatfError, IatfResult};
use crate::iatf::hashing;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;

/// Fixed first comment line of every generated index block.
pub const AUTOGEN_NOTICE: &str = "<!-- AUTO-GENERATED - DO NOT EDIT MANUALLY -->";

/// Rounds the layout loop may take before giving up.
const MAX_SYNC_ROUNDS: usize = 5;

static ENTRY_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(#{1,2})\s+(.*?)\s*\{#([A-Za-z][A-Za-z0-9_-]{0,63})\s*\|\s*lines:(\d+)-(\d+)\s*\|\s*words:(\d+)\s*\}$",
    )
    .expect("valid regex")
});

static GENERATED_COMMENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^<!--\s*Generated:\s*(.+?)\s*-->$").expect("valid regex"));

static CONTENT_HASH_COMMENT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^<!--\s*Content-Hash:\s*([A-Za-z0-9]+):([A-Fa-f0-9]+)\s*-->$")
        .expect("valid regex")
});

/// Source of "now" for synchronization. Injected so tests and the engine can
/// pin timestamps.
pub trait Clock {
    /// `YYYY-MM-DD`, for section `Created`/`Modified` fields.
    fn today(&self) -> String;
    /// RFC3339 UTC with a trailing `Z` and no sub-second precision, for the
    /// index `Generated:` line.
    fn now(&self) -> String;
}

/// Wall-clock implementation used by the engine.
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> String {
        chrono::Utc::now().format("%Y-%m-%d").to_string()
    }

    fn now(&self) -> String {
        chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string()
    }
}

/// The parsed view of an existing index block.
#[derive(Debug, Default)]
pub struct IndexBlock {
    /// Value of the `Generated:` comment, if present and well-formed.
    pub generated: Option<String>,
    /// Algorithm tag from the `Content-Hash:` comment.
    pub hash_algo: Option<String>,
    /// Hex digest from the `Content-Hash:` comment.
    pub content_hash: Option<String>,
    /// 0-indexed line of a `Content-Hash:` comment that did not parse.
    pub malformed_hash_line: Option<usize>,
    /// Entries in block order.
    pub entries: Vec<IndexEntry>,
}

impl IndexBlock {
    pub fn entry(&self, id: &str) -> Option<&IndexEntry> {
        self.entries.iter().find(|entry| entry.id == id)
    }
}

/// Parse whatever sits between the INDEX and CONTENT delimiters.
///
/// Tolerant by design: a hand-mangled block still yields every entry that
/// parses, and the validator reports the rest.
pub fn parse_index(doc: &Document) -> IndexBlock {
    let mut block = IndexBlock::default();
    let (start, end) = match (doc.index_delim(), doc.content_delim()) {
        (Some(index), Some(content)) if index < content => (index + 1, content),
        _ => return block,
    };

    let mut current: Option<usize> = None;
    for (i, line) in doc.lines[start..end].iter().enumerate() {
        let line_no = start + i;
        let stripped = line.trim();
        if stripped.is_empty() {
            current = None;
            continue;
        }
        if let Some(captures) = GENERATED_COMMENT.captures(stripped) {
            block.generated = Some(captures[1].to_string());
            continue;
        }
        if stripped.starts_with("<!-- Content-Hash:") {
            match CONTENT_HASH_COMMENT.captures(stripped) {
                Some(captures) => {
                    block.hash_algo = Some(captures[1].to_string());
                    block.content_hash = Some(captures[2].to_string());
                }
                None => block.malformed_hash_line = Some(line_no),
            }
            continue;
        }
        if let Some(captures) = ENTRY_LINE.captures(stripped) {
            block.entries.push(IndexEntry {
                id: captures[3].to_string(),
                title: captures[2].to_string(),
                level: captures[1].len(),
                start: captures[4].parse().unwrap_or(0),
                end: captures[5].parse().unwrap_or(0),
                word_count: captures[6].parse().unwrap_or(0),
                summary: None,
                created: None,
                modified: None,
                hash: None,
                line: line_no,
            });
            current = Some(block.entries.len() - 1);
            continue;
        }
        let Some(at) = current else { continue };
        let entry = &mut block.entries[at];
        if let Some(summary) = stripped.strip_prefix("> ") {
            entry.summary = Some(summary.to_string());
        } else if let Some(hash) = stripped.strip_prefix("Hash:") {
            entry.hash = Some(hash.trim().to_string());
        } else if stripped.starts_with("Created:") || stripped.starts_with("Modified:") {
            for part in stripped.split('|') {
                let part = part.trim();
                if let Some(created) = part.strip_prefix("Created:") {
                    entry.created = Some(created.trim().to_string());
                }
                if let Some(modified) = part.strip_prefix("Modified:") {
                    entry.modified = Some(modified.trim().to_string());
                }
            }
        }
    }
    block
}

/// Result of regenerating the index block.
#[derive(Debug)]
pub struct SyncResult {
    /// The complete new file as EOL-normalized lines.
    pub lines: Vec<String>,
    /// Whether the new lines differ from the input document's.
    pub changed: bool,
}

/// Resolved per-section values about to be rendered.
struct ResolvedEntry {
    id: String,
    title: String,
    level: usize,
    start: usize,
    end: usize,
    word_count: usize,
    summary: Option<String>,
    created: String,
    modified: String,
    hash: String,
}

/// Regenerate the index block from the parsed sections and splice it into a
/// new line vector. The caller is responsible for refusing documents with
/// fatal structural errors; this function assumes the section list is sound.
pub fn synchronize(doc: &Document, clock: &dyn Clock) -> IatfResult<SyncResult> {
    let content_delim = doc
        .content_delim()
        .ok_or_else(|| IatfError::Format("missing ===CONTENT=== delimiter".to_string()))?;
    if doc.sections.is_empty() {
        return Err(IatfError::Structure("no sections found".to_string()));
    }

    let prior = parse_index(doc);
    let prior_meta: HashMap<&str, &IndexEntry> = prior
        .entries
        .iter()
        .map(|entry| (entry.id.as_str(), entry))
        .collect();

    let today = clock.today();
    let mut resolved = Vec::with_capacity(doc.sections.len());
    for section in &doc.sections {
        let new_hash = hashing::section_hash(doc, section).ok_or_else(|| {
            IatfError::Structure(format!("section out of range: {}", section.id))
        })?;
        let prior_entry = prior_meta.get(section.id.as_str());
        // Hand-authored header metadata seeds the lifecycle when the index
        // has no record yet.
        let prior_created = prior_entry
            .and_then(|entry| entry.created.clone())
            .or_else(|| section.created.clone());
        let prior_modified = prior_entry
            .and_then(|entry| entry.modified.clone())
            .or_else(|| section.modified.clone());
        let prior_hash = prior_entry
            .and_then(|entry| entry.hash.clone())
            .or_else(|| section.hash.clone());

        let modified = match &prior_hash {
            Some(prior_hash) if *prior_hash == new_hash => {
                prior_modified.unwrap_or_else(|| today.clone())
            }
            // Without a matching prior hash, staleness cannot be verified.
            _ => today.clone(),
        };
        resolved.push(ResolvedEntry {
            id: section.id.clone(),
            title: section.title.clone(),
            level: section.level,
            start: section.start,
            end: section.end,
            word_count: section.word_count,
            summary: section.summary.clone(),
            created: prior_created.unwrap_or_else(|| today.clone()),
            modified,
            hash: new_hash,
        });
    }

    let new_content_hash = hashing::content_hash(doc)
        .ok_or_else(|| IatfError::Format("missing ===CONTENT=== delimiter".to_string()))?;
    let generated = match (&prior.generated, &prior.content_hash) {
        (Some(generated), Some(prior_hash)) if *prior_hash == new_content_hash => {
            generated.clone()
        }
        _ => clock.now(),
    };

    // With no prior block, insert immediately before ===CONTENT=== so that
    // stray preamble text between the header and the delimiter survives.
    let replace_start = doc.index_delim().unwrap_or(content_delim).min(content_delim);

    let mut delta: i64 = 0;
    let mut rendered = Vec::new();
    let mut converged = false;
    for _ in 0..MAX_SYNC_ROUNDS {
        rendered = render_block(&resolved, delta, &generated, &new_content_hash);
        let new_delim = replace_start + rendered.len();
        let new_delta = new_delim as i64 - content_delim as i64;
        if new_delta == delta {
            converged = true;
            break;
        }
        delta = new_delta;
    }
    if !converged {
        return Err(IatfError::Io("unstable index layout".to_string()));
    }

    let mut lines = doc.lines[..replace_start].to_vec();
    lines.extend(rendered);
    lines.extend_from_slice(&doc.lines[content_delim..]);
    let changed = lines != doc.lines;
    Ok(SyncResult { lines, changed })
}

fn render_block(
    entries: &[ResolvedEntry],
    delta: i64,
    generated: &str,
    content_hash: &str,
) -> Vec<String> {
    let mut lines = vec![
        INDEX_DELIMITER.to_string(),
        AUTOGEN_NOTICE.to_string(),
        format!("<!-- Generated: {} -->", generated),
        format!("<!-- Content-Hash: sha256:{} -->", content_hash),
        String::new(),
    ];
    for entry in entries {
        lines.push(format!(
            "{} {} {{#{} | lines:{}-{} | words:{}}}",
            "#".repeat(entry.level),
            entry.title,
            entry.id,
            shift(entry.start, delta),
            shift(entry.end, delta),
            entry.word_count,
        ));
        if let Some(summary) = &entry.summary {
            lines.push(format!("> {}", summary));
        }
        lines.push(format!(
            "  Created: {} | Modified: {}",
            entry.created, entry.modified
        ));
        lines.push(format!("  Hash: {}", entry.hash));
        lines.push(String::new());
    }
    lines
}

fn shift(line: usize, delta: i64) -> usize {
    let shifted = line as i64 + delta;
    if shifted < 1 {
        1
    } else {
        shifted as usize
    }
}
