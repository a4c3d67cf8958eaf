//! Content hashing
//!
//!     Two digests anchor index/content consistency:
//!
//!     - per-section hashes, the first 7 hex characters of the SHA-256 of the
//!       section's full line span (tag lines included), stored as `@hash:` in
//!       the section header and `Hash:` in its index entry;
//!     - the whole-content hash, the full hex SHA-256 of everything after
//!       `===CONTENT===`, stored as `Content-Hash: sha256:<hex>` in the index.
//!
//!     Hash inputs are joined with the document's detected line-ending style,
//!     so a CRLF file hashes its CRLF bytes. A truncated section hash is a
//!     change detector, not a security boundary; the full-width content hash
//!     is what gates timestamp refresh during rebuild.

use crate::iatf::document::{Document, Section};
use sha2::{Digest, Sha256};

/// Hex width of the truncated per-section digest.
pub const SECTION_HASH_LEN: usize = 7;

/// Full-width hex SHA-256 of arbitrary bytes.
pub fn digest_hex(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

/// Truncated digest of a section's span, open and close tag lines included.
///
/// Returns `None` if the section's recorded range does not fit the document,
/// which happens while the index is stale.
pub fn section_hash(doc: &Document, section: &Section) -> Option<String> {
    if section.start == 0 || section.end < section.start || section.end > doc.lines.len() {
        return None;
    }
    let span = doc.lines[section.start - 1..section.end].join(doc.eol.as_str());
    let mut digest = digest_hex(span.as_bytes());
    digest.truncate(SECTION_HASH_LEN);
    Some(digest)
}

/// Full digest of the content region (everything after `===CONTENT===`).
pub fn content_hash(doc: &Document) -> Option<String> {
    let start = doc.content_start()?;
    if start > doc.lines.len() {
        return Some(digest_hex(b""));
    }
    let region = doc.lines[start..].join(doc.eol.as_str());
    Some(digest_hex(region.as_bytes()))
}
