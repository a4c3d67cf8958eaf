//! File-level operations
//!
//!     Everything below loads a file, parses it fresh and operates on the
//!     resulting [`Document`]. Nothing here keeps state between calls; the
//!     CLI makes exactly one call per invocation and the editor server keeps
//!     its own per-file documents.
//!
//!     `rebuild_file` is the only writer, and it writes nothing unless the
//!     regenerated bytes differ from what is on disk.

use crate::iatf::diagnostics::{Diagnostic, IssueKind};
use crate::iatf::document::Document;
use crate::iatf::error::{IatfError, IatfResult};
use crate::iatf::index::{self, Clock, SyncResult};
use crate::iatf::parsing::parse;
use crate::iatf::query;
use crate::iatf::validate::{self, ValidationReport};
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Read and parse a file.
pub fn load(path: &Path) -> IatfResult<Document> {
    let raw = fs::read_to_string(path)
        .map_err(|err| IatfError::Io(format!("cannot read {}: {}", path.display(), err)))?;
    Ok(parse(&raw))
}

/// Regenerate the index block in place. Returns whether the file changed.
///
/// Refuses with no partial write while any format or structure error is
/// present; reference and consistency problems do not move sections around,
/// so they do not block.
pub fn rebuild_file(path: &Path, clock: &dyn Clock) -> IatfResult<bool> {
    let doc = load(path)?;
    let report = validate::validate(&doc);
    if report.blocks_rebuild() {
        return Err(blocking_error(&report));
    }
    let result = index::synchronize(&doc, clock)?;
    if result.changed {
        write_lines(path, &doc, &result)?;
    }
    Ok(result.changed)
}

fn blocking_error(report: &ValidationReport) -> IatfError {
    let blocking: Vec<&Diagnostic> = report
        .errors()
        .filter(|diag| matches!(diag.kind, IssueKind::Format | IssueKind::Structure))
        .collect();
    let message = match blocking.as_slice() {
        [only] => only.message.clone(),
        many => format!(
            "{} ({} more)",
            many.first().map(|diag| diag.message.as_str()).unwrap_or(""),
            many.len().saturating_sub(1)
        ),
    };
    match blocking.first().map(|diag| diag.kind) {
        Some(IssueKind::Format) => IatfError::Format(message),
        _ => IatfError::Structure(message),
    }
}

fn write_lines(path: &Path, doc: &Document, result: &SyncResult) -> IatfResult<()> {
    let text = result.lines.join(doc.eol.as_str());
    fs::write(path, text)
        .map_err(|err| IatfError::Io(format!("cannot write {}: {}", path.display(), err)))
}

/// Validate a file and return the full report.
pub fn validate_file(path: &Path) -> IatfResult<ValidationReport> {
    Ok(validate::validate(&load(path)?))
}

/// The file's verbatim index block.
pub fn index_text_file(path: &Path) -> IatfResult<String> {
    query::index_text(&load(path)?)
}

/// Read a section's span by ID, or by case-insensitive title substring.
pub fn read_file(path: &Path, target: &str, by_title: bool) -> IatfResult<String> {
    let doc = load(path)?;
    if by_title {
        query::read_by_title(&doc, target)
    } else {
        query::read_section(&doc, target)
    }
}

/// The reference-graph report, labeled with the path as given.
pub fn graph_text_file(path: &Path, show_incoming: bool) -> IatfResult<String> {
    let doc = load(path)?;
    Ok(query::graph_text(&doc, &path.display().to_string(), show_incoming))
}

/// Outcome of one file inside a directory rebuild.
#[derive(Debug)]
pub struct RebuildOutcome {
    pub path: PathBuf,
    pub result: IatfResult<bool>,
}

/// Rebuild every `.iatf` file under a directory, depth-first, and report per
/// file. A broken file does not stop the walk.
pub fn rebuild_dir(dir: &Path, clock: &dyn Clock) -> IatfResult<Vec<RebuildOutcome>> {
    if !dir.is_dir() {
        return Err(IatfError::Io(format!("not a directory: {}", dir.display())));
    }
    let mut outcomes = Vec::new();
    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = entry.map_err(|err| IatfError::Io(err.to_string()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        if path.extension().and_then(|ext| ext.to_str()) != Some("iatf") {
            continue;
        }
        outcomes.push(RebuildOutcome {
            path: path.to_path_buf(),
            result: rebuild_file(path, clock),
        });
    }
    Ok(outcomes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    struct FixedClock;

    impl Clock for FixedClock {
        fn today(&self) -> String {
            "2026-01-02".to_string()
        }

        fn now(&self) -> String {
            "2026-01-02T03:04:05Z".to_string()
        }
    }

    const SAMPLE: &str = ":::IATF\n===INDEX===\n===CONTENT===\n{#a}\n@summary: s\n# A\nhello\n{/a}\n";

    #[test]
    fn rebuild_writes_once_then_settles() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("doc.iatf");
        fs::write(&path, SAMPLE).expect("seed file");

        assert!(rebuild_file(&path, &FixedClock).expect("first rebuild"));
        let after_first = fs::read_to_string(&path).expect("read back");
        assert!(after_first.contains("<!-- Content-Hash: sha256:"));

        assert!(!rebuild_file(&path, &FixedClock).expect("second rebuild"));
        let after_second = fs::read_to_string(&path).expect("read back");
        assert_eq!(after_first, after_second);
    }

    #[test]
    fn rebuild_refuses_structural_damage_without_writing() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("broken.iatf");
        let broken = ":::IATF\n===INDEX===\n===CONTENT===\n{#a}\nno close";
        fs::write(&path, broken).expect("seed file");

        let err = rebuild_file(&path, &FixedClock).expect_err("must refuse");
        assert!(matches!(err, IatfError::Structure(_)));
        assert_eq!(fs::read_to_string(&path).expect("read back"), broken);
    }

    #[test]
    fn rebuild_proceeds_past_dangling_references() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("refs.iatf");
        fs::write(
            &path,
            ":::IATF\n===INDEX===\n===CONTENT===\n{#a}\nsee {@nowhere}\n{/a}\n",
        )
        .expect("seed file");

        assert!(rebuild_file(&path, &FixedClock).expect("rebuild"));
    }

    #[test]
    fn read_file_by_id_and_title() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("doc.iatf");
        fs::write(&path, SAMPLE).expect("seed file");

        let by_id = read_file(&path, "a", false).expect("by id");
        assert!(by_id.starts_with("{#a}"));

        let by_title = read_file(&path, "a", true).expect("by title");
        assert_eq!(by_id, by_title);

        let err = read_file(&path, "ghost", false).expect_err("missing");
        assert!(matches!(err, IatfError::NotFound(_)));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = load(Path::new("/nonexistent/doc.iatf")).expect_err("missing file");
        assert!(matches!(err, IatfError::Io(_)));
    }

    #[test]
    fn rebuild_dir_walks_nested_iatf_files() {
        let dir = tempfile::tempdir().expect("tempdir");
        let nested = dir.path().join("sub");
        fs::create_dir(&nested).expect("mkdir");
        fs::write(dir.path().join("top.iatf"), SAMPLE).expect("seed");
        fs::write(nested.join("deep.iatf"), SAMPLE).expect("seed");
        fs::write(nested.join("ignored.txt"), "not iatf").expect("seed");

        let outcomes = rebuild_dir(dir.path(), &FixedClock).expect("walk");
        assert_eq!(outcomes.len(), 2);
        assert!(outcomes.iter().all(|o| matches!(o.result, Ok(true))));
    }

    #[test]
    fn crlf_files_keep_their_line_endings_on_disk() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("crlf.iatf");
        fs::write(&path, SAMPLE.replace('\n', "\r\n")).expect("seed file");

        rebuild_file(&path, &FixedClock).expect("rebuild");
        let written = fs::read_to_string(&path).expect("read back");
        assert!(written.contains("===INDEX===\r\n"));
        assert!(!written.replace("\r\n", "").contains('\n'));
    }
}
