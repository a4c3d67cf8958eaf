//! End-to-end tests for the iatf binary
//!
//! Each test works in its own temp directory; the watch and daemon commands
//! get a private HOME so the shared registries never touch the real one.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

const SAMPLE: &str = "\
:::IATF
===INDEX===
===CONTENT===
{#intro}
@summary: what this is
# Introduction
Read {@setup} next.
{/intro}
{#setup}
# Setup
Install things.
{/setup}
";

fn iatf() -> Command {
    Command::cargo_bin("iatf").expect("binary builds")
}

fn write_sample(dir: &TempDir, name: &str) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, SAMPLE).expect("seed file");
    path
}

#[test]
fn rebuild_then_validate_is_clean() {
    let dir = TempDir::new().expect("tempdir");
    let path = write_sample(&dir, "doc.iatf");

    iatf()
        .args(["rebuild", path.to_str().expect("utf8")])
        .assert()
        .success()
        .stdout(predicate::str::contains("Rebuilt:"));

    let rebuilt = fs::read_to_string(&path).expect("read back");
    assert!(rebuilt.contains("<!-- AUTO-GENERATED - DO NOT EDIT MANUALLY -->"));
    assert!(rebuilt.contains("| words:3}"));

    iatf()
        .args(["validate", path.to_str().expect("utf8")])
        .assert()
        .success()
        .stdout(predicate::str::contains("Valid IATF file"));

    // A second rebuild is a no-op.
    iatf()
        .args(["rebuild", path.to_str().expect("utf8")])
        .assert()
        .success()
        .stdout(predicate::str::contains("Index already up to date"));
    assert_eq!(fs::read_to_string(&path).expect("read back"), rebuilt);
}

#[test]
fn validate_reports_structure_errors_with_exit_1() {
    let dir = TempDir::new().expect("tempdir");
    let path = dir.path().join("broken.iatf");
    fs::write(&path, ":::IATF\n===INDEX===\n===CONTENT===\n{#a}\nno close").expect("seed");

    iatf()
        .args(["validate", path.to_str().expect("utf8")])
        .assert()
        .code(1)
        .stdout(predicate::str::contains("Unclosed section: a"))
        .stderr(predicate::str::contains("error(s) found"));
}

#[test]
fn rebuild_refuses_broken_files_with_exit_2() {
    let dir = TempDir::new().expect("tempdir");
    let path = dir.path().join("broken.iatf");
    let broken = ":::IATF\n===INDEX===\n===CONTENT===\n{#a}\nno close";
    fs::write(&path, broken).expect("seed");

    iatf()
        .args(["rebuild", path.to_str().expect("utf8")])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Unclosed section"));
    assert_eq!(fs::read_to_string(&path).expect("read back"), broken);
}

#[test]
fn missing_content_delimiter_is_exit_2() {
    let dir = TempDir::new().expect("tempdir");
    let path = dir.path().join("plain.iatf");
    fs::write(&path, ":::IATF\njust some text\n").expect("seed");

    iatf()
        .args(["rebuild", path.to_str().expect("utf8")])
        .assert()
        .code(2);
}

#[test]
fn read_prints_the_exact_span() {
    let dir = TempDir::new().expect("tempdir");
    let path = write_sample(&dir, "doc.iatf");

    iatf()
        .args(["read", path.to_str().expect("utf8"), "setup"])
        .assert()
        .success()
        .stdout(predicate::str::contains("{#setup}"))
        .stdout(predicate::str::contains("Install things."))
        .stdout(predicate::str::contains("{/setup}"));

    iatf()
        .args(["read", path.to_str().expect("utf8"), "introduction", "--title"])
        .assert()
        .success()
        .stdout(predicate::str::contains("{#intro}"));
}

#[test]
fn read_on_a_file_without_content_delimiter_is_exit_2() {
    let dir = TempDir::new().expect("tempdir");
    let path = dir.path().join("degraded.iatf");
    fs::write(&path, ":::IATF\n===INDEX===\nno content delimiter here").expect("seed");

    iatf()
        .args(["read", path.to_str().expect("utf8"), "a"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("===CONTENT==="));
}

#[test]
fn read_unknown_section_is_exit_1() {
    let dir = TempDir::new().expect("tempdir");
    let path = write_sample(&dir, "doc.iatf");

    iatf()
        .args(["read", path.to_str().expect("utf8"), "ghost"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("section not found: ghost"));
}

#[test]
fn index_prints_the_block() {
    let dir = TempDir::new().expect("tempdir");
    let path = write_sample(&dir, "doc.iatf");

    iatf()
        .args(["rebuild", path.to_str().expect("utf8")])
        .assert()
        .success();
    iatf()
        .args(["index", path.to_str().expect("utf8")])
        .assert()
        .success()
        .stdout(predicate::str::contains("===INDEX==="))
        .stdout(predicate::str::contains("# Introduction {#intro |"));
}

#[test]
fn graph_shows_selected_direction() {
    let dir = TempDir::new().expect("tempdir");
    let path = write_sample(&dir, "doc.iatf");

    iatf()
        .args(["graph", path.to_str().expect("utf8")])
        .assert()
        .success()
        .stdout(predicate::str::contains("@graph:"))
        .stdout(predicate::str::contains("intro -> setup"));

    iatf()
        .args(["graph", path.to_str().expect("utf8"), "--incoming"])
        .assert()
        .success()
        .stdout(predicate::str::contains("setup <- intro"));
}

#[test]
fn rebuild_all_walks_a_tree_and_counts_failures() {
    let dir = TempDir::new().expect("tempdir");
    let nested = dir.path().join("sub");
    fs::create_dir(&nested).expect("mkdir");
    write_sample(&dir, "top.iatf");
    fs::write(nested.join("deep.iatf"), SAMPLE).expect("seed");
    fs::write(nested.join("bad.iatf"), ":::IATF\n===INDEX===\n===CONTENT===\n{#x}").expect("seed");

    iatf()
        .args(["rebuild-all", dir.path().to_str().expect("utf8")])
        .assert()
        .code(1)
        .stdout(predicate::str::contains("3 file(s), 1 failure(s)"))
        .stderr(predicate::str::contains("bad.iatf"));
}

#[test]
fn watch_list_and_unwatch_use_a_private_home() {
    let home = TempDir::new().expect("tempdir");

    iatf()
        .env("HOME", home.path())
        .args(["watch", "--list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No files are being watched"));

    let dir = TempDir::new().expect("tempdir");
    let path = write_sample(&dir, "doc.iatf");
    iatf()
        .env("HOME", home.path())
        .args(["unwatch", path.to_str().expect("utf8")])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Not watched:"));
}

#[test]
fn daemon_status_reports_idle_state() {
    let home = TempDir::new().expect("tempdir");

    iatf()
        .env("HOME", home.path())
        .args(["daemon", "status"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Daemon not running"))
        .stdout(predicate::str::contains("No watch paths configured"));

    iatf()
        .env("HOME", home.path())
        .args(["daemon", "start"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("No watch paths configured"));
}

#[test]
fn version_flag_prints_the_package_version() {
    iatf()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}
