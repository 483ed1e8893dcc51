//! End-to-end tests against a real Mercurial binary.
//!
//! Skipped when `hg` is not installed on the host.

use std::path::PathBuf;
use std::process::Command;

use hgpipe::{parsers, Hg, Repo};

fn hg_available() -> bool {
    Command::new("hg")
        .arg("--version")
        .output()
        .map(|out| out.status.success())
        .unwrap_or(false)
}

fn temp_dir(label: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!(
        "hgpipe-e2e-{label}-{}-{}",
        std::process::id(),
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .expect("time should be after epoch")
            .as_nanos()
    ));
    std::fs::create_dir_all(&dir).expect("temp dir should be creatable");
    dir
}

#[test]
fn log_on_fresh_repo_is_empty_with_exit_zero() {
    if !hg_available() {
        eprintln!("hg not installed; skipping");
        return;
    }

    let dir = temp_dir("log");
    let repo = Repo::init(&dir).expect("init should succeed");

    let out = repo.log(&[]).expect("log should succeed");
    assert_eq!(out.exit_code, 0);
    assert_eq!(out.output, "");

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn add_commit_and_log_roundtrip() {
    if !hg_available() {
        eprintln!("hg not installed; skipping");
        return;
    }

    let dir = temp_dir("commit");
    let repo = Repo::init(&dir).expect("init should succeed");
    std::fs::write(dir.join("readme.txt"), "hello\n").expect("file should be writable");

    repo.add(&[]).expect("add should succeed");
    repo.run(&[
        "commit",
        "-m",
        "first commit",
        "--config",
        "ui.username=hgpipe tests <hgpipe@example.com>",
    ])
    .expect("commit should succeed");

    let out = repo.log(&[]).expect("log should succeed");
    assert_eq!(out.exit_code, 0);
    assert!(out.output.contains("first commit"));

    let states = repo.status().expect("status should succeed");
    assert!(states.is_empty());

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn status_reports_untracked_file() {
    if !hg_available() {
        eprintln!("hg not installed; skipping");
        return;
    }

    let dir = temp_dir("status");
    let repo = Repo::init(&dir).expect("init should succeed");
    std::fs::write(dir.join("stray.txt"), "stray\n").expect("file should be writable");

    let states = repo.status().expect("status should succeed");
    assert_eq!(states.get("stray.txt"), Some(&'?'));

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn version_parses_from_real_binary() {
    if !hg_available() {
        eprintln!("hg not installed; skipping");
        return;
    }

    let version = Hg::new().version().expect("version should parse");
    assert!(version.chars().next().is_some_and(|c| c.is_ascii_digit()));
}

#[test]
fn clone_local_repository() {
    if !hg_available() {
        eprintln!("hg not installed; skipping");
        return;
    }

    let source = temp_dir("clone-src");
    let repo = Repo::init(&source).expect("init should succeed");
    std::fs::write(source.join("a.txt"), "a\n").expect("file should be writable");
    repo.add(&[]).expect("add should succeed");
    repo.run(&[
        "commit",
        "-m",
        "seed",
        "--config",
        "ui.username=hgpipe tests <hgpipe@example.com>",
    ])
    .expect("commit should succeed");

    let dest = temp_dir("clone-dst").join("copy");
    let clone = Hg::new()
        .clone_repo(&source.to_string_lossy(), &dest)
        .expect("clone should succeed");

    let out = clone.log(&[]).expect("log should succeed");
    assert!(out.output.contains("seed"));

    // Parsed log output via the JSON template.
    let log = clone.log(&["-Tjson"]).expect("templated log should succeed");
    let entries: serde_json::Value =
        parsers::json(&log.messages).expect("templated log should be json");
    assert_eq!(entries.as_array().map(Vec::len), Some(1));

    let _ = std::fs::remove_dir_all(&source);
    let _ = std::fs::remove_dir_all(dest.parent().unwrap());
}
