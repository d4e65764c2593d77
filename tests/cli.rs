//! Runs the `dupehound` binary and checks its output and exit status.

use std::path::Path;
use std::process::{Command, Output};

use dupehound::report::{NO_DUPLICATES_MESSAGE, NO_FILES_MESSAGE};
use tempfile::TempDir;

fn dupehound(root: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_dupehound"))
        .arg(root)
        .args(args)
        .output()
        .unwrap()
}

fn stdout(output: &Output) -> String {
    String::from_utf8(output.stdout.clone()).unwrap()
}

#[test]
fn empty_root_reports_no_files() {
    let dir = TempDir::new().unwrap();

    let output = dupehound(dir.path(), &[]);
    assert!(output.status.success());
    assert_eq!(stdout(&output), format!("{}\n", NO_FILES_MESSAGE));

    let output = dupehound(dir.path(), &["--json"]);
    assert!(output.status.success());
    assert_eq!(stdout(&output), format!("{}\n", NO_FILES_MESSAGE));
}

#[test]
fn unmatched_files_report_no_files() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("readme.txt"), b"not media").unwrap();

    let output = dupehound(dir.path(), &["--no-recurse"]);
    assert!(output.status.success());
    assert_eq!(stdout(&output), format!("{}\n", NO_FILES_MESSAGE));
}

#[test]
fn distinct_files_report_no_duplicates() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("a.dat"), b"first").unwrap();
    std::fs::write(dir.path().join("b.dat"), b"second").unwrap();

    let output = dupehound(dir.path(), &["--custom-exts", "dat"]);
    assert!(output.status.success());
    assert_eq!(stdout(&output), format!("{}\n", NO_DUPLICATES_MESSAGE));

    let output = dupehound(dir.path(), &["--custom-exts", "dat", "--json"]);
    assert!(output.status.success());
    let value: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(value["duplicates"], serde_json::json!([]));
    assert_eq!(value["recurse"], serde_json::json!(true));
}

#[test]
fn identical_files_are_listed() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("a.dat"), b"hello world").unwrap();
    std::fs::write(dir.path().join("b.dat"), b"hello world").unwrap();

    let output = dupehound(dir.path(), &["--custom-exts", ".DAT"]);
    assert!(output.status.success());
    let text = stdout(&output);
    let mut lines = text.lines();
    assert_eq!(
        lines.next(),
        Some("hash=b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9 (x2)")
    );
    assert!(lines.all(|l| l.starts_with("  - ") && l.ends_with("[fallback sha256:b94d27b9934d...]")));
}

#[test]
fn missing_root_fails() {
    let dir = TempDir::new().unwrap();

    let output = dupehound(&dir.path().join("missing"), &[]);
    assert!(!output.status.success());
    assert!(output.stdout.is_empty());
}
