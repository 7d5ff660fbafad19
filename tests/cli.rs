//! Runs the `exhibit-pack` binary against fixture files in a temp dir.
//!
//! Nothing here touches the network: only local PDFs and ZIPs are used.

mod common;

use common::{make_pdf, make_zip, page_count};
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

fn exhibit_pack(args: &[&str], dir: &Path) -> Output {
    Command::new(env!("CARGO_BIN_EXE_exhibit-pack"))
        .args(args)
        .current_dir(dir)
        .env_remove("RUST_LOG")
        .env_remove("API2PDF_API_KEY")
        .output()
        .expect("failed to run exhibit-pack")
}

fn write(dir: &Path, name: &str, bytes: &[u8]) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, bytes).unwrap();
    path
}

fn json_stdout(out: &Output) -> serde_json::Value {
    serde_json::from_slice(&out.stdout).unwrap_or_else(|e| {
        panic!(
            "stdout is not JSON ({e}): {}\nstderr: {}",
            String::from_utf8_lossy(&out.stdout),
            String::from_utf8_lossy(&out.stderr)
        )
    })
}

fn names(summary: &serde_json::Value) -> Vec<String> {
    summary["exhibits"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["display_name"].as_str().unwrap().to_string())
        .collect()
}

#[test]
fn bad_pdf_is_skipped_and_package_still_written() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "good.pdf", &make_pdf(2, "Good"));
    write(dir.path(), "notes.pdf", b"not a pdf at all");

    let out = exhibit_pack(
        &["--pdf", "good.pdf", "--pdf", "notes.pdf", "--output-dir", "out", "--quiet"],
        dir.path(),
    );
    assert!(
        out.status.success(),
        "status {:?}, stderr: {}",
        out.status,
        String::from_utf8_lossy(&out.stderr)
    );

    let merged: Vec<PathBuf> = std::fs::read_dir(dir.path().join("out"))
        .unwrap()
        .map(|e| e.unwrap().path())
        .filter(|p| {
            let name = p.file_name().unwrap().to_string_lossy().into_owned();
            name.starts_with("Exhibit_Package_") && !name.ends_with("_TOC.pdf")
        })
        .collect();
    assert_eq!(merged.len(), 1, "{merged:?}");
    // One TOC page plus the two pages of the only exhibit.
    assert_eq!(page_count(&std::fs::read(&merged[0]).unwrap()), 3);
}

#[test]
fn json_summary_reports_skipped_inputs() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "good.pdf", &make_pdf(1, "Good"));
    write(dir.path(), "notes.pdf", b"not a pdf at all");
    write(dir.path(), "broken.zip", b"PK but not really");

    let out = exhibit_pack(
        &[
            "--pdf", "good.pdf", "--pdf", "notes.pdf", "--zip", "broken.zip", "--zip", "missing.zip",
            "--json", "--list-only",
        ],
        dir.path(),
    );
    assert!(out.status.success(), "stderr: {}", String::from_utf8_lossy(&out.stderr));

    let summary = json_stdout(&out);
    assert_eq!(names(&summary), vec!["good.pdf"]);
    let skipped: Vec<&str> = summary["issues"]
        .as_array()
        .unwrap()
        .iter()
        .map(|i| i["InputSkipped"]["input"].as_str().unwrap())
        .collect();
    assert_eq!(skipped, vec!["notes.pdf", "broken.zip", "missing.zip"]);
}

#[test]
fn moves_accept_labels_and_positions() {
    let dir = TempDir::new().unwrap();
    for name in ["a", "b", "c"] {
        write(dir.path(), &format!("{name}.pdf"), &make_pdf(1, name));
    }
    let zip = make_zip(&[("d.pdf", make_pdf(1, "d"))]);
    write(dir.path(), "more.zip", &zip);

    let out = exhibit_pack(
        &[
            "--pdf", "a.pdf", "--pdf", "b.pdf", "--pdf", "c.pdf", "--zip", "more.zip",
            "--move", "C:A", "--move", "4:2", "--json", "--list-only",
        ],
        dir.path(),
    );
    assert!(out.status.success(), "stderr: {}", String::from_utf8_lossy(&out.stderr));
    let summary = json_stdout(&out);
    assert_eq!(names(&summary), vec!["c.pdf", "d.pdf", "a.pdf", "b.pdf"]);
    assert_eq!(summary["exhibits"][1]["label"], "B");
}

#[test]
fn out_of_range_move_fails() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "a.pdf", &make_pdf(1, "a"));

    let out = exhibit_pack(&["--pdf", "a.pdf", "--move", "5:1", "--list-only"], dir.path());
    assert!(!out.status.success());
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("--move 5:1"), "stderr: {stderr}");
}

#[test]
fn no_usable_input_fails() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "notes.pdf", b"not a pdf at all");

    let out = exhibit_pack(&["--pdf", "notes.pdf", "--quiet"], dir.path());
    assert!(!out.status.success());
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("No exhibits were added"), "stderr: {stderr}");
    assert!(stderr.contains("notes.pdf"), "stderr: {stderr}");
}
