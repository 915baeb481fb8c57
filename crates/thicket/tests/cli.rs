//! The `thicket` binary.
#![cfg(feature = "cli")]

mod common;

use std::fs;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

/// A temp dir holding the C table as `c.json`.
fn table_dir() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    fs::write(
        dir.path().join("c.json"),
        common::c_builder().build().to_json(),
    )
    .unwrap();
    dir
}

fn thicket() -> Command {
    Command::new(env!("CARGO_BIN_EXE_thicket"))
}

#[test]
fn test_check_table() {
    let dir = table_dir();
    thicket()
        .arg(dir.path().join("c.json"))
        .assert()
        .success()
        .stderr(predicate::str::contains("c: 19 symbols, 28 states"));
}

#[test]
fn test_parse_prints_tree() {
    let dir = table_dir();
    let source = dir.path().join("main.c");
    fs::write(&source, "if (x) { y(); }\n").unwrap();
    thicket()
        .arg(dir.path().join("c.json"))
        .arg("--parse")
        .arg(&source)
        .assert()
        .success()
        .stdout(predicate::str::starts_with(
            "(program (if_statement condition: (identifier)",
        ));
}

#[test]
fn test_syntax_errors_fail() {
    let dir = table_dir();
    let source = dir.path().join("broken.c");
    fs::write(&source, "say \"hello").unwrap();
    thicket()
        .arg(dir.path().join("c.json"))
        .args(["-p", source.to_str().unwrap()])
        .assert()
        .failure()
        .stdout(predicate::str::contains("(ERROR)"))
        .stderr(predicate::str::contains("syntax errors found"));
}

#[test]
fn test_tokens() {
    let dir = table_dir();
    let source = dir.path().join("call.c");
    fs::write(&source, "f(); // done").unwrap();
    thicket()
        .arg(dir.path().join("c.json"))
        .args(["-p", source.to_str().unwrap(), "--tokens"])
        .assert()
        .success()
        .stdout(predicate::str::contains("identifier (0, 0) - (0, 1) \"f\""))
        .stdout(predicate::str::contains("comment (0, 5) - (0, 12) \"// done\" (extra)"));
}

#[test]
fn test_corrupt_table_is_rejected() {
    let dir = table_dir();
    let path = dir.path().join("c.json");
    let json = fs::read_to_string(&path).unwrap();
    fs::write(&path, json.replacen("\"c\"", "\"d\"", 1)).unwrap();
    thicket()
        .arg(&path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("checksum mismatch"));
}
