use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::tempdir;

#[test]
fn compiles_a_source_file_to_bytecode() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("in.src");
    let output = dir.path().join("out.bc");
    fs::write(&input, "1 + 2;").unwrap();

    Command::cargo_bin("cbcc")
        .unwrap()
        .arg(&input)
        .arg(&output)
        .assert()
        .success();

    let bytes = fs::read(&output).unwrap();
    assert!(!bytes.is_empty());
}

#[test]
fn reports_a_lex_error_and_exits_non_zero_without_writing_output() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("in.src");
    let output = dir.path().join("out.bc");
    fs::write(&input, "1 @ 2;").unwrap();

    Command::cargo_bin("cbcc")
        .unwrap()
        .arg(&input)
        .arg(&output)
        .assert()
        .failure()
        .stderr(predicate::str::contains("error:"));

    assert!(!output.exists());
}

#[test]
fn reports_a_link_error_for_an_undefined_goto_target() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("in.src");
    let output = dir.path().join("out.bc");
    fs::write(&input, "goto nosuch;").unwrap();

    Command::cargo_bin("cbcc")
        .unwrap()
        .arg(&input)
        .arg(&output)
        .assert()
        .failure();

    assert!(!output.exists());
}

#[test]
fn missing_input_file_is_reported_as_a_failure() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("does-not-exist.src");
    let output = dir.path().join("out.bc");

    Command::cargo_bin("cbcc")
        .unwrap()
        .arg(&input)
        .arg(&output)
        .assert()
        .failure();
}

#[test]
fn debug_flag_is_accepted() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("in.src");
    let output = dir.path().join("out.bc");
    fs::write(&input, "x = 1;").unwrap();

    Command::cargo_bin("cbcc")
        .unwrap()
        .arg(&input)
        .arg(&output)
        .arg("--debug")
        .assert()
        .success();
}
