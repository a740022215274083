//! Integration tests for the `hkc` driver.
//!
//! These tests verify the CLI commands work correctly against real
//! filesystem trees.

use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::fs;
use std::process::Command;
use tempfile::TempDir;

fn write_module(dir: &std::path::Path, name: &str, contents: &str) {
    fs::write(dir.join(name), contents).unwrap();
}

#[test]
fn test_help_command() {
    let mut cmd = Command::cargo_bin("hkc").unwrap();
    cmd.arg("--help");
    cmd.assert().success().stdout(predicate::str::contains("Hikolang compiler driver"));
}

#[test]
fn test_version_command() {
    let mut cmd = Command::cargo_bin("hkc").unwrap();
    cmd.arg("--version");
    cmd.assert().success().stdout(predicate::str::contains("hkc"));
}

#[test]
fn test_list_command_reports_sources() {
    let temp = TempDir::new().unwrap();
    write_module(temp.path(), "a.hkm", "module .a;\n");
    write_module(temp.path(), "b.hkm", "module .b;\n");

    let mut cmd = Command::cargo_bin("hkc").unwrap();
    cmd.arg("list").arg(temp.path());
    cmd.assert().success().stdout(predicate::str::contains("a.hkm")).stdout(predicate::str::contains("b.hkm"));
}

#[test]
fn test_build_command_on_empty_repository_succeeds() {
    let temp = TempDir::new().unwrap();

    let mut cmd = Command::cargo_bin("hkc").unwrap();
    cmd.arg("build").arg(temp.path());
    cmd.assert().success();
}

#[test]
fn test_nonexistent_compile_directory_fails() {
    let mut cmd = Command::cargo_bin("hkc").unwrap();
    cmd.arg("build").arg("/nonexistent/path/12345");
    cmd.assert().failure();
}

#[test]
fn test_clone_command_reports_unreachable_remote_as_warning_not_failure() {
    let temp = TempDir::new().unwrap();
    write_module(
        temp.path(),
        "m.hkm",
        "module .a;\nimport git \"https://example.invalid/does-not-exist.git\" \"main\";\n",
    );

    let mut cmd = Command::cargo_bin("hkc").unwrap();
    cmd.arg("clone").arg(temp.path());
    // A single unreachable remote is recorded as a warning, not a build
    // failure, and the dependency directory does not persist after the
    // resolver's sweep.
    cmd.assert().success();
    assert!(!temp.path().join("_hkdeps").read_dir().map(|mut d| d.next().is_some()).unwrap_or(false));
}

#[test]
fn test_define_flag_feeds_build_guard_environment() {
    let temp = TempDir::new().unwrap();
    write_module(
        temp.path(),
        "m.hkm",
        "module .a if channel == \"stable\";\n",
    );

    let mut cmd = Command::cargo_bin("hkc").unwrap();
    cmd.arg("build").arg(temp.path()).arg("--define").arg("channel=stable");
    cmd.assert().success();
}

#[test]
fn test_malformed_define_flag_is_an_argument_error() {
    let temp = TempDir::new().unwrap();

    let mut cmd = Command::cargo_bin("hkc").unwrap();
    cmd.arg("build").arg(temp.path()).arg("--define").arg("no-equals-sign");
    cmd.assert().failure();
}

#[test]
fn test_response_file_expansion() {
    let temp = TempDir::new().unwrap();
    write_module(temp.path(), "m.hkm", "module .a;\n");

    let rsp = temp.path().join("args.rsp");
    fs::write(&rsp, format!("list \"{}\"", temp.path().display())).unwrap();

    let mut cmd = Command::cargo_bin("hkc").unwrap();
    cmd.arg(format!("@{}", rsp.display()));
    cmd.assert().success().stdout(predicate::str::contains("m.hkm"));
}

#[test]
fn test_verbose_flag_raises_log_level_without_failing() {
    let temp = TempDir::new().unwrap();
    write_module(temp.path(), "m.hkm", "module .a;\n");

    let mut cmd = Command::cargo_bin("hkc").unwrap();
    cmd.arg("-vv").arg("build").arg(temp.path());
    cmd.assert().success();
}
