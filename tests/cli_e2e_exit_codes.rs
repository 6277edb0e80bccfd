//! End-to-end tests for CLI exit codes.
//!
//! These tests verify that the CLI returns exit codes according to these
//! conventions:
//!
//! - Exit code 0: Success
//! - Exit code N: the wrapped binary exited with code N
//! - Exit code 1: General error (binary not found, git failure)
//! - Exit code 2: Invalid command-line usage (handled by clap)
//! - Exit code 130: Interrupted by `--timeout`

mod common;

use common::prelude::*;

/// Exit code 0 is returned for --help.
#[test]
fn test_exit_code_help() {
    let mut cmd = cargo_bin_cmd!("provision-shell");

    cmd.arg("--help").assert().code(0);
}

/// Exit code 0 is returned for --version.
#[test]
fn test_exit_code_version() {
    let mut cmd = cargo_bin_cmd!("provision-shell");

    cmd.arg("--version")
        .assert()
        .code(0)
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

/// Exit code 2 is returned for an unknown subcommand.
#[test]
fn test_exit_code_usage_error() {
    let mut cmd = cargo_bin_cmd!("provision-shell");

    cmd.arg("no-such-subcommand").assert().code(2);
}

/// Exit code 2 is returned when `run` is missing its binary.
#[test]
fn test_exit_code_run_without_binary() {
    let mut cmd = cargo_bin_cmd!("provision-shell");

    cmd.arg("run").assert().code(2);
}

/// The wrapped binary's exit code is passed through.
#[test]
fn test_exit_code_passes_through_child_code() {
    if !sh_available() {
        return;
    }
    let mut cmd = cargo_bin_cmd!("provision-shell");

    cmd.args(["run", "sh", "-c", "exit 7"])
        .assert()
        .code(7)
        .stderr(predicate::str::contains("exited with code 7"));
}

/// Exit code 1 is returned for a binary that does not exist.
#[test]
fn test_exit_code_missing_binary() {
    let mut cmd = cargo_bin_cmd!("provision-shell");

    cmd.args(["run", "provision-shell-no-such-binary"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Executable not found"));
}

/// Exit code 130 is returned when the timeout interrupts the command.
#[test]
fn test_exit_code_timeout() {
    if !sh_available() {
        return;
    }
    let mut cmd = cargo_bin_cmd!("provision-shell");

    cmd.args(["--timeout", "1", "run", "sh", "-c", "exec sleep 30"])
        .timeout(std::time::Duration::from_secs(20))
        .assert()
        .code(130)
        .stderr(predicate::str::contains("context deadline exceeded"));
}
