//! End-to-end tests for the `top-level` and `latest-tag` commands.
//!
//! Both commands run git against a throwaway local repository. Tests are
//! skipped when git is not installed.

mod common;

use common::prelude::*;

#[test]
fn test_top_level_prints_repository_root() {
    if !git_available() {
        return;
    }
    let repo = GitRepoFixture::new().with_dir("live/prod");
    let expected = format!("{}\n", repo.canonical_path().display());
    let mut cmd = cargo_bin_cmd!("provision-shell");

    cmd.arg("top-level")
        .arg(repo.path().join("live/prod"))
        .assert()
        .success()
        .stdout(expected);
}

#[test]
fn test_top_level_relative_path_uses_working_dir_flag() {
    if !git_available() {
        return;
    }
    let repo = GitRepoFixture::new().with_dir("live/prod");
    let elsewhere = assert_fs::TempDir::new().unwrap();
    let expected = format!("{}\n", repo.canonical_path().display());
    let mut cmd = cargo_bin_cmd!("provision-shell");

    cmd.current_dir(elsewhere.path())
        .arg("--working-dir")
        .arg(repo.path())
        .args(["top-level", "live/prod"])
        .assert()
        .success()
        .stdout(expected);
}

#[test]
fn test_top_level_defaults_to_working_dir() {
    if !git_available() {
        return;
    }
    let repo = GitRepoFixture::new().with_dir("modules");
    let expected = format!("{}\n", repo.canonical_path().display());
    let mut cmd = cargo_bin_cmd!("provision-shell");

    cmd.current_dir(repo.path().join("modules"))
        .arg("top-level")
        .assert()
        .success()
        .stdout(expected);
}

#[test]
fn test_top_level_json_output() {
    if !git_available() {
        return;
    }
    let repo = GitRepoFixture::new();
    let mut cmd = cargo_bin_cmd!("provision-shell");

    let output = cmd
        .arg("top-level")
        .arg(repo.path())
        .args(["--format", "json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(
        report["top_level"].as_str().unwrap(),
        repo.canonical_path().to_str().unwrap()
    );
}

#[test]
fn test_latest_tag_prints_highest_release() {
    if !git_available() {
        return;
    }
    let repo = GitRepoFixture::new().with_tags(&["v0.3.1", "v0.10.0", "v0.9.9", "main-snapshot"]);
    let mut cmd = cargo_bin_cmd!("provision-shell");

    cmd.args(["latest-tag", repo.url()])
        .assert()
        .success()
        .stdout("v0.10.0\n");
}

#[test]
fn test_latest_tag_without_releases_prints_nothing() {
    if !git_available() {
        return;
    }
    let repo = GitRepoFixture::new();
    let mut cmd = cargo_bin_cmd!("provision-shell");

    cmd.args(["latest-tag", repo.url()])
        .assert()
        .success()
        .stdout("");
}

#[test]
fn test_latest_tag_json_output() {
    if !git_available() {
        return;
    }
    let repo = GitRepoFixture::new().with_tags(&["v1.2.3"]);
    let mut cmd = cargo_bin_cmd!("provision-shell");

    let output = cmd
        .args(["latest-tag", repo.url(), "--format", "json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["latest_tag"], "v1.2.3");
    assert_eq!(report["repo"], repo.url());
}

#[test]
fn test_latest_tag_with_missing_git_binary() {
    let mut cmd = cargo_bin_cmd!("provision-shell");

    cmd.args(["--git", "provision-shell-no-such-git", "latest-tag", "."])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Failed to list tags of ."))
        .stderr(predicate::str::contains("provision-shell-no-such-git"));
}
