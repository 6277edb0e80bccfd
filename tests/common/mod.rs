//! Shared test utilities for integration and E2E tests.
//!
//! This module provides fixtures for tests that run real subprocesses:
//! temporary git repositories with tagged commits, and availability checks
//! for the binaries those tests depend on.
//!
//! ## Usage
//!
//! Add `mod common;` to your test file, then use the helpers:
//!
//! ```rust,ignore
//! mod common;
//! use common::prelude::*;
//!
//! #[test]
//! fn test_example() {
//!     if !git_available() {
//!         return;
//!     }
//!     let repo = GitRepoFixture::new().with_tags(&["v1.0.0"]);
//!     // ... test code
//! }
//! ```

use std::env;
use std::path::Path;
use std::process::{Command, Stdio};

/// Re-export commonly used test dependencies for convenience.
pub mod prelude {
    #[allow(unused_imports)]
    pub use assert_cmd::cargo::cargo_bin_cmd;
    #[allow(unused_imports)]
    pub use assert_fs::prelude::*;
    #[allow(unused_imports)]
    pub use predicates::prelude::*;

    #[allow(unused_imports)]
    pub use super::{git_available, sh_available, should_skip_network_tests, GitRepoFixture};
}

/// Check if network tests should be skipped.
///
/// Returns `true` if the `SKIP_NETWORK_TESTS` environment variable is set.
#[allow(dead_code)]
pub fn should_skip_network_tests() -> bool {
    env::var("SKIP_NETWORK_TESTS").is_ok()
}

fn binary_runs(binary: &str, args: &[&str]) -> bool {
    Command::new(binary)
        .args(args)
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|status| status.success())
        .unwrap_or(false)
}

/// Whether a `git` binary is on PATH.
#[allow(dead_code)]
pub fn git_available() -> bool {
    let available = binary_runs("git", &["--version"]);
    if !available {
        eprintln!("git not available, skipping");
    }
    available
}

/// Whether `sh` is on PATH.
#[allow(dead_code)]
pub fn sh_available() -> bool {
    let available = binary_runs("sh", &["-c", "exit 0"]);
    if !available {
        eprintln!("sh not available, skipping");
    }
    available
}

/// A temporary git repository with one initial commit.
///
/// # Example
///
/// ```rust,ignore
/// let repo = GitRepoFixture::new()
///     .with_dir("modules/vpc")
///     .with_tags(&["v0.3.1", "v0.10.0"]);
///
/// let tags = git::git_repo_tags(&ctx, &options, repo.url())?;
/// ```
#[allow(dead_code)]
pub struct GitRepoFixture {
    temp_dir: assert_fs::TempDir,
}

#[allow(dead_code)]
impl GitRepoFixture {
    /// Create a repository with a single commit on the default branch.
    pub fn new() -> Self {
        let temp_dir = assert_fs::TempDir::new().expect("Failed to create temp directory");
        let fixture = Self { temp_dir };
        fixture.git(&["init", "--quiet"]);
        fixture.git(&[
            "-c",
            "user.name=Provision Shell Tests",
            "-c",
            "user.email=tests@example.com",
            "-c",
            "commit.gpgsign=false",
            "commit",
            "--quiet",
            "--allow-empty",
            "-m",
            "initial commit",
        ]);
        fixture
    }

    /// Create a directory (and its parents) inside the working tree.
    pub fn with_dir(self, path: &str) -> Self {
        std::fs::create_dir_all(self.path().join(path)).expect("Failed to create directory");
        self
    }

    /// Add lightweight tags pointing at the current commit.
    pub fn with_tags(self, tags: &[&str]) -> Self {
        for tag in tags {
            self.git(&["tag", tag]);
        }
        self
    }

    /// Get the path to the working tree.
    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// The repository location in a form `git ls-remote` accepts.
    pub fn url(&self) -> &str {
        self.path().to_str().expect("Temp directory path is not UTF-8")
    }

    /// The top-level directory as git reports it, with symlinks resolved.
    pub fn canonical_path(&self) -> std::path::PathBuf {
        self.path()
            .canonicalize()
            .expect("Failed to canonicalize temp directory")
    }

    fn git(&self, args: &[&str]) {
        let status = Command::new("git")
            .args(args)
            .current_dir(self.path())
            .stdout(Stdio::null())
            .status()
            .expect("Failed to run git");
        assert!(status.success(), "git {:?} failed", args);
    }
}

impl Default for GitRepoFixture {
    fn default() -> Self {
        Self::new()
    }
}
