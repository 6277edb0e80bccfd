//! # Run Options
//!
//! `RunOptions` is the configuration object every command runs with. It
//! replaces any reliance on process-global state at execution time:
//!
//! - **`working_dir`**: the directory the subprocess starts in.
//! - **`env`**: the complete environment handed to the subprocess. The
//!   child's inherited environment is cleared first, so only these variables
//!   reach it.
//! - **`writer`** / **`err_writer`**: where stdout and stderr go. Unset means
//!   the process's own streams.
//! - **`git_binary`**: the version-control binary used by the `git` module.
//!
//! `RunOptions::new` snapshots the process environment once. Callers that
//! need a different environment edit `env` afterwards.

use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::defaults;
use crate::output::OutputSink;

/// Configuration for running external commands.
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Directory commands are started in.
    pub working_dir: PathBuf,
    /// Environment passed to commands.
    pub env: BTreeMap<String, String>,
    /// Destination of the subprocess's standard output.
    pub writer: Option<OutputSink>,
    /// Destination of the subprocess's standard error.
    pub err_writer: Option<OutputSink>,
    /// Name or path of the git binary.
    pub git_binary: String,
}

impl RunOptions {
    /// Create options for `working_dir` with a snapshot of the current
    /// process environment.
    ///
    /// Variables whose name or value is not valid UTF-8 are left out.
    pub fn new(working_dir: impl Into<PathBuf>) -> Self {
        let env = std::env::vars_os()
            .filter_map(|(key, value)| Some((key.into_string().ok()?, value.into_string().ok()?)))
            .collect();
        Self {
            working_dir: working_dir.into(),
            env,
            writer: None,
            err_writer: None,
            git_binary: defaults::DEFAULT_GIT_BINARY.to_string(),
        }
    }

    /// Set the stdout destination.
    pub fn with_writer(mut self, writer: OutputSink) -> Self {
        self.writer = Some(writer);
        self
    }

    /// Set the stderr destination.
    pub fn with_err_writer(mut self, err_writer: OutputSink) -> Self {
        self.err_writer = Some(err_writer);
        self
    }

    /// Set or replace one environment variable.
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    /// Set the git binary.
    pub fn with_git_binary(mut self, git_binary: impl Into<String>) -> Self {
        self.git_binary = git_binary.into();
        self
    }
}

impl Default for RunOptions {
    fn default() -> Self {
        Self::new(defaults::default_working_dir())
    }
}
