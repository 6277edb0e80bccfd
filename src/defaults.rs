//! Default values for provision-shell configuration.
//!
//! This module provides centralized default values and the environment
//! variable names the CLI reads them from, so the library and the binary agree
//! on them.

use std::path::PathBuf;

/// Name of the version-control binary used when none is configured.
pub const DEFAULT_GIT_BINARY: &str = "git";

/// Environment variable overriding the git binary.
pub const GIT_BINARY_ENV: &str = "PROVISION_SHELL_GIT";

/// Environment variable overriding the working directory.
pub const WORKING_DIR_ENV: &str = "PROVISION_SHELL_WORKING_DIR";

/// Returns the default working directory for commands.
///
/// This is the directory the process was started in. Falls back to `.` if the
/// current directory cannot be determined (for example, when it was removed).
pub fn default_working_dir() -> PathBuf {
    std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
}
