//! # Error Handling
//!
//! This module defines the error type shared by every part of the
//! `provision-shell` library. It uses `thiserror` to derive a single `Error`
//! enum whose variants map onto the failure classes a caller needs to tell
//! apart when a subprocess is involved:
//!
//! - **`NotFound`**: the binary does not exist or cannot be executed.
//! - **`NonZeroExit`**: the binary ran and reported failure.
//! - **`Canceled`**: the context was canceled or its deadline passed while the
//!   command was pending or running.
//!
//! Failures produced by a closure handed to the expensive-call cache are
//! returned to the caller unchanged, so they keep whichever variant the
//! closure produced.
//!
//! None of these errors are retried inside the library. Recovery belongs to
//! the caller.

use std::fmt;

use thiserror::Error;

/// Why a context stopped being live.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelReason {
    /// The context, or one of its ancestors, was explicitly canceled.
    Canceled,
    /// The deadline of the context, or of one of its ancestors, has passed.
    DeadlineExceeded,
}

impl fmt::Display for CancelReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CancelReason::Canceled => write!(f, "context canceled"),
            CancelReason::DeadlineExceeded => write!(f, "context deadline exceeded"),
        }
    }
}

/// Main error type for provision-shell operations
#[derive(Error, Debug)]
pub enum Error {
    /// The requested binary could not be found on `PATH` or is not executable.
    #[error("Executable not found: {binary}")]
    NotFound {
        binary: String,
        #[source]
        source: std::io::Error,
    },

    /// The subprocess ran and exited with a non-zero status.
    ///
    /// `stdout` and `stderr` are only populated when the output was captured;
    /// streamed runs leave them empty. A process killed by a signal reports
    /// `-1`.
    #[error("Command {} exited with code {code}{}", command_line(binary, args), stderr_suffix(stderr))]
    NonZeroExit {
        binary: String,
        args: Vec<String>,
        code: i32,
        stdout: String,
        stderr: String,
    },

    /// The context was done before or while the operation ran.
    ///
    /// `operation` names what was interrupted: the binary for subprocesses,
    /// the cache for callers waiting on an in-flight computation.
    #[error("{operation} interrupted: {reason}")]
    Canceled {
        operation: String,
        reason: CancelReason,
    },

    /// A cache key was reused with different key or value types.
    #[error("Cache {cache_key} already holds entries of a different type")]
    CacheTypeMismatch { cache_key: String },

    /// Git ran successfully but produced output that cannot be used.
    #[error("Git error: {message}")]
    Git { message: String },

    /// An error indicating that a mutex or other lock has been poisoned.
    #[error("Lock poisoned: {context}")]
    LockPoisoned { context: String },

    /// An I/O error, wrapped from `std::io::Error`.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

fn command_line(binary: &str, args: &[String]) -> String {
    std::iter::once(binary)
        .chain(args.iter().map(String::as_str))
        .collect::<Vec<_>>()
        .join(" ")
}

fn stderr_suffix(stderr: &str) -> String {
    let trimmed = stderr.trim();
    if trimmed.is_empty() {
        String::new()
    } else {
        format!(": {}", trimmed)
    }
}

impl Error {
    /// Returns true for errors caused by a canceled or expired context.
    pub fn is_canceled(&self) -> bool {
        matches!(self, Error::Canceled { .. })
    }

    /// Returns true when the binary itself could not be started.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound { .. })
    }

    /// The exit code of a failed subprocess, if this error carries one.
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            Error::NonZeroExit { code, .. } => Some(*code),
            _ => None,
        }
    }
}

/// A convenient type alias for `Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;
