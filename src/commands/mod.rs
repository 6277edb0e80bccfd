//! # CLI Command Implementations
//!
//! Each subcommand of the `provision-shell` tool lives in its own file and
//! contains:
//! - An `Args` struct that defines the command-specific arguments and options,
//!   derived using `clap`.
//! - An `execute` function that takes the shared context and run options plus
//!   the parsed `Args`, and calls into the `provision_shell` library.

pub mod latest_tag;
pub mod run;
pub mod top_level;

use clap::ValueEnum;

/// How query results are printed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Bare value on a single line
    #[default]
    Text,
    /// A JSON object
    Json,
}
