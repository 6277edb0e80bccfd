//! # Provision Shell CLI
//!
//! This is the binary entry point for the `provision-shell` command-line tool.
//!
//! Its primary responsibilities are:
//! - Parsing command-line arguments using `clap`.
//! - Executing the appropriate command based on the parsed arguments.
//! - Translating library errors into process exit codes, so a wrapped binary's
//!   failure status reaches the caller unchanged.
//!
//! The core logic lives in the `lib.rs` library crate; the binary is a thin
//! wrapper around it.

mod cli;
mod commands;

use std::process::ExitCode;

use clap::Parser;
use provision_shell::error::Error;

/// Exit code used when a command was interrupted by cancellation or timeout.
const EXIT_INTERRUPTED: u8 = 130;

fn main() -> ExitCode {
    let cli = cli::Cli::parse();
    match cli.execute() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {:#}", err);
            match err.downcast_ref::<Error>() {
                Some(Error::NonZeroExit { code, .. }) => {
                    ExitCode::from(u8::try_from(*code).unwrap_or(1))
                }
                Some(Error::Canceled { .. }) => ExitCode::from(EXIT_INTERRUPTED),
                _ => ExitCode::FAILURE,
            }
        }
    }
}
