//! # Run Command Implementation
//!
//! This module implements the `run` subcommand, which executes an arbitrary
//! binary through the library's command runner. Output is streamed to the
//! terminal and the binary's exit code becomes the exit code of
//! `provision-shell`.

use anyhow::Result;
use clap::Args;

use provision_shell::context::Context;
use provision_shell::options::RunOptions;
use provision_shell::runner;

/// Run a binary, streaming its output
#[derive(Args, Debug)]
pub struct RunArgs {
    /// The binary to run, looked up on PATH
    #[arg(value_name = "BINARY")]
    pub binary: String,

    /// Arguments passed to the binary unchanged
    #[arg(value_name = "ARGS", trailing_var_arg = true, allow_hyphen_values = true)]
    pub args: Vec<String>,
}

/// Execute the `run` command.
pub fn execute(ctx: &Context, options: &RunOptions, args: RunArgs) -> Result<()> {
    runner::run_shell_command(ctx, options, &args.binary, &args.args)?;
    Ok(())
}
