//! # Top-Level Command Implementation
//!
//! This module implements the `top-level` subcommand, which resolves the root
//! of the git working tree that contains a path.

use std::path::PathBuf;

use anyhow::{Context as _, Result};
use clap::Args;
use serde::Serialize;

use provision_shell::context::Context;
use provision_shell::git;
use provision_shell::options::RunOptions;

use super::OutputFormat;

/// Print the top-level directory of the git working tree containing a path
#[derive(Args, Debug)]
pub struct TopLevelArgs {
    /// Path inside the working tree. Defaults to the working directory.
    #[arg(value_name = "PATH")]
    pub path: Option<PathBuf>,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

#[derive(Serialize)]
struct TopLevelReport {
    path: PathBuf,
    top_level: PathBuf,
}

/// Execute the `top-level` command.
pub fn execute(ctx: &Context, options: &RunOptions, args: TopLevelArgs) -> Result<()> {
    let path = args
        .path
        .unwrap_or_else(|| options.working_dir.clone());
    let top_level = git::git_top_level_dir(ctx, options, &path)
        .with_context(|| format!("Failed to resolve git top-level directory of {}", path.display()))?;

    match args.format {
        OutputFormat::Text => println!("{}", top_level.display()),
        OutputFormat::Json => {
            let report = TopLevelReport { path, top_level };
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
    }
    Ok(())
}
