//! # Latest Tag Command Implementation
//!
//! This module implements the `latest-tag` subcommand, which lists the tags of
//! a git repository and prints the highest `vMAJOR.MINOR.PATCH` release among
//! them. A repository without release tags is not an error: nothing is printed
//! in text mode and `null` is reported in JSON mode.

use anyhow::{Context as _, Result};
use clap::Args;
use serde::Serialize;

use provision_shell::context::Context;
use provision_shell::git;
use provision_shell::options::RunOptions;

use super::OutputFormat;

/// Print the highest release tag of a git repository
#[derive(Args, Debug)]
pub struct LatestTagArgs {
    /// Repository URL or local path, as accepted by `git ls-remote`
    #[arg(value_name = "REPO")]
    pub repo: String,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

#[derive(Serialize)]
struct LatestTagReport<'a> {
    repo: &'a str,
    latest_tag: Option<String>,
}

/// Execute the `latest-tag` command.
pub fn execute(ctx: &Context, options: &RunOptions, args: LatestTagArgs) -> Result<()> {
    let latest_tag = git::git_last_release_tag(ctx, options, &args.repo)
        .with_context(|| format!("Failed to list tags of {}", args.repo))?;

    match args.format {
        OutputFormat::Text => {
            if let Some(tag) = &latest_tag {
                println!("{}", tag);
            }
        }
        OutputFormat::Json => {
            let report = LatestTagReport {
                repo: &args.repo,
                latest_tag,
            };
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
    }
    Ok(())
}
