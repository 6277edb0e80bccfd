//! CLI argument parsing and command dispatch

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use clap::{Parser, Subcommand};
use log::LevelFilter;

use provision_shell::context::Context;
use provision_shell::defaults;
use provision_shell::options::RunOptions;

use crate::commands;

/// Provision Shell - run provisioning tools and git queries as subprocesses
#[derive(Parser, Debug)]
#[command(name = "provision-shell")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,

    /// Set log level (error, warn, info, debug, trace)
    #[arg(long, global = true, value_name = "LEVEL", default_value = "info")]
    log_level: String,

    /// Directory commands run in. Defaults to the current directory.
    #[arg(long, global = true, value_name = "DIR", env = defaults::WORKING_DIR_ENV)]
    working_dir: Option<PathBuf>,

    /// Git binary used for version-control queries
    #[arg(
        long,
        global = true,
        value_name = "BIN",
        env = defaults::GIT_BINARY_ENV,
        default_value = defaults::DEFAULT_GIT_BINARY
    )]
    git: String,

    /// Abort running commands after this many seconds
    #[arg(long, global = true, value_name = "SECONDS")]
    timeout: Option<u64>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run a binary, streaming its output
    Run(commands::run::RunArgs),

    /// Print the top-level directory of the git working tree containing a path
    TopLevel(commands::top_level::TopLevelArgs),

    /// Print the highest release tag of a git repository
    LatestTag(commands::latest_tag::LatestTagArgs),
}

impl Cli {
    /// Execute the CLI command
    pub fn execute(self) -> Result<()> {
        init_logging(&self.log_level);
        log::debug!("CLI args parsed: {:?}", self);

        let ctx = self.context();
        let options = self.run_options();

        match self.command {
            Commands::Run(args) => commands::run::execute(&ctx, &options, args),
            Commands::TopLevel(args) => commands::top_level::execute(&ctx, &options, args),
            Commands::LatestTag(args) => commands::latest_tag::execute(&ctx, &options, args),
        }
    }

    fn context(&self) -> Context {
        let ctx = Context::background();
        match self.timeout {
            Some(seconds) => ctx.with_timeout(Duration::from_secs(seconds)),
            None => ctx,
        }
    }

    fn run_options(&self) -> RunOptions {
        let working_dir = self
            .working_dir
            .clone()
            .unwrap_or_else(defaults::default_working_dir);
        RunOptions::new(working_dir).with_git_binary(self.git.clone())
    }
}

/// Initialize `env_logger` at `level`; `RUST_LOG` still overrides it.
///
/// Returns whether this call installed the logger. A logger can only be
/// installed once per process, so a failure is reported and logging carries
/// on with whichever logger is already in place.
fn init_logging(level: &str) -> bool {
    let filter = level.parse::<LevelFilter>().unwrap_or(LevelFilter::Info);
    match env_logger::Builder::new()
        .filter_level(filter)
        .parse_default_env()
        .format_timestamp(None)
        .try_init()
    {
        Ok(()) => true,
        Err(e) => {
            eprintln!("Warning: failed to initialize logging: {}", e);
            false
        }
    }
}
