//! Version-control queries built on the command runner
//!
//! Everything here shells out to the configured git binary through
//! [`run_shell_command_with_output`], so hooks installed on the context
//! intercept these calls like any other command.

use std::path::{Path, PathBuf};

use crate::cache;
use crate::context::Context;
use crate::error::{Error, Result};
use crate::options::RunOptions;
use crate::runner::run_shell_command_with_output;
use crate::version::highest_tag;

/// Cache key under which command results are memoized in a context.
pub const RUN_CMD_CACHE_KEY: &str = "provision-shell.run-cmd";

/// Resolve the top-level directory of the git working tree containing `path`.
///
/// A relative `path` is taken relative to `options.working_dir`. Results are
/// cached per resolved directory in the context's cache scope: repeated and
/// concurrent calls for one directory under contexts sharing that scope run
/// git at most once. Errors from the runner are returned unchanged and are not
/// cached.
pub fn git_top_level_dir(ctx: &Context, options: &RunOptions, path: &Path) -> Result<PathBuf> {
    let dir = resolve_dir(options, path);
    let top_level: String = cache::get_or_compute(ctx, RUN_CMD_CACHE_KEY, dir.clone(), || {
        let mut options = options.clone();
        options.working_dir = dir.clone();

        let result = run_shell_command_with_output(
            ctx,
            &options,
            &options.git_binary,
            &["rev-parse", "--show-toplevel"],
            true,
        )?;

        let top_level = result.stdout_lossy().trim().to_string();
        if top_level.is_empty() {
            return Err(Error::Git {
                message: format!(
                    "rev-parse --show-toplevel printed nothing for {}",
                    path.display()
                ),
            });
        }
        Ok(top_level)
    })?;
    Ok(PathBuf::from(top_level))
}

fn resolve_dir(options: &RunOptions, path: &Path) -> PathBuf {
    if path.is_relative() {
        options.working_dir.join(path)
    } else {
        path.to_path_buf()
    }
}

/// List the tag references of a remote repository.
///
/// Git ls-remote output format: `<hash>\t<ref>`; the ref column is returned
/// as-is (e.g. `refs/tags/v1.0.0`). Lines of any other shape are skipped.
pub fn git_repo_tags(ctx: &Context, options: &RunOptions, repo_url: &str) -> Result<Vec<String>> {
    let result = run_shell_command_with_output(
        ctx,
        options,
        &options.git_binary,
        &["ls-remote", "--tags", repo_url],
        true,
    )?;

    Ok(result
        .stdout_lossy()
        .lines()
        .filter_map(|line| match line.split('\t').collect::<Vec<_>>().as_slice() {
            [_, reference] => Some(reference.to_string()),
            _ => None,
        })
        .collect())
}

/// Return the highest release tag of a remote repository, if it has any.
pub fn git_last_release_tag(ctx: &Context, options: &RunOptions, repo_url: &str) -> Result<Option<String>> {
    let tags = git_repo_tags(ctx, options, repo_url)?;
    Ok(highest_tag(&tags))
}
