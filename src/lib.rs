//! # Provision Shell Library
//!
//! This library is the subprocess-execution layer of an
//! infrastructure-provisioning CLI wrapper. It runs the wrapped provisioning
//! binary and auxiliary `git` commands, routes their output, memoizes
//! expensive idempotent queries, lets tests and dry runs intercept execution,
//! and picks the newest release tag from a list of references.
//!
//! ## Quick Example
//!
//! ```
//! use provision_shell::context::Context;
//! use provision_shell::hook::{self, HookOutcome};
//! use provision_shell::options::RunOptions;
//! use provision_shell::output::SharedBuffer;
//! use provision_shell::runner::{self, ExecutionResult};
//!
//! // Intercept every command run with this context.
//! let ctx = hook::with_hook(
//!     &Context::background(),
//!     Some(hook::hook_fn(|_, _| {
//!         HookOutcome::Substitute(ExecutionResult::with_stdout("Terraform v1.9.0\n"))
//!     })),
//! );
//!
//! let stdout = SharedBuffer::new();
//! let options = RunOptions::new(".").with_writer(stdout.sink());
//! runner::run_shell_command(&ctx, &options, "terraform", &["--version"]).unwrap();
//! assert!(stdout.to_string_lossy().contains("Terraform"));
//!
//! // Pick the newest release from a tag listing.
//! let tags = ["refs/tags/v0.10.0", "refs/tags/v20.1.2", "refs/tags/v0.3.1"];
//! assert_eq!(provision_shell::version::highest_tag(&tags).as_deref(), Some("v20.1.2"));
//! ```
//!
//! ## Core Concepts
//!
//! - **Context (`context`)**: an immutable, derivable carrier of request-scoped
//!   values, cancellation and cache scope. All state in this crate travels
//!   through it; nothing is global.
//! - **Hooks (`hook`)**: functions installed on a context that may replace
//!   real process execution with a substitute result.
//! - **Runner (`runner`)**: spawns processes with an explicit working
//!   directory and environment, routes output to sinks (`output`), and kills
//!   children whose context is canceled.
//! - **Expensive-call cache (`cache`)**: single-flight memoization scoped to a
//!   context.
//! - **Git (`git`)**: cached top-level directory lookup and remote tag
//!   listing.
//! - **Versions (`version`)**: release tag parsing and selection.

pub mod cache;
pub mod context;
pub mod defaults;
pub mod error;
pub mod git;
pub mod hook;
pub mod options;
pub mod output;
pub mod runner;
pub mod version;

#[cfg(test)]
mod version_proptest;
