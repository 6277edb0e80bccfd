//! Interception of command execution through the context
//!
//! A hook is a function installed on a [`Context`] that sees every
//! [`Command`] the runner is about to execute with that context. It answers
//! with a [`HookOutcome`]: either let the real process run, or hand back a
//! substitute [`ExecutionResult`] that the runner treats exactly like the
//! result of a real run. Tests use this to fake binaries, dry runs use it to
//! skip side effects, and wrappers use it to redirect commands.
//!
//! The registry only stores and retrieves hooks. It never executes or caches
//! anything itself.

use std::fmt;
use std::sync::Arc;

use crate::context::Context;
use crate::runner::{Command, ExecutionResult};

const COMMAND_HOOK_KEY: &str = "provision-shell.command-hook";

/// What the runner should do with an intercepted command.
#[derive(Debug)]
pub enum HookOutcome {
    /// Spawn the real process.
    Proceed,
    /// Skip the process and use this result instead.
    Substitute(ExecutionResult),
}

/// An interception function for command execution.
pub type CommandHook = Arc<dyn Fn(&Context, &Command) -> HookOutcome + Send + Sync>;

/// The hook visible from a context.
#[derive(Clone)]
pub enum HookState {
    /// No hook was ever installed on this context or its ancestors.
    Unset,
    /// The nearest installation explicitly cleared interception.
    Cleared,
    /// A hook is installed.
    Installed(CommandHook),
}

impl HookState {
    /// The installed hook, if any.
    pub fn hook(&self) -> Option<&CommandHook> {
        match self {
            HookState::Installed(hook) => Some(hook),
            HookState::Unset | HookState::Cleared => None,
        }
    }

    /// Whether any hook slot is present, including an explicit clear.
    pub fn is_set(&self) -> bool {
        !matches!(self, HookState::Unset)
    }
}

impl fmt::Debug for HookState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HookState::Unset => write!(f, "Unset"),
            HookState::Cleared => write!(f, "Cleared"),
            HookState::Installed(_) => write!(f, "Installed(..)"),
        }
    }
}

struct HookSlot(Option<CommandHook>);

/// Derive a context that carries `hook`.
///
/// Passing `None` clears interception for the derived context and its
/// descendants, restoring real execution even if an ancestor installed a hook.
pub fn with_hook(ctx: &Context, hook: Option<CommandHook>) -> Context {
    ctx.with_value(COMMAND_HOOK_KEY, HookSlot(hook))
}

/// Retrieve the hook visible from `ctx`.
pub fn hook_from(ctx: &Context) -> HookState {
    match ctx.value::<HookSlot>(COMMAND_HOOK_KEY) {
        None => HookState::Unset,
        Some(slot) => match &slot.0 {
            None => HookState::Cleared,
            Some(hook) => HookState::Installed(Arc::clone(hook)),
        },
    }
}

/// Build a hook from a closure.
pub fn hook_fn<F>(f: F) -> CommandHook
where
    F: Fn(&Context, &Command) -> HookOutcome + Send + Sync + 'static,
{
    Arc::new(f)
}
