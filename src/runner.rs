//! # Command Runner
//!
//! This module executes external binaries on behalf of the wrapper. Every run
//! goes through one path:
//!
//! 1. A [`Command`] is built from the caller's [`RunOptions`]: working
//!    directory, environment and output sinks all come from there.
//! 2. If the context is already done, the run fails with `Error::Canceled`
//!    without spawning anything.
//! 3. The hook installed on the context, if any, decides whether the real
//!    process runs or a substitute [`ExecutionResult`] is used.
//! 4. The exit code of whichever result came back is checked, so a substitute
//!    fails exactly like a real process with the same code would.
//!
//! ## Output routing
//!
//! - No sinks configured: the child inherits the process's stdout and stderr.
//! - One or two distinct sinks: each configured stream is piped and copied into
//!   its sink by a dedicated thread.
//! - The same sink for both: stdout and stderr share one pipe, so the sink
//!   sees the bytes in the order the child wrote them.
//!
//! ## Cancellation
//!
//! While the child runs, the runner polls it and the context. When the context
//! is canceled or its deadline passes, the child is killed and reaped before
//! `Error::Canceled` is returned. On Unix, a child run under a cancelable
//! context leads its own process group and the whole group is killed, so
//! processes it started in the background go with it. Output copier threads
//! are joined before any return.

use std::collections::BTreeMap;
use std::io::{self, Read, Write};
use std::path::PathBuf;
use std::process::{Child, Command as StdCommand, ExitStatus, Stdio};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use log::{debug, warn};

use crate::context::Context;
use crate::error::{Error, Result};
use crate::hook::{hook_from, HookOutcome};
use crate::options::RunOptions;
use crate::output::{OutputSink, SharedBuffer};

/// How often a running child and its context are checked.
const CHILD_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// A fully described invocation of an external binary.
#[derive(Debug, Clone)]
pub struct Command {
    /// Binary name, resolved through the `PATH` in `env`.
    pub binary: String,
    /// Arguments, in order.
    pub args: Vec<String>,
    /// Directory the process starts in.
    pub working_dir: PathBuf,
    /// Complete environment of the process.
    pub env: BTreeMap<String, String>,
    /// Destination of stdout; `None` inherits the process's stdout.
    pub stdout: Option<OutputSink>,
    /// Destination of stderr; `None` inherits the process's stderr.
    pub stderr: Option<OutputSink>,
}

impl Command {
    /// Build a command from run options.
    pub fn from_options<S>(options: &RunOptions, binary: &str, args: &[S]) -> Self
    where
        S: AsRef<str>,
    {
        Self {
            binary: binary.to_string(),
            args: args.iter().map(|arg| arg.as_ref().to_string()).collect(),
            working_dir: options.working_dir.clone(),
            env: options.env.clone(),
            stdout: options.writer.clone(),
            stderr: options.err_writer.clone(),
        }
    }

    /// The binary and its arguments joined by spaces, for display.
    pub fn command_line(&self) -> String {
        std::iter::once(self.binary.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Outcome of one execution.
///
/// Output fields hold bytes only when they were captured; results of streamed
/// runs leave them empty because the bytes went to the sinks.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutionResult {
    /// Exit code; `-1` when the process was terminated by a signal.
    pub exit_code: i32,
    /// Captured standard output.
    pub stdout: Vec<u8>,
    /// Captured standard error.
    pub stderr: Vec<u8>,
}

impl ExecutionResult {
    /// A successful result without output.
    pub fn success() -> Self {
        Self::default()
    }

    /// A successful result that prints `stdout`.
    pub fn with_stdout(stdout: impl Into<Vec<u8>>) -> Self {
        Self {
            stdout: stdout.into(),
            ..Self::default()
        }
    }

    /// A result with the given exit code and no output.
    pub fn with_exit_code(exit_code: i32) -> Self {
        Self {
            exit_code,
            ..Self::default()
        }
    }

    /// Whether the exit code is zero.
    pub fn is_success(&self) -> bool {
        self.exit_code == 0
    }

    /// Standard output decoded lossily as UTF-8.
    pub fn stdout_lossy(&self) -> String {
        String::from_utf8_lossy(&self.stdout).into_owned()
    }

    /// Standard error decoded lossily as UTF-8.
    pub fn stderr_lossy(&self) -> String {
        String::from_utf8_lossy(&self.stderr).into_owned()
    }
}

/// Run `binary` with `args`, streaming its output to the sinks in `options`.
///
/// # Errors
///
/// - `Error::NotFound` if the binary cannot be started.
/// - `Error::NonZeroExit` if it exits with a non-zero code.
/// - `Error::Canceled` if `ctx` is done before or while it runs.
pub fn run_shell_command<S>(ctx: &Context, options: &RunOptions, binary: &str, args: &[S]) -> Result<()>
where
    S: AsRef<str>,
{
    let command = Command::from_options(options, binary, args);
    run_command(ctx, &command).map(|_| ())
}

/// Run `binary` with `args` and capture its output.
///
/// Captured bytes are also forwarded to the configured sinks (or the
/// process's own streams when unset). `suppress_stdout` stops stdout from
/// being forwarded; stderr is always forwarded. A `NonZeroExit` error carries
/// the captured output.
///
/// Each stream is captured through its own pipe, even when `writer` and
/// `err_writer` are the same sink. The forwarded output then keeps the order
/// within each stream but not the interleaving between them; use
/// [`run_shell_command`] with one shared sink when that order matters.
pub fn run_shell_command_with_output<S>(
    ctx: &Context,
    options: &RunOptions,
    binary: &str,
    args: &[S],
    suppress_stdout: bool,
) -> Result<ExecutionResult>
where
    S: AsRef<str>,
{
    let stdout = SharedBuffer::new();
    let stderr = SharedBuffer::new();

    let mut command = Command::from_options(options, binary, args);
    command.stdout = Some(if suppress_stdout {
        stdout.sink()
    } else {
        let forward = options.writer.clone().unwrap_or_else(OutputSink::stdout);
        OutputSink::tee(stdout.sink(), forward)
    });
    let forward = options.err_writer.clone().unwrap_or_else(OutputSink::stderr);
    command.stderr = Some(OutputSink::tee(stderr.sink(), forward));

    let mut result = execute(ctx, &command)?;
    result.stdout = stdout.contents();
    result.stderr = stderr.contents();
    check_exit(&command, result)
}

/// Run a prepared command, streaming its output to the command's sinks.
pub fn run_command(ctx: &Context, command: &Command) -> Result<ExecutionResult> {
    let result = execute(ctx, command)?;
    check_exit(command, result)
}

/// Hook-or-spawn, without judging the exit code.
fn execute(ctx: &Context, command: &Command) -> Result<ExecutionResult> {
    if let Some(reason) = ctx.err() {
        return Err(Error::Canceled {
            operation: command.binary.clone(),
            reason,
        });
    }

    let outcome = match hook_from(ctx).hook() {
        Some(hook) => hook(ctx, command),
        None => HookOutcome::Proceed,
    };

    match outcome {
        HookOutcome::Substitute(result) => {
            debug!("Command hook intercepted: {}", command.command_line());
            replay(command, result)
        }
        HookOutcome::Proceed => spawn_and_wait(ctx, command),
    }
}

/// Deliver a substitute result's output the way a real process would have.
fn replay(command: &Command, result: ExecutionResult) -> Result<ExecutionResult> {
    let mut stdout = command.stdout.clone().unwrap_or_else(OutputSink::stdout);
    let mut stderr = command.stderr.clone().unwrap_or_else(OutputSink::stderr);
    if !result.stdout.is_empty() {
        stdout.write_all(&result.stdout)?;
        stdout.flush()?;
    }
    if !result.stderr.is_empty() {
        stderr.write_all(&result.stderr)?;
        stderr.flush()?;
    }
    Ok(ExecutionResult::with_exit_code(result.exit_code))
}

fn check_exit(command: &Command, result: ExecutionResult) -> Result<ExecutionResult> {
    if result.is_success() {
        return Ok(result);
    }
    Err(Error::NonZeroExit {
        binary: command.binary.clone(),
        args: command.args.clone(),
        code: result.exit_code,
        stdout: result.stdout_lossy(),
        stderr: result.stderr_lossy(),
    })
}

type Copier = JoinHandle<io::Result<u64>>;

fn spawn_copier<R>(mut source: R, mut sink: OutputSink) -> Copier
where
    R: Read + Send + 'static,
{
    thread::spawn(move || {
        let copied = io::copy(&mut source, &mut sink)?;
        sink.flush()?;
        Ok(copied)
    })
}

fn spawn_and_wait(ctx: &Context, command: &Command) -> Result<ExecutionResult> {
    debug!(
        "Running command: {} (working dir: {})",
        command.command_line(),
        command.working_dir.display()
    );

    if !command.working_dir.is_dir() {
        return Err(Error::Io(io::Error::new(
            io::ErrorKind::NotFound,
            format!(
                "working directory {} does not exist",
                command.working_dir.display()
            ),
        )));
    }

    let mut process = StdCommand::new(&command.binary);
    process
        .args(&command.args)
        .current_dir(&command.working_dir)
        .env_clear()
        .envs(&command.env);

    // A cancelable run gets its own process group so cancellation reaches
    // everything the child started. Uncancelable runs stay in the caller's
    // group and keep terminal job control.
    let own_group = cfg!(unix) && ctx.is_cancelable();
    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        if own_group {
            process.process_group(0);
        }
    }

    let mut copiers = Vec::new();
    let mut child = match (&command.stdout, &command.stderr) {
        (Some(stdout), Some(stderr)) if stdout.same_as(stderr) => {
            let (reader, writer) = io::pipe()?;
            process.stdout(writer.try_clone()?).stderr(writer);
            let child = spawn(&mut process, &command.binary);
            // Close our copies of the write end so the reader sees EOF.
            drop(process);
            let child = child?;
            copiers.push(spawn_copier(reader, stdout.clone()));
            child
        }
        (stdout, stderr) => {
            process
                .stdout(if stdout.is_some() { Stdio::piped() } else { Stdio::inherit() })
                .stderr(if stderr.is_some() { Stdio::piped() } else { Stdio::inherit() });
            let mut child = spawn(&mut process, &command.binary)?;
            if let (Some(sink), Some(pipe)) = (stdout, child.stdout.take()) {
                copiers.push(spawn_copier(pipe, sink.clone()));
            }
            if let (Some(sink), Some(pipe)) = (stderr, child.stderr.take()) {
                copiers.push(spawn_copier(pipe, sink.clone()));
            }
            child
        }
    };

    let waited = wait_or_kill(ctx, command, &mut child, own_group);
    // Joined on every path, so no output reaches the sinks after we return.
    let copied = join_copiers(copiers);
    let status = waited?;
    copied?;

    Ok(ExecutionResult::with_exit_code(exit_code(status)))
}

fn join_copiers(copiers: Vec<Copier>) -> Result<()> {
    let mut result = Ok(());
    for copier in copiers {
        let joined = copier
            .join()
            .map_err(|_| Error::Io(io::Error::other("output copier thread panicked")))
            .and_then(|copied| copied.map(|_| ()).map_err(Error::Io));
        if result.is_ok() {
            result = joined;
        }
    }
    result
}

fn spawn(process: &mut StdCommand, binary: &str) -> Result<Child> {
    process.spawn().map_err(|source| match source.kind() {
        io::ErrorKind::NotFound | io::ErrorKind::PermissionDenied => Error::NotFound {
            binary: binary.to_string(),
            source,
        },
        _ => Error::Io(source),
    })
}

fn wait_or_kill(ctx: &Context, command: &Command, child: &mut Child, own_group: bool) -> Result<ExitStatus> {
    loop {
        match child.try_wait() {
            Ok(Some(status)) => return Ok(status),
            Ok(None) => {}
            Err(e) => {
                warn!("Failed to poll child process {}: {}", child.id(), e);
                terminate(child, own_group);
                return Err(Error::Io(e));
            }
        }
        if let Some(reason) = ctx.err() {
            debug!(
                "{}, killing {} (PID: {})",
                reason,
                command.binary,
                child.id()
            );
            terminate(child, own_group);
            return Err(Error::Canceled {
                operation: command.binary.clone(),
                reason,
            });
        }
        thread::sleep(CHILD_POLL_INTERVAL);
    }
}

/// Kill the child (and its process group when it leads one), then reap it.
fn terminate(child: &mut Child, own_group: bool) {
    if !(own_group && kill_group(child)) {
        if let Err(e) = child.kill() {
            warn!("Failed to kill child process {}: {}", child.id(), e);
        }
    }
    // Reap the child so it does not linger as a zombie.
    if let Err(e) = child.wait() {
        warn!("Failed to reap child process {}: {}", child.id(), e);
    }
}

#[cfg(unix)]
fn kill_group(child: &Child) -> bool {
    use nix::sys::signal::{killpg, Signal};
    use nix::unistd::Pid;

    let Ok(pgid) = i32::try_from(child.id()) else {
        return false;
    };
    match killpg(Pid::from_raw(pgid), Signal::SIGKILL) {
        Ok(()) => true,
        Err(e) => {
            debug!("Failed to kill process group {}: {}", pgid, e);
            false
        }
    }
}

#[cfg(not(unix))]
fn kill_group(_child: &Child) -> bool {
    false
}

fn exit_code(status: ExitStatus) -> i32 {
    status.code().unwrap_or(-1)
}
