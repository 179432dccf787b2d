// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! External process execution under timeout and cancellation control.
//!
//! [`SystemExecutor`] spawns the command in its own process group, captures
//! stdout/stderr line by line, and races exit against the configured timeout
//! and a [`CancellationToken`]. Whichever fires first wins; timeout and
//! cancellation both kill the whole process group.

use std::collections::HashMap;
use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use async_trait::async_trait;
use kiln_core::{format_elapsed_ms, LogStream};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tokio_util::sync::CancellationToken;

/// Timeout applied when [`CommandOptions::timeout_ms`] is unset (5 minutes).
pub const DEFAULT_TIMEOUT_MS: i64 = 300_000;

/// Sentinel `timeout_ms` value that disables the timeout.
pub const NO_TIMEOUT: i64 = -1;

/// Malformed execution requests. Ordinary command failures are never errors;
/// they come back as a [`CommandResult`] with `success == false`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExecutorError {
    #[error("invalid timeout {0} ms: expected a non-negative value or -1 to disable")]
    InvalidTimeout(i64),
    #[error("empty command")]
    EmptyCommand,
}

/// Options for a single command execution.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandOptions {
    /// Timeout in ms; `None` means [`DEFAULT_TIMEOUT_MS`], `-1` disables it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<i64>,
    #[serde(default)]
    pub env: HashMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub working_directory: Option<PathBuf>,
    #[serde(default)]
    pub args: Vec<String>,
}

impl CommandOptions {
    pub fn new() -> Self {
        Self::default()
    }

    kiln_core::setters! {
        set {
            args: Vec<String>,
            env: HashMap<String, String>,
        }
        option {
            timeout_ms: i64,
            working_directory: PathBuf,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn env_var(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    pub fn no_timeout(self) -> Self {
        self.timeout_ms(NO_TIMEOUT)
    }

    /// The timeout to enforce, or `None` when disabled.
    pub fn effective_timeout(&self) -> Result<Option<Duration>, ExecutorError> {
        match self.timeout_ms.unwrap_or(DEFAULT_TIMEOUT_MS) {
            NO_TIMEOUT => Ok(None),
            ms if ms < 0 => Err(ExecutorError::InvalidTimeout(ms)),
            ms => Ok(Some(Duration::from_millis(ms as u64))),
        }
    }
}

/// Result of one command execution.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandResult {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,
    #[serde(default)]
    pub stdout: String,
    #[serde(default)]
    pub stderr: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CommandResult {
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self { success: true, exit_code: Some(0), stdout: stdout.into(), ..Default::default() }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self { success: false, error: Some(error.into()), ..Default::default() }
    }

    /// One-line failure description: the error, else the last stderr line.
    pub fn failure_reason(&self) -> String {
        if let Some(error) = &self.error {
            return error.clone();
        }
        match self.stderr.lines().rev().find(|l| !l.trim().is_empty()) {
            Some(line) => line.trim().to_string(),
            None => match self.exit_code {
                Some(code) => format!("exit code {}", code),
                None => "command failed".to_string(),
            },
        }
    }
}

/// Receives captured output lines as they are produced.
pub trait OutputSink: Send + Sync {
    fn line(&self, stream: LogStream, line: &str);
}

/// Sink that discards output.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl OutputSink for NullSink {
    fn line(&self, _stream: LogStream, _line: &str) {}
}

/// Runs one external command.
#[async_trait]
pub trait ProcessExecutor: Send + Sync + 'static {
    async fn execute(
        &self,
        command: &str,
        options: &CommandOptions,
        cancel: &CancellationToken,
        sink: &dyn OutputSink,
    ) -> Result<CommandResult, ExecutorError>;
}

/// [`ProcessExecutor`] backed by `tokio::process`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemExecutor;

enum Finish {
    Exited(std::io::Result<ExitStatus>),
    TimedOut(Duration),
    Cancelled,
}

#[async_trait]
impl ProcessExecutor for SystemExecutor {
    async fn execute(
        &self,
        command: &str,
        options: &CommandOptions,
        cancel: &CancellationToken,
        sink: &dyn OutputSink,
    ) -> Result<CommandResult, ExecutorError> {
        if command.trim().is_empty() {
            return Err(ExecutorError::EmptyCommand);
        }
        let timeout = options.effective_timeout()?;

        let mut cmd = Command::new(command);
        cmd.args(&options.args)
            .envs(&options.env)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = &options.working_directory {
            cmd.current_dir(dir);
        }
        #[cfg(unix)]
        cmd.process_group(0);

        tracing::debug!(
            command,
            args = ?options.args,
            timeout_ms = timeout.map(|t| t.as_millis() as u64),
            "spawning command"
        );

        let mut child = match cmd.spawn() {
            Ok(child) => child,
            Err(e) => {
                return Ok(CommandResult::failed(format!("failed to spawn `{}`: {}", command, e)));
            }
        };

        if cancel.is_cancelled() {
            terminate(&mut child, command).await;
            return Ok(CommandResult::failed(format!("command `{}` was cancelled", command)));
        }

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();
        let mut out = String::new();
        let mut err = String::new();

        let finish = {
            let run = async {
                let (_, _, status) = tokio::join!(
                    pump(stdout, LogStream::Stdout, &mut out, sink),
                    pump(stderr, LogStream::Stderr, &mut err, sink),
                    child.wait(),
                );
                status
            };
            tokio::select! {
                status = run => Finish::Exited(status),
                elapsed = deadline(timeout) => Finish::TimedOut(elapsed),
                _ = cancel.cancelled() => Finish::Cancelled,
            }
        };

        let result = match finish {
            Finish::Exited(Ok(status)) => {
                let exit_code = status.code();
                let error = (!status.success()).then(|| match exit_code {
                    Some(code) => format!("command `{}` exited with code {}", command, code),
                    None => format!("command `{}` was terminated by a signal", command),
                });
                CommandResult { success: status.success(), exit_code, stdout: out, stderr: err, error }
            }
            Finish::Exited(Err(e)) => CommandResult {
                stdout: out,
                stderr: err,
                ..CommandResult::failed(format!("failed to wait on `{}`: {}", command, e))
            },
            Finish::TimedOut(limit) => {
                let ms = limit.as_millis() as u64;
                tracing::warn!(command, timeout_ms = ms, "command timed out, killing");
                terminate(&mut child, command).await;
                CommandResult {
                    stdout: out,
                    stderr: err,
                    ..CommandResult::failed(format!(
                        "command `{}` timed out after {} ms ({})",
                        command,
                        ms,
                        format_elapsed_ms(ms)
                    ))
                }
            }
            Finish::Cancelled => {
                tracing::info!(command, "command cancelled, killing");
                terminate(&mut child, command).await;
                CommandResult {
                    stdout: out,
                    stderr: err,
                    ..CommandResult::failed(format!("command `{}` was cancelled", command))
                }
            }
        };
        Ok(result)
    }
}

/// Resolves after `timeout`, or never when there is none.
async fn deadline(timeout: Option<Duration>) -> Duration {
    match timeout {
        Some(limit) => {
            tokio::time::sleep(limit).await;
            limit
        }
        None => std::future::pending().await,
    }
}

/// Read lines until EOF, appending to `buf` and forwarding to `sink`.
async fn pump<R: AsyncRead + Unpin>(
    reader: Option<R>,
    stream: LogStream,
    buf: &mut String,
    sink: &dyn OutputSink,
) {
    let Some(reader) = reader else { return };
    let mut reader = BufReader::new(reader);
    let mut raw = Vec::new();
    loop {
        raw.clear();
        match reader.read_until(b'\n', &mut raw).await {
            Ok(0) => break,
            Ok(_) => {
                let line = String::from_utf8_lossy(&raw);
                let line = line.trim_end_matches(['\n', '\r']);
                sink.line(stream, line);
                buf.push_str(line);
                buf.push('\n');
            }
            Err(e) => {
                tracing::debug!(%stream, error = %e, "output read failed");
                break;
            }
        }
    }
}

/// Kill the process group (children included), then the child itself.
async fn terminate(child: &mut Child, command: &str) {
    #[cfg(unix)]
    if let Some(pid) = child.id().and_then(|pid| i32::try_from(pid).ok()) {
        use nix::sys::signal::{killpg, Signal};
        use nix::unistd::Pid;
        if let Err(e) = killpg(Pid::from_raw(pid), Signal::SIGKILL) {
            tracing::debug!(command, pid, error = %e, "killpg failed");
        }
    }
    if let Err(e) = child.kill().await {
        tracing::debug!(command, error = %e, "kill failed (process may have exited)");
    }
}

#[cfg(any(test, feature = "test-support"))]
#[cfg_attr(coverage_nightly, coverage(off))]
mod fake {
    use super::{CommandOptions, CommandResult, ExecutorError, OutputSink, ProcessExecutor};
    use async_trait::async_trait;
    use kiln_core::LogStream;
    use parking_lot::Mutex;
    use std::collections::HashMap;
    use std::sync::Arc;
    use tokio_util::sync::CancellationToken;

    /// Recorded execution
    #[derive(Debug, Clone)]
    pub struct ExecCall {
        pub command: String,
        pub options: CommandOptions,
    }

    #[derive(Debug, Clone)]
    enum Script {
        Respond(CommandResult),
        /// Block until cancelled
        Hang,
    }

    #[derive(Default)]
    struct FakeState {
        scripts: HashMap<String, Script>,
        calls: Vec<ExecCall>,
    }

    /// Scripted executor: unscripted commands succeed with empty output.
    #[derive(Clone, Default)]
    pub struct FakeExecutor {
        inner: Arc<Mutex<FakeState>>,
    }

    impl FakeExecutor {
        pub fn new() -> Self {
            Self::default()
        }

        /// Return `result` whenever `command` runs. Its stdout/stderr lines are
        /// forwarded to the sink.
        pub fn respond(&self, command: &str, result: CommandResult) {
            self.inner.lock().scripts.insert(command.to_string(), Script::Respond(result));
        }

        /// Fail `command` with the given error.
        pub fn fail(&self, command: &str, error: &str) {
            self.respond(command, CommandResult { exit_code: Some(1), ..CommandResult::failed(error) });
        }

        /// Make `command` run until cancelled.
        pub fn hang(&self, command: &str) {
            self.inner.lock().scripts.insert(command.to_string(), Script::Hang);
        }

        pub fn calls(&self) -> Vec<ExecCall> {
            self.inner.lock().calls.clone()
        }

        pub fn commands(&self) -> Vec<String> {
            self.inner.lock().calls.iter().map(|c| c.command.clone()).collect()
        }
    }

    #[async_trait]
    impl ProcessExecutor for FakeExecutor {
        async fn execute(
            &self,
            command: &str,
            options: &CommandOptions,
            cancel: &CancellationToken,
            sink: &dyn OutputSink,
        ) -> Result<CommandResult, ExecutorError> {
            options.effective_timeout()?;
            let script = {
                let mut inner = self.inner.lock();
                inner.calls.push(ExecCall { command: command.to_string(), options: options.clone() });
                inner.scripts.get(command).cloned()
            };
            match script {
                None => Ok(CommandResult::ok("")),
                Some(Script::Respond(result)) => {
                    for line in result.stdout.lines() {
                        sink.line(LogStream::Stdout, line);
                    }
                    for line in result.stderr.lines() {
                        sink.line(LogStream::Stderr, line);
                    }
                    Ok(result)
                }
                Some(Script::Hang) => {
                    cancel.cancelled().await;
                    Ok(CommandResult::failed(format!("command `{}` was cancelled", command)))
                }
            }
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
pub use fake::{ExecCall, FakeExecutor};

#[cfg(test)]
#[path = "process_tests.rs"]
mod tests;
