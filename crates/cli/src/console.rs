// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Human-readable run output for `kiln run`.

use std::io::Write;

use kiln_core::{format_elapsed_ms, LogLevel, LogLine, LogStream, StepEvent, WorkflowEvent};
use kiln_engine::{describe_step, MessageLog, StepObserver, WorkflowObserver};
use parking_lot::Mutex;

use crate::color;

/// Writes run activity to a terminal (or any writer).
///
/// Process output is indented under its step; step and workflow events are
/// one line each.
pub struct ConsoleLogger<W: Write + Send> {
    out: Mutex<W>,
}

impl ConsoleLogger<std::io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }
}

impl<W: Write + Send> ConsoleLogger<W> {
    pub fn new(out: W) -> Self {
        Self { out: Mutex::new(out) }
    }

    #[cfg(test)]
    pub fn into_inner(self) -> W {
        self.out.into_inner()
    }

    fn write_line(&self, line: &str) {
        let mut out = self.out.lock();
        // Broken pipes (e.g. `kiln run | head`) must not abort the build
        let _ = writeln!(out, "{}", line);
        let _ = out.flush();
    }
}

impl<W: Write + Send> MessageLog for ConsoleLogger<W> {
    fn message(&self, line: &LogLine) {
        let text = match (line.stream, line.level) {
            (LogStream::Stdout, _) => format!("    {}", line.message),
            (LogStream::Stderr, _) => format!("    {}", color::context(&line.message)),
            (LogStream::System, LogLevel::Warn | LogLevel::Error) => {
                format!("  {}: {}", line.level, line.message)
            }
            (LogStream::System, _) => format!("  {}", line.message),
        };
        self.write_line(&text);
    }
}

impl<W: Write + Send> StepObserver for ConsoleLogger<W> {
    fn on_step(&self, event: &StepEvent) {
        let marker = match event {
            StepEvent::Started { .. } => "▸",
            StepEvent::Completed { .. } => "✓",
            StepEvent::Failed { .. } => "✗",
            StepEvent::Cancelled { .. } | StepEvent::Skipped { .. } => "-",
        };
        self.write_line(&format!("{} {}", marker, describe_step(event)));
    }
}

impl<W: Write + Send> WorkflowObserver for ConsoleLogger<W> {
    fn on_workflow(&self, event: &WorkflowEvent) {
        let line = match event {
            WorkflowEvent::Started { total_steps } => {
                color::header(&format!("running {} step(s)", total_steps))
            }
            WorkflowEvent::Completed { outcome, completed, failed, skipped, elapsed_ms } => {
                format!(
                    "{} in {} ({} completed, {} failed, {} skipped)",
                    color::header(&format!("workflow {}", outcome)),
                    format_elapsed_ms(*elapsed_ms),
                    completed,
                    failed,
                    skipped
                )
            }
        };
        self.write_line(&line);
    }
}

#[cfg(test)]
#[path = "console_tests.rs"]
mod tests;
