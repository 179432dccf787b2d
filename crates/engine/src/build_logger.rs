// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Append-only per-build activity logs.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use kiln_core::{format_utc_now, LogLine, LogStream, StepEvent, WorkflowEvent};

use crate::observer::{describe_step, MessageLog, StepObserver, WorkflowObserver};

/// Writes human-readable timestamped lines to `<log_dir>/build/<build_id>.log`.
///
/// Each append opens, writes, and closes the file. Write failures are
/// reported through tracing and never propagate.
#[derive(Debug, Clone)]
pub struct BuildLogger {
    log_dir: PathBuf,
}

impl BuildLogger {
    pub fn new(log_dir: PathBuf) -> Self {
        Self { log_dir }
    }

    pub fn log_dir(&self) -> &Path {
        &self.log_dir
    }

    pub fn path_for(&self, build_id: &str) -> PathBuf {
        self.log_dir.join("build").join(format!("{}.log", build_id))
    }

    /// Append `<timestamp> [<step>] <message>`.
    pub fn append(&self, build_id: &str, step: &str, message: &str) {
        let path = self.path_for(build_id);
        if let Err(e) = write_line(&path, step, message) {
            tracing::warn!(build_id, error = %e, "failed to write build log");
        }
    }

    /// Observer bound to one build.
    pub fn for_build(&self, build_id: impl Into<String>) -> BuildLogFile {
        BuildLogFile { logger: self.clone(), build_id: build_id.into() }
    }
}

fn write_line(path: &Path, step: &str, message: &str) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    let ts = format_utc_now();
    for line in message.lines() {
        writeln!(file, "{} [{}] {}", ts, step, line)?;
    }
    Ok(())
}

/// [`BuildLogger`] observing a single build's run.
#[derive(Debug, Clone)]
pub struct BuildLogFile {
    logger: BuildLogger,
    build_id: String,
}

impl MessageLog for BuildLogFile {
    fn message(&self, line: &LogLine) {
        let step = line.step.as_deref().unwrap_or("build");
        let message = match line.stream {
            LogStream::Stderr => format!("stderr: {}", line.message),
            _ => line.message.clone(),
        };
        self.logger.append(&self.build_id, step, &message);
    }
}

impl StepObserver for BuildLogFile {
    fn on_step(&self, event: &StepEvent) {
        self.logger.append(&self.build_id, event.name(), &describe_step(event));
    }
}

impl WorkflowObserver for BuildLogFile {
    fn on_workflow(&self, event: &WorkflowEvent) {
        let message = match event {
            WorkflowEvent::Started { total_steps } => format!("workflow started ({} steps)", total_steps),
            WorkflowEvent::Completed { outcome, completed, failed, skipped, .. } => format!(
                "workflow {} (completed {}, failed {}, skipped {})",
                outcome, completed, failed, skipped
            ),
        };
        self.logger.append(&self.build_id, "build", &message);
    }
}

#[cfg(test)]
#[path = "build_logger_tests.rs"]
mod tests;
