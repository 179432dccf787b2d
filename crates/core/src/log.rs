// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Build log entries.

use crate::build::BuildId;
use serde::{Deserialize, Serialize};

crate::define_id! {
    /// Unique identifier for a stored log entry.
    pub struct LogEntryId("log-");
}

/// Where a log line came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogStream {
    Stdout,
    Stderr,
    System,
}

crate::simple_display! {
    LogStream {
        Stdout => "stdout",
        Stderr => "stderr",
        System => "system",
    }
}

/// Severity of a log line. Process output is always `Info` (stdout) or
/// `Warn` (stderr); log steps choose their own level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogLevel {
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

crate::simple_display! {
    LogLevel {
        Debug => "debug",
        Info => "info",
        Warn => "warn",
        Error => "error",
    }
}

/// A log line before it has been sequenced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogLine {
    pub stream: LogStream,
    pub level: LogLevel,
    pub message: String,
    pub step: Option<String>,
}

impl LogLine {
    pub fn system(level: LogLevel, message: impl Into<String>) -> Self {
        Self { stream: LogStream::System, level, message: message.into(), step: None }
    }

    pub fn output(stream: LogStream, message: impl Into<String>) -> Self {
        let level = if stream == LogStream::Stderr { LogLevel::Warn } else { LogLevel::Info };
        Self { stream, level, message: message.into(), step: None }
    }

    pub fn with_step(mut self, step: impl Into<String>) -> Self {
        self.step = Some(step.into());
        self
    }
}

/// A sequenced, append-only log entry for one build.
///
/// `sequence` starts at 1 and is the only ordering key; `timestamp_ms` is
/// informational.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub id: LogEntryId,
    pub build_id: BuildId,
    pub sequence: u64,
    pub stream: LogStream,
    #[serde(default)]
    pub level: LogLevel,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step: Option<String>,
    pub timestamp_ms: u64,
}

impl LogEntry {
    pub fn from_line(build_id: BuildId, sequence: u64, line: LogLine, timestamp_ms: u64) -> Self {
        Self {
            id: LogEntryId::new(),
            build_id,
            sequence,
            stream: line.stream,
            level: line.level,
            message: line.message,
            step: line.step,
            timestamp_ms,
        }
    }
}
