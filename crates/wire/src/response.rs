// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use kiln_core::{Build, BuildId, BuildStatus, LogEntry};
use serde::{Deserialize, Serialize};

use super::{BuildSummary, SweepSummary};

/// Response from daemon to CLI
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum Response {
    /// Health check response
    Pong,

    /// Daemon is shutting down
    ShuttingDown,

    /// Error response
    Error { message: String },

    /// Build queued
    Triggered { id: BuildId },

    /// Retry queued as a new build
    Retried { id: BuildId, retry_of: BuildId },

    /// Cancel accepted. `Running` means the build is being stopped and
    /// reaches `Cancelled` once its current step exits.
    Cancelled { id: BuildId, status: BuildStatus },

    /// Catch-up result: stored entries plus the build's status
    Logs {
        entries: Vec<LogEntry>,
        status: BuildStatus,
        is_complete: bool,
    },

    /// One live entry on a follow stream
    Entry { entry: LogEntry },

    /// End of a follow stream
    Done { status: BuildStatus },

    /// Single build details
    Build { build: Box<Build> },

    /// List of builds
    Builds { builds: Vec<BuildSummary> },

    /// Artifact sweep counters
    Swept { report: SweepSummary },
}

#[cfg(test)]
#[path = "response_tests.rs"]
mod tests;
