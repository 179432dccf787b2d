// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Request from CLI to daemon
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum Request {
    /// Health check ping
    Ping,

    /// Queue a build of the given plan file
    Trigger {
        /// Absolute path to the plan file
        plan: PathBuf,
        #[serde(default)]
        profiles: Vec<String>,
        /// Free-form origin label
        #[serde(default)]
        source: String,
    },

    /// Cancel a queued or running build (ID or unique prefix)
    Cancel { id: String },

    /// Queue a new build with the trigger of a finished one
    Retry { id: String },

    /// One page of stored log entries after a sequence number. Ask again
    /// from the last sequence received until a page comes back complete
    /// or empty.
    GetLogs {
        id: String,
        #[serde(default)]
        after: u64,
    },

    /// Catch up, then stream live entries until the build completes.
    ///
    /// The daemon answers with `Logs` holding the first page of the
    /// backlog, then zero or more `Entry` frames, then `Done`.
    Follow {
        id: String,
        #[serde(default)]
        after: u64,
    },

    /// Single build details
    Status { id: String },

    /// All builds, newest first
    List,

    /// Run an artifact sweep now
    Sweep,

    /// Request daemon shutdown
    Shutdown,
}

#[cfg(test)]
#[path = "request_tests.rs"]
mod tests;
