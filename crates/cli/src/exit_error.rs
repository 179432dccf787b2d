// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error type that carries a process exit code.
//!
//! Commands return `ExitError` instead of calling `std::process::exit()`
//! so `main()` owns process termination.

use std::fmt;

use kiln_core::BuildStatus;

#[derive(Debug)]
pub struct ExitError {
    pub code: i32,
    pub message: String,
}

impl ExitError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self { code, message: message.into() }
    }

    /// Exit for a build that finished without succeeding.
    pub fn for_status(status: BuildStatus, message: impl Into<String>) -> Self {
        Self::new(status_code(status), message)
    }
}

/// Process exit code reported for a finished build.
pub fn status_code(status: BuildStatus) -> i32 {
    match status {
        BuildStatus::Succeeded | BuildStatus::Queued | BuildStatus::Running => 0,
        BuildStatus::Failed => 1,
        BuildStatus::TimedOut => 124,
        BuildStatus::Cancelled => 130,
    }
}

impl fmt::Display for ExitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ExitError {}

#[cfg(test)]
#[path = "exit_error_tests.rs"]
mod tests;
