// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! kiln-adapters: process execution and tool availability checks

pub mod process;
pub mod tools;

pub use process::{
    CommandOptions, CommandResult, ExecutorError, NullSink, OutputSink, ProcessExecutor,
    SystemExecutor, DEFAULT_TIMEOUT_MS, NO_TIMEOUT,
};
pub use tools::{BinaryChecker, BinaryProbe, PathProbe, ToolChecker, ToolRegistry};

#[cfg(any(test, feature = "test-support"))]
pub use process::{ExecCall, FakeExecutor};
#[cfg(any(test, feature = "test-support"))]
pub use tools::FakeProbe;
