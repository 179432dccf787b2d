// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! kiln-core: Core types for the Kiln build engine

pub mod macros;

pub mod artifact;
pub mod build;
pub mod clock;
pub mod event;
pub mod id;
pub mod log;
pub mod path;
pub mod step;
pub mod time_fmt;

pub use artifact::{ArtifactId, BuildArtifact};
pub use build::{Build, BuildId, BuildStatus, TransitionRejected, TriggerContext};
pub use clock::{Clock, FakeClock, SystemClock};
pub use event::{StepEvent, WorkflowEvent, WorkflowOutcome};
pub use id::short;
pub use log::{LogEntry, LogEntryId, LogLevel, LogLine, LogStream};
pub use path::ProjectPath;
pub use step::StepOutcome;
pub use time_fmt::{format_elapsed, format_elapsed_ms, format_utc, format_utc_now};
