// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! kiln-engine: workflow runner, build orchestration, log streaming and
//! artifact cleanup

pub mod broadcast;
mod build_logger;
mod error;
pub mod observer;
pub mod orchestrator;
pub mod queue;
pub mod runner;
pub mod sweeper;

#[cfg(test)]
mod test_support;

pub use broadcast::{CatchUp, ChannelSubscriber, LogBroadcaster, LogFollow, LogSubscriber, SubscriberId};
pub use build_logger::{BuildLogFile, BuildLogger};
pub use error::ControlError;
pub use observer::{
    describe_step, FullLogger, MessageLog, Observers, StepObserver, TracingObserver, WorkflowObserver,
};
pub use orchestrator::{BuildOrchestrator, OrchestratorConfig, Recovery};
pub use queue::{run_jobs, BuildExecutor, ExecutionJob, JobQueue, JobReceiver, MAX_ATTEMPTS};
pub use runner::{StepReport, StepStatus, WorkflowReport, WorkflowRunner};
pub use sweeper::{ArtifactSweeper, SweepReport, SWEEP_BATCH_SIZE};
