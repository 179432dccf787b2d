// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Execution job queue.
//!
//! Each queued [`ExecutionJob`] runs in its own task; a semaphore bounds how
//! many builds execute at once. A job is attempted once: a failing build is
//! retried only by an explicit retry request, which creates a new build.

use std::sync::Arc;

use async_trait::async_trait;
use kiln_core::{BuildId, BuildStatus};
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::error::ControlError;

/// Attempts allowed per job. Jobs are never retried automatically.
pub const MAX_ATTEMPTS: u32 = 1;

/// Queued request to execute one build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionJob {
    pub build_id: BuildId,
    /// Attempts made so far
    pub attempts: u32,
}

impl ExecutionJob {
    pub fn new(build_id: BuildId) -> Self {
        Self { build_id, attempts: 0 }
    }

    pub fn can_attempt(&self) -> bool {
        self.attempts < MAX_ATTEMPTS
    }
}

/// Where jobs end up: the orchestrator's execute path.
#[async_trait]
pub trait BuildExecutor: Send + Sync + 'static {
    async fn execute(&self, build_id: &BuildId) -> Result<BuildStatus, ControlError>;
}

/// Sending half of the queue.
#[derive(Debug, Clone)]
pub struct JobQueue {
    tx: mpsc::UnboundedSender<ExecutionJob>,
}

/// Receiving half, consumed by [`run_jobs`].
pub struct JobReceiver {
    rx: mpsc::UnboundedReceiver<ExecutionJob>,
}

impl JobReceiver {
    pub async fn recv(&mut self) -> Option<ExecutionJob> {
        self.rx.recv().await
    }

    pub fn try_recv(&mut self) -> Option<ExecutionJob> {
        self.rx.try_recv().ok()
    }
}

impl JobQueue {
    pub fn new() -> (Self, JobReceiver) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, JobReceiver { rx })
    }

    pub fn enqueue(&self, job: ExecutionJob) -> Result<(), ControlError> {
        tracing::debug!(build_id = %job.build_id, "enqueued execution job");
        self.tx.send(job).map_err(|_| ControlError::QueueClosed)
    }
}

/// Dispatch jobs until `shutdown` fires or every sender is gone, then wait
/// for in-flight builds to finish.
pub async fn run_jobs<E: BuildExecutor>(
    mut jobs: JobReceiver,
    executor: Arc<E>,
    max_concurrent: usize,
    shutdown: CancellationToken,
) {
    let permits = Arc::new(Semaphore::new(max_concurrent.max(1)));
    let mut running = JoinSet::new();

    loop {
        let job = tokio::select! {
            _ = shutdown.cancelled() => break,
            job = jobs.recv() => match job {
                Some(job) => job,
                None => break,
            },
            Some(_) = running.join_next(), if !running.is_empty() => continue,
        };

        if !job.can_attempt() {
            tracing::warn!(build_id = %job.build_id, attempts = job.attempts, "dropping exhausted job");
            continue;
        }

        let permit = tokio::select! {
            _ = shutdown.cancelled() => break,
            permit = Arc::clone(&permits).acquire_owned() => match permit {
                Ok(permit) => permit,
                Err(_) => break,
            },
        };

        let executor = Arc::clone(&executor);
        running.spawn(async move {
            let _permit = permit;
            let mut job = job;
            job.attempts += 1;
            match executor.execute(&job.build_id).await {
                Ok(status) => {
                    tracing::info!(build_id = %job.build_id, %status, "execution job finished")
                }
                Err(e) => {
                    tracing::error!(build_id = %job.build_id, error = %e, "execution job failed")
                }
            }
        });
    }

    while running.join_next().await.is_some() {}
}

#[cfg(test)]
#[path = "queue_tests.rs"]
mod tests;
