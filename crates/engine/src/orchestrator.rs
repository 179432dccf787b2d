// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Build orchestration: trigger, cancel, retry and the execute path.
//!
//! The orchestrator owns every build state transition. Control operations
//! check and apply a transition in a single store update, so a cancel that
//! races a job starting sees exactly one winner.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use kiln_adapters::{ProcessExecutor, ToolRegistry};
use kiln_core::{
    ArtifactId, Build, BuildArtifact, BuildId, BuildStatus, Clock, LogLevel, LogLine, ProjectPath,
    StepEvent, TransitionRejected, TriggerContext, WorkflowEvent, WorkflowOutcome,
};
use kiln_storage::Store;
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

use crate::broadcast::LogBroadcaster;
use crate::build_logger::BuildLogger;
use crate::error::ControlError;
use crate::observer::{describe_step, MessageLog, Observers, StepObserver, TracingObserver, WorkflowObserver};
use crate::queue::{BuildExecutor, ExecutionJob, JobQueue};
use crate::runner::{WorkflowReport, WorkflowRunner};

#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Where retained artifact copies live (`<dir>/<build_id>/<file>`)
    pub artifact_dir: PathBuf,
    /// Per-build activity logs, if enabled
    pub log_dir: Option<PathBuf>,
    /// Overall budget for one build; `None` disables it
    pub build_timeout: Option<Duration>,
    pub artifact_retention: Duration,
}

impl OrchestratorConfig {
    pub fn new(artifact_dir: impl Into<PathBuf>) -> Self {
        Self {
            artifact_dir: artifact_dir.into(),
            log_dir: None,
            build_timeout: Some(Duration::from_secs(60 * 60)),
            artifact_retention: Duration::from_secs(7 * 24 * 60 * 60),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StopReason {
    /// A client asked for the build to be cancelled
    Cancelled,
    TimedOut,
    /// The daemon is going down; the build did not choose to stop
    Shutdown,
}

impl StopReason {
    fn describe(self) -> &'static str {
        match self {
            StopReason::Cancelled => "cancel request",
            StopReason::TimedOut => "build time budget",
            StopReason::Shutdown => "daemon shutdown",
        }
    }
}

/// Terminal status and error for a finished workflow run.
///
/// A stop only decides the status when it is what ended the run. A run
/// whose last step had already finished keeps its own outcome.
fn settle(
    report: &WorkflowReport,
    reason: Option<StopReason>,
    budget: Option<Duration>,
) -> (BuildStatus, Option<String>) {
    match report.outcome {
        WorkflowOutcome::Succeeded => (BuildStatus::Succeeded, None),
        WorkflowOutcome::Failed => (BuildStatus::Failed, report.error_message()),
        WorkflowOutcome::Stopped => match reason {
            Some(StopReason::TimedOut) => {
                let limit = budget.map_or(0, |t| t.as_millis() as u64);
                (
                    BuildStatus::TimedOut,
                    Some(format!(
                        "build exceeded its time budget of {} ms ({})",
                        limit,
                        kiln_core::format_elapsed_ms(limit)
                    )),
                )
            }
            Some(StopReason::Shutdown) => {
                (BuildStatus::Failed, Some("interrupted by daemon shutdown".to_string()))
            }
            Some(StopReason::Cancelled) | None => (BuildStatus::Cancelled, Some("cancelled".to_string())),
        },
    }
}

/// Cancellation handle for a build being executed.
struct ActiveBuild {
    cancel: CancellationToken,
    reason: Mutex<Option<StopReason>>,
}

impl ActiveBuild {
    fn new() -> Self {
        Self { cancel: CancellationToken::new(), reason: Mutex::new(None) }
    }

    /// The first reason recorded wins.
    fn stop(&self, reason: StopReason) {
        self.reason.lock().get_or_insert(reason);
        self.cancel.cancel();
    }

    fn reason(&self) -> Option<StopReason> {
        *self.reason.lock()
    }
}

/// Builds currently executing, keyed by ID.
#[derive(Default)]
struct ActiveBuilds {
    builds: HashMap<BuildId, Arc<ActiveBuild>>,
    /// Set once by [`BuildOrchestrator::interrupt_all`]; no build starts after
    interrupted: bool,
}

/// Startup reconciliation result.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Recovery {
    /// Builds that were running when the previous process stopped
    pub interrupted: Vec<BuildId>,
    /// Queued builds put back on the queue
    pub requeued: Vec<BuildId>,
}

pub struct BuildOrchestrator<C: Clock> {
    store: Arc<Store>,
    broadcaster: Arc<LogBroadcaster<C>>,
    executor: Arc<dyn ProcessExecutor>,
    tools: Arc<ToolRegistry>,
    queue: JobQueue,
    clock: C,
    config: OrchestratorConfig,
    build_logger: Option<BuildLogger>,
    active: Mutex<ActiveBuilds>,
}

impl<C: Clock> BuildOrchestrator<C> {
    pub fn new(
        store: Arc<Store>,
        broadcaster: Arc<LogBroadcaster<C>>,
        executor: Arc<dyn ProcessExecutor>,
        tools: Arc<ToolRegistry>,
        queue: JobQueue,
        clock: C,
        config: OrchestratorConfig,
    ) -> Self {
        let build_logger = config.log_dir.clone().map(BuildLogger::new);
        Self {
            store,
            broadcaster,
            executor,
            tools,
            queue,
            clock,
            config,
            build_logger,
            active: Mutex::new(ActiveBuilds::default()),
        }
    }

    pub fn store(&self) -> &Arc<Store> {
        &self.store
    }

    pub fn broadcaster(&self) -> &Arc<LogBroadcaster<C>> {
        &self.broadcaster
    }

    /// Create a queued build and enqueue its execution job.
    pub fn trigger(&self, trigger: TriggerContext) -> Result<BuildId, ControlError> {
        let build = Build::new(trigger, &self.clock);
        let id = build.id.clone();
        tracing::info!(build_id = %id, plan = %build.trigger.plan.display(), "build triggered");
        self.enqueue_new(build)?;
        Ok(id)
    }

    /// Cancel a queued or running build.
    ///
    /// A queued build is cancelled immediately. A running build has its
    /// token cancelled; the execution job records the final state once the
    /// running step has been terminated.
    ///
    /// `Ok(Running)` means the stop was requested, not that it took effect.
    /// If the last step finishes before the stop lands, the build keeps its
    /// own outcome and its log records that the cancel came too late.
    pub fn cancel(&self, query: &str) -> Result<BuildStatus, ControlError> {
        let id = self.resolve(query)?.id;
        let now = self.clock.epoch_ms();
        let status = self.store.update_build(id.as_str(), |b| match b.status {
            BuildStatus::Queued => {
                b.fail_with(BuildStatus::Cancelled, "cancelled before start", now)
                    .map(|_| BuildStatus::Cancelled)
            }
            BuildStatus::Running => Ok(BuildStatus::Running),
            from => Err(TransitionRejected { id: b.id.clone(), from, to: BuildStatus::Cancelled }),
        })??;

        if status == BuildStatus::Cancelled {
            tracing::info!(build_id = %id, "cancelled queued build");
            self.publish(&id, LogLine::system(LogLevel::Warn, "build cancelled before start"));
            self.commit();
            self.broadcaster.close(&id);
            return Ok(status);
        }

        let active = self.active.lock().builds.get(&id).cloned();
        match active {
            Some(active) => {
                tracing::info!(build_id = %id, "cancelling running build");
                active.stop(StopReason::Cancelled);
                Ok(BuildStatus::Running)
            }
            None => {
                // Running in the store but not here: nothing to signal.
                self.store.update_build(id.as_str(), |b| {
                    b.fail_with(BuildStatus::Cancelled, "cancelled", now)
                })??;
                self.commit();
                Ok(BuildStatus::Cancelled)
            }
        }
    }

    /// Queue a fresh build with the same trigger as a finished one.
    pub fn retry(&self, query: &str) -> Result<BuildId, ControlError> {
        let original = self.resolve(query)?;
        if !original.status.is_retryable() {
            return Err(ControlError::NotRetryable { id: original.id, status: original.status });
        }
        let build = original.retry(&self.clock);
        let id = build.id.clone();
        tracing::info!(build_id = %id, retry_of = %original.id, "build retried");
        self.enqueue_new(build)?;
        Ok(id)
    }

    /// Build by exact ID or unique prefix.
    pub fn status(&self, query: &str) -> Result<Build, ControlError> {
        self.resolve(query)
    }

    pub fn list(&self) -> Vec<Build> {
        self.store.list_builds()
    }

    fn resolve(&self, query: &str) -> Result<Build, ControlError> {
        self.store.find_build(query).ok_or_else(|| ControlError::NotFound(query.to_string()))
    }

    fn enqueue_new(&self, build: Build) -> Result<(), ControlError> {
        let id = build.id.clone();
        self.store.insert_build(build);
        self.commit();
        self.queue.enqueue(ExecutionJob::new(id))
    }

    /// Fail builds left running by a previous process and requeue queued ones.
    pub fn recover(&self) -> Result<Recovery, ControlError> {
        let now = self.clock.epoch_ms();
        let mut recovery = Recovery::default();
        for build in self.store.builds_with_status(BuildStatus::Running) {
            self.publish(
                &build.id,
                LogLine::system(LogLevel::Error, "build interrupted by daemon restart"),
            );
            self.store.update_build(build.id.as_str(), |b| {
                b.fail_with(BuildStatus::Failed, "interrupted by daemon restart", now)
            })??;
            self.broadcaster.close(&build.id);
            recovery.interrupted.push(build.id);
        }
        for build in self.store.builds_with_status(BuildStatus::Queued) {
            self.queue.enqueue(ExecutionJob::new(build.id.clone()))?;
            recovery.requeued.push(build.id);
        }
        self.commit();
        Ok(recovery)
    }

    /// Stop every running build because the daemon is shutting down.
    ///
    /// Interrupted builds end `Failed`, the same as builds found running
    /// after a crash, so they stay retryable.
    pub fn interrupt_all(&self) {
        let mut running = self.active.lock();
        running.interrupted = true;
        for (id, active) in running.builds.iter() {
            tracing::info!(build_id = %id, "interrupting build for shutdown");
            active.stop(StopReason::Shutdown);
        }
    }

    pub fn active_count(&self) -> usize {
        self.active.lock().builds.len()
    }

    /// Run one queued build to a terminal state.
    pub async fn execute(&self, build_id: &BuildId) -> Result<BuildStatus, ControlError> {
        let build = self.resolve(build_id.as_str())?;
        if build.status == BuildStatus::Cancelled {
            tracing::debug!(build_id = %build_id, "skipping build cancelled while queued");
            return Ok(BuildStatus::Cancelled);
        }

        let active = Arc::new(ActiveBuild::new());
        {
            let mut running = self.active.lock();
            if running.interrupted {
                // Left queued; the next startup puts it back on the queue.
                tracing::info!(build_id = %build_id, "not starting build during shutdown");
                return Ok(BuildStatus::Queued);
            }
            running.builds.insert(build_id.clone(), Arc::clone(&active));
        }

        let now = self.clock.epoch_ms();
        let started = self.store.update_build(build_id.as_str(), |b| b.transition(BuildStatus::Running, now));
        match started {
            Ok(Ok(())) => {}
            Ok(Err(rejected)) => {
                self.active.lock().builds.remove(build_id);
                if rejected.from == BuildStatus::Cancelled {
                    return Ok(BuildStatus::Cancelled);
                }
                return Err(rejected.into());
            }
            Err(e) => {
                self.active.lock().builds.remove(build_id);
                return Err(e.into());
            }
        }
        self.commit();

        let timer = self.config.build_timeout.map(|limit| {
            let active = Arc::clone(&active);
            tokio::spawn(async move {
                tokio::time::sleep(limit).await;
                active.stop(StopReason::TimedOut);
            })
        });

        let (status, error) = self.run_build(&build, &active).await;

        if let Some(timer) = timer {
            timer.abort();
        }
        self.finish(build_id, status, error)
    }

    async fn run_build(&self, build: &Build, active: &ActiveBuild) -> (BuildStatus, Option<String>) {
        let id = &build.id;
        let profiles = if build.trigger.profiles.is_empty() {
            String::from("none")
        } else {
            build.trigger.profiles.join(", ")
        };
        self.publish(
            id,
            LogLine::system(
                LogLevel::Info,
                format!("build started: plan {} (profiles: {})", build.trigger.plan.display(), profiles),
            ),
        );

        let compiled = match kiln_plan::compile_file(
            &build.trigger.plan,
            &build.trigger.profiles,
            Arc::clone(&self.executor),
        ) {
            Ok(compiled) => compiled,
            Err(e) => {
                tracing::warn!(build_id = %id, error = %e, "plan rejected");
                return (BuildStatus::Failed, Some(e.to_string()));
            }
        };

        let total = compiled.steps.len() as u32;
        if let Err(e) = self.store.update_build(id.as_str(), |b| b.steps_total = total) {
            tracing::warn!(build_id = %id, error = %e, "failed to record step count");
        }

        let runner = WorkflowRunner::new(Arc::clone(&self.tools)).with_observers(self.observers(id));
        let report = runner.run(&compiled.steps, &active.cancel).await;

        let reason = active.reason();
        if let Some(reason) = reason.filter(|_| report.outcome != WorkflowOutcome::Stopped) {
            tracing::info!(build_id = %id, reason = reason.describe(), "stop arrived after the last step");
            self.publish(
                id,
                LogLine::system(
                    LogLevel::Warn,
                    format!("{} arrived after the last step finished", reason.describe()),
                ),
            );
        }

        let (status, error) = settle(&report, reason, self.config.build_timeout);
        if status == BuildStatus::Succeeded {
            self.retain_artifacts(id, &compiled.artifacts).await;
        }
        (status, error)
    }

    fn observers(&self, id: &BuildId) -> Observers {
        let mut observers = Observers::new()
            .with_full(Arc::new(BuildLogObserver {
                broadcaster: Arc::clone(&self.broadcaster),
                build_id: id.clone(),
            }))
            .with_steps(Arc::new(ProgressObserver { store: Arc::clone(&self.store), build_id: id.clone() }))
            .with_full(Arc::new(TracingObserver::for_build(id.as_str())));
        if let Some(logger) = &self.build_logger {
            observers = observers.with_full(Arc::new(logger.for_build(id.as_str())));
        }
        observers
    }

    /// Publish the closing line, then move to the terminal state.
    fn finish(
        &self,
        id: &BuildId,
        status: BuildStatus,
        error: Option<String>,
    ) -> Result<BuildStatus, ControlError> {
        let (level, summary) = match &error {
            None => (LogLevel::Info, format!("build {}", status)),
            Some(error) => (LogLevel::Error, format!("build {}: {}", status, error)),
        };
        self.publish(id, LogLine::system(level, summary));

        let now = self.clock.epoch_ms();
        let result = self.store.update_build(id.as_str(), |b| match error {
            Some(error) => b.fail_with(status, error, now),
            None => b.transition(status, now),
        });
        self.active.lock().builds.remove(id);
        self.broadcaster.close(id);
        self.commit();
        result??;

        tracing::info!(build_id = %id, %status, "build finished");
        Ok(status)
    }

    /// Copy each artifact into server storage and record it with an expiry.
    /// Missing paths are reported in the build log and skipped.
    async fn retain_artifacts(&self, id: &BuildId, paths: &[ProjectPath]) {
        for path in paths {
            match self.retain_artifact(id, path.as_path()).await {
                Ok(artifact) => self.publish(
                    id,
                    LogLine::system(
                        LogLevel::Info,
                        format!("retained artifact {} ({} bytes)", path, artifact.size_bytes),
                    ),
                ),
                Err(e) => {
                    tracing::warn!(build_id = %id, path = %path, error = %e, "artifact not retained");
                    self.publish(
                        id,
                        LogLine::system(LogLevel::Warn, format!("artifact {} not retained: {}", path, e)),
                    );
                }
            }
        }
    }

    async fn retain_artifact(&self, id: &BuildId, source: &Path) -> std::io::Result<BuildArtifact> {
        let metadata = tokio::fs::metadata(source).await?;
        if !metadata.is_file() {
            return Err(std::io::Error::new(std::io::ErrorKind::InvalidInput, "not a regular file"));
        }
        let artifact_id = ArtifactId::new();
        let file_name = source.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
        let dir = self.config.artifact_dir.join(id.as_str());
        tokio::fs::create_dir_all(&dir).await?;
        let dest = dir.join(format!("{}-{}", artifact_id.suffix(), file_name));
        let size_bytes = tokio::fs::copy(source, &dest).await?;

        let now = self.clock.epoch_ms();
        let artifact = BuildArtifact {
            id: artifact_id,
            build_id: id.clone(),
            storage_path: dest,
            size_bytes,
            created_at_ms: now,
            expires_at_ms: self.clock.epoch_ms_after(self.config.artifact_retention),
        };
        self.store.insert_artifact(artifact.clone());
        Ok(artifact)
    }

    fn publish(&self, id: &BuildId, line: LogLine) {
        if let Err(e) = self.broadcaster.publish(id, line) {
            tracing::error!(build_id = %id, error = %e, "failed to publish log line");
        }
    }

    fn commit(&self) {
        if let Err(e) = self.store.commit() {
            tracing::error!(error = %e, "failed to commit store");
        }
    }
}

#[async_trait]
impl<C: Clock> BuildExecutor for BuildOrchestrator<C> {
    async fn execute(&self, build_id: &BuildId) -> Result<BuildStatus, ControlError> {
        BuildOrchestrator::execute(self, build_id).await
    }
}

/// Turns run activity into sequenced build log entries.
struct BuildLogObserver<C: Clock> {
    broadcaster: Arc<LogBroadcaster<C>>,
    build_id: BuildId,
}

impl<C: Clock> BuildLogObserver<C> {
    fn publish(&self, line: LogLine) {
        if let Err(e) = self.broadcaster.publish(&self.build_id, line) {
            tracing::error!(build_id = %self.build_id, error = %e, "failed to publish log line");
        }
    }
}

impl<C: Clock> MessageLog for BuildLogObserver<C> {
    fn message(&self, line: &LogLine) {
        self.publish(line.clone());
    }
}

impl<C: Clock> StepObserver for BuildLogObserver<C> {
    fn on_step(&self, event: &StepEvent) {
        let level = match event {
            StepEvent::Failed { .. } => LogLevel::Error,
            StepEvent::Cancelled { .. } => LogLevel::Warn,
            StepEvent::Skipped { .. } => LogLevel::Debug,
            _ => LogLevel::Info,
        };
        self.publish(LogLine::system(level, describe_step(event)).with_step(event.name()));
    }
}

impl<C: Clock> WorkflowObserver for BuildLogObserver<C> {
    fn on_workflow(&self, event: &WorkflowEvent) {
        if let WorkflowEvent::Started { total_steps } = event {
            self.publish(LogLine::system(LogLevel::Info, format!("running {} steps", total_steps)));
        }
    }
}

/// Keeps the build's step counters current.
struct ProgressObserver {
    store: Arc<Store>,
    build_id: BuildId,
}

impl StepObserver for ProgressObserver {
    fn on_step(&self, event: &StepEvent) {
        let update = self.store.update_build(self.build_id.as_str(), |b| match event {
            StepEvent::Completed { .. } => b.steps_completed += 1,
            StepEvent::Failed { .. } => b.steps_failed += 1,
            _ => {}
        });
        if let Err(e) = update {
            tracing::warn!(build_id = %self.build_id, error = %e, "failed to update step counters");
        }
    }
}

#[cfg(test)]
#[path = "orchestrator_tests.rs"]
mod tests;
