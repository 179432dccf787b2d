// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Sequential step execution with stop-on-first-failure.

use std::sync::Arc;

use kiln_adapters::{OutputSink, ToolRegistry};
use kiln_core::{LogLine, LogStream, StepEvent, StepOutcome, WorkflowEvent, WorkflowOutcome};
use kiln_plan::{StepContext, StepKind, StepRegistry};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::observer::{MessageLog, Observers, StepObserver, WorkflowObserver};

/// Final state of one step in a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepStatus {
    Succeeded,
    /// Reason, with any tool hint appended
    Failed(String),
    Cancelled,
    /// Never invoked
    Skipped,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepReport {
    pub index: usize,
    pub name: String,
    pub status: StepStatus,
    pub elapsed_ms: u64,
}

/// Summary of a workflow run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkflowReport {
    pub outcome: WorkflowOutcome,
    pub steps: Vec<StepReport>,
    pub elapsed_ms: u64,
}

impl WorkflowReport {
    pub fn completed(&self) -> usize {
        self.count(|s| matches!(s, StepStatus::Succeeded))
    }

    pub fn failed(&self) -> usize {
        self.count(|s| matches!(s, StepStatus::Failed(_)))
    }

    pub fn skipped(&self) -> usize {
        self.count(|s| matches!(s, StepStatus::Skipped))
    }

    fn count(&self, f: impl Fn(&StepStatus) -> bool) -> usize {
        self.steps.iter().filter(|s| f(&s.status)).count()
    }

    /// The failing step's name and reason.
    pub fn failure(&self) -> Option<(&str, &str)> {
        self.steps.iter().find_map(|s| match &s.status {
            StepStatus::Failed(reason) => Some((s.name.as_str(), reason.as_str())),
            _ => None,
        })
    }

    /// Human-readable error for a failed run.
    pub fn error_message(&self) -> Option<String> {
        self.failure().map(|(name, reason)| format!("step `{}` failed: {}", name, reason))
    }
}

/// Routes a running step's output to the message observers.
struct StepSink<'a> {
    observers: &'a Observers,
    step: &'a str,
}

impl OutputSink for StepSink<'_> {
    fn line(&self, stream: LogStream, line: &str) {
        self.observers.message(&LogLine::output(stream, line).with_step(self.step));
    }
}

/// Executes a [`StepRegistry`] in registration order.
///
/// The first failing step stops the run; every later step is reported as
/// skipped without being invoked. Failures are enriched with a hint from
/// the [`ToolRegistry`] when one applies.
pub struct WorkflowRunner {
    tools: Arc<ToolRegistry>,
    observers: Observers,
}

impl WorkflowRunner {
    pub fn new(tools: Arc<ToolRegistry>) -> Self {
        Self { tools, observers: Observers::new() }
    }

    pub fn with_observers(mut self, observers: Observers) -> Self {
        self.observers = observers;
        self
    }

    pub async fn run(&self, steps: &StepRegistry, cancel: &CancellationToken) -> WorkflowReport {
        let started = Instant::now();
        self.observers.on_workflow(&WorkflowEvent::Started { total_steps: steps.len() });

        let mut reports = Vec::with_capacity(steps.len());
        let mut outcome = WorkflowOutcome::Succeeded;

        for (index, step) in steps.iter().enumerate() {
            let name = step.name().to_string();
            if outcome != WorkflowOutcome::Succeeded || cancel.is_cancelled() {
                if outcome == WorkflowOutcome::Succeeded {
                    outcome = WorkflowOutcome::Stopped;
                }
                self.observers.on_step(&StepEvent::Skipped { index, name: name.clone() });
                reports.push(StepReport { index, name, status: StepStatus::Skipped, elapsed_ms: 0 });
                continue;
            }

            self.observers.on_step(&StepEvent::Started { index, name: name.clone() });
            let step_started = Instant::now();

            let status = match step.kind() {
                StepKind::Log { level, message } => {
                    self.observers.message(&LogLine::system(*level, message.clone()).with_step(&name));
                    StepStatus::Succeeded
                }
                StepKind::Action(action) => {
                    let sink = StepSink { observers: &self.observers, step: &name };
                    let ctx = StepContext { cancel, sink: &sink };
                    match action.run(&ctx).await {
                        StepOutcome::Succeeded => StepStatus::Succeeded,
                        StepOutcome::Cancelled => StepStatus::Cancelled,
                        StepOutcome::Failed(reason) => StepStatus::Failed(self.with_hint(&name, reason)),
                    }
                }
            };

            let elapsed_ms = elapsed_since(step_started);
            let event = match &status {
                StepStatus::Succeeded => StepEvent::Completed { index, name: name.clone(), elapsed_ms },
                StepStatus::Failed(error) => {
                    outcome = WorkflowOutcome::Failed;
                    StepEvent::Failed { index, name: name.clone(), elapsed_ms, error: error.clone() }
                }
                StepStatus::Cancelled | StepStatus::Skipped => {
                    outcome = WorkflowOutcome::Stopped;
                    StepEvent::Cancelled { index, name: name.clone(), elapsed_ms }
                }
            };
            self.observers.on_step(&event);
            reports.push(StepReport { index, name, status, elapsed_ms });
        }

        let report = WorkflowReport { outcome, steps: reports, elapsed_ms: elapsed_since(started) };
        self.observers.on_workflow(&WorkflowEvent::Completed {
            outcome,
            completed: report.completed(),
            failed: report.failed(),
            skipped: report.skipped(),
            elapsed_ms: report.elapsed_ms,
        });
        report
    }

    /// Append the tool hint for `step`, never replacing the reason.
    fn with_hint(&self, step: &str, reason: String) -> String {
        match self.tools.diagnose(step) {
            Some(hint) => format!("{}\nhint: {}", reason, hint),
            None => reason,
        }
    }
}

fn elapsed_since(started: Instant) -> u64 {
    started.elapsed().as_millis() as u64
}

#[cfg(test)]
#[path = "runner_tests.rs"]
mod tests;
