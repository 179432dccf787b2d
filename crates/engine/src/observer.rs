// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Capability-segregated run observers.
//!
//! A component that only prints output implements [`MessageLog`]; one that
//! tracks progress implements [`StepObserver`]. A [`FullLogger`] is simply a
//! type that implements all three.

use std::sync::Arc;

use kiln_core::{LogLevel, LogLine, StepEvent, WorkflowEvent};

/// Receives log lines: step output, log steps and system messages.
pub trait MessageLog: Send + Sync {
    fn message(&self, line: &LogLine);
}

/// Receives step lifecycle events.
pub trait StepObserver: Send + Sync {
    fn on_step(&self, event: &StepEvent);
}

/// Receives workflow lifecycle events.
pub trait WorkflowObserver: Send + Sync {
    fn on_workflow(&self, event: &WorkflowEvent);
}

pub trait FullLogger: MessageLog + StepObserver + WorkflowObserver {}

impl<T: MessageLog + StepObserver + WorkflowObserver + ?Sized> FullLogger for T {}

/// Fan-out to registered observers, in registration order.
#[derive(Clone, Default)]
pub struct Observers {
    messages: Vec<Arc<dyn MessageLog>>,
    steps: Vec<Arc<dyn StepObserver>>,
    workflows: Vec<Arc<dyn WorkflowObserver>>,
}

impl Observers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_messages(mut self, observer: Arc<dyn MessageLog>) -> Self {
        self.messages.push(observer);
        self
    }

    pub fn with_steps(mut self, observer: Arc<dyn StepObserver>) -> Self {
        self.steps.push(observer);
        self
    }

    pub fn with_workflow(mut self, observer: Arc<dyn WorkflowObserver>) -> Self {
        self.workflows.push(observer);
        self
    }

    /// Register one observer for all three capabilities.
    pub fn with_full<T: FullLogger + 'static>(self, observer: Arc<T>) -> Self {
        self.with_messages(observer.clone())
            .with_steps(observer.clone())
            .with_workflow(observer)
    }
}

impl MessageLog for Observers {
    fn message(&self, line: &LogLine) {
        for observer in &self.messages {
            observer.message(line);
        }
    }
}

impl StepObserver for Observers {
    fn on_step(&self, event: &StepEvent) {
        for observer in &self.steps {
            observer.on_step(event);
        }
    }
}

impl WorkflowObserver for Observers {
    fn on_workflow(&self, event: &WorkflowEvent) {
        for observer in &self.workflows {
            observer.on_workflow(event);
        }
    }
}

/// Forwards everything to `tracing`.
#[derive(Debug, Clone, Default)]
pub struct TracingObserver {
    build_id: Option<String>,
}

impl TracingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn for_build(build_id: impl Into<String>) -> Self {
        Self { build_id: Some(build_id.into()) }
    }

    fn build(&self) -> &str {
        self.build_id.as_deref().unwrap_or("-")
    }
}

impl MessageLog for TracingObserver {
    fn message(&self, line: &LogLine) {
        let step = line.step.as_deref().unwrap_or("");
        let build_id = self.build();
        match line.level {
            LogLevel::Debug => tracing::debug!(build_id, step, stream = %line.stream, "{}", line.message),
            LogLevel::Info => tracing::debug!(build_id, step, stream = %line.stream, "{}", line.message),
            LogLevel::Warn => tracing::info!(build_id, step, stream = %line.stream, "{}", line.message),
            LogLevel::Error => tracing::warn!(build_id, step, stream = %line.stream, "{}", line.message),
        }
    }
}

impl StepObserver for TracingObserver {
    fn on_step(&self, event: &StepEvent) {
        let build_id = self.build();
        match event {
            StepEvent::Started { index, name } => {
                tracing::info!(build_id, step = %name, index, "step started")
            }
            StepEvent::Completed { name, elapsed_ms, .. } => {
                tracing::info!(build_id, step = %name, elapsed_ms, "step completed")
            }
            StepEvent::Failed { name, elapsed_ms, error, .. } => {
                tracing::warn!(build_id, step = %name, elapsed_ms, error = %error, "step failed")
            }
            StepEvent::Cancelled { name, elapsed_ms, .. } => {
                tracing::info!(build_id, step = %name, elapsed_ms, "step cancelled")
            }
            StepEvent::Skipped { name, .. } => tracing::debug!(build_id, step = %name, "step skipped"),
        }
    }
}

impl WorkflowObserver for TracingObserver {
    fn on_workflow(&self, event: &WorkflowEvent) {
        let build_id = self.build();
        match event {
            WorkflowEvent::Started { total_steps } => {
                tracing::info!(build_id, total_steps, "workflow started")
            }
            WorkflowEvent::Completed { outcome, completed, failed, skipped, elapsed_ms } => {
                tracing::info!(
                    build_id,
                    %outcome,
                    completed,
                    failed,
                    skipped,
                    elapsed_ms,
                    "workflow finished"
                )
            }
        }
    }
}

/// Renders a step event as a one-line human-readable message.
pub fn describe_step(event: &StepEvent) -> String {
    use kiln_core::format_elapsed_ms;
    match event {
        StepEvent::Started { index, name } => format!("step {} `{}` started", index + 1, name),
        StepEvent::Completed { name, elapsed_ms, .. } => {
            format!("step `{}` succeeded in {}", name, format_elapsed_ms(*elapsed_ms))
        }
        StepEvent::Failed { name, elapsed_ms, error, .. } => {
            format!("step `{}` failed after {}: {}", name, format_elapsed_ms(*elapsed_ms), error)
        }
        StepEvent::Cancelled { name, .. } => format!("step `{}` cancelled", name),
        StepEvent::Skipped { name, .. } => format!("step `{}` skipped", name),
    }
}

#[cfg(test)]
#[path = "observer_tests.rs"]
mod tests;
