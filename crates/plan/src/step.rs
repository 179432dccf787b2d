// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Build steps and the ordered registry that holds them.

use std::sync::Arc;

use async_trait::async_trait;
use kiln_adapters::{CommandOptions, OutputSink, ProcessExecutor};
use kiln_core::{LogLevel, StepOutcome};
use tokio_util::sync::CancellationToken;

/// What a running step can reach: the cancellation token for its build and
/// the sink its output goes to.
pub struct StepContext<'a> {
    pub cancel: &'a CancellationToken,
    pub sink: &'a dyn OutputSink,
}

/// The executable part of a step.
#[async_trait]
pub trait StepAction: Send + Sync {
    async fn run(&self, ctx: &StepContext<'_>) -> StepOutcome;
}

pub enum StepKind {
    Action(Box<dyn StepAction>),
    /// Emits one line at `level`; always succeeds
    Log { level: LogLevel, message: String },
}

/// A named unit of work. Immutable once built; identity is its position in
/// the owning [`StepRegistry`].
pub struct BuildStep {
    name: String,
    context: Option<String>,
    kind: StepKind,
}

impl BuildStep {
    pub fn action(name: impl Into<String>, action: impl StepAction + 'static) -> Self {
        Self { name: name.into(), context: None, kind: StepKind::Action(Box::new(action)) }
    }

    pub fn log(name: impl Into<String>, level: LogLevel, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            context: None,
            kind: StepKind::Log { level, message: message.into() },
        }
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn context(&self) -> Option<&str> {
        self.context.as_deref()
    }

    pub fn kind(&self) -> &StepKind {
        &self.kind
    }

    pub fn is_log_step(&self) -> bool {
        matches!(self.kind, StepKind::Log { .. })
    }
}

impl std::fmt::Debug for BuildStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BuildStep")
            .field("name", &self.name)
            .field("context", &self.context)
            .field("log_step", &self.is_log_step())
            .finish()
    }
}

/// Runs an external command through a [`ProcessExecutor`].
pub struct CommandAction {
    executor: Arc<dyn ProcessExecutor>,
    program: String,
    options: CommandOptions,
}

impl CommandAction {
    pub fn new(
        executor: Arc<dyn ProcessExecutor>,
        program: impl Into<String>,
        options: CommandOptions,
    ) -> Self {
        Self { executor, program: program.into(), options }
    }
}

#[async_trait]
impl StepAction for CommandAction {
    async fn run(&self, ctx: &StepContext<'_>) -> StepOutcome {
        let result = match self.executor.execute(&self.program, &self.options, ctx.cancel, ctx.sink).await
        {
            Ok(result) => result,
            Err(e) => return StepOutcome::failed(e.to_string()),
        };
        if result.success {
            StepOutcome::Succeeded
        } else if ctx.cancel.is_cancelled() {
            StepOutcome::Cancelled
        } else {
            StepOutcome::failed(result.failure_reason())
        }
    }
}

/// Ordered steps for one run. Execution order is registration order.
#[derive(Debug, Default)]
pub struct StepRegistry {
    steps: Vec<BuildStep>,
}

impl StepRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, step: BuildStep) -> &mut Self {
        self.steps.push(step);
        self
    }

    pub fn command(
        &mut self,
        name: impl Into<String>,
        executor: Arc<dyn ProcessExecutor>,
        program: impl Into<String>,
        options: CommandOptions,
    ) -> &mut Self {
        self.add(BuildStep::action(name, CommandAction::new(executor, program, options)))
    }

    pub fn log(
        &mut self,
        name: impl Into<String>,
        level: LogLevel,
        message: impl Into<String>,
    ) -> &mut Self {
        self.add(BuildStep::log(name, level, message))
    }

    pub fn iter(&self) -> std::slice::Iter<'_, BuildStep> {
        self.steps.iter()
    }

    pub fn names(&self) -> Vec<&str> {
        self.steps.iter().map(BuildStep::name).collect()
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

impl<'a> IntoIterator for &'a StepRegistry {
    type Item = &'a BuildStep;
    type IntoIter = std::slice::Iter<'a, BuildStep>;

    fn into_iter(self) -> Self::IntoIter {
        self.steps.iter()
    }
}

#[cfg(test)]
#[path = "step_tests.rs"]
mod tests;
