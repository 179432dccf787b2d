// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Build identifier and state machine.

use crate::clock::Clock;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

crate::define_id! {
    /// Unique identifier for a build.
    ///
    /// Each trigger (and each retry) gets a fresh ID; builds are never reused.
    pub struct BuildId("bld-");
}

/// Lifecycle state of a build.
///
/// `Queued` is initial. The four right-hand states are terminal:
///
/// ```text
/// Queued ──► Running ──► Succeeded | Failed | TimedOut | Cancelled
///    └──────────────────────────────────────────────────► Cancelled
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuildStatus {
    Queued,
    Running,
    Succeeded,
    Failed,
    TimedOut,
    Cancelled,
}

impl BuildStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            BuildStatus::Succeeded
                | BuildStatus::Failed
                | BuildStatus::TimedOut
                | BuildStatus::Cancelled
        )
    }

    /// Whether the state machine permits `self → next`.
    pub fn can_transition_to(self, next: BuildStatus) -> bool {
        use BuildStatus::*;
        matches!(
            (self, next),
            (Queued, Running)
                | (Queued, Cancelled)
                | (Running, Succeeded)
                | (Running, Failed)
                | (Running, TimedOut)
                | (Running, Cancelled)
        )
    }

    pub fn is_cancellable(self) -> bool {
        matches!(self, BuildStatus::Queued | BuildStatus::Running)
    }

    pub fn is_retryable(self) -> bool {
        self.is_terminal() && self != BuildStatus::Cancelled
    }
}

crate::simple_display! {
    BuildStatus {
        Queued => "queued",
        Running => "running",
        Succeeded => "succeeded",
        Failed => "failed",
        TimedOut => "timed_out",
        Cancelled => "cancelled",
    }
}

impl std::str::FromStr for BuildStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "queued" => Ok(BuildStatus::Queued),
            "running" => Ok(BuildStatus::Running),
            "succeeded" => Ok(BuildStatus::Succeeded),
            "failed" => Ok(BuildStatus::Failed),
            "timed_out" => Ok(BuildStatus::TimedOut),
            "cancelled" => Ok(BuildStatus::Cancelled),
            other => Err(format!("unknown build status: {other}")),
        }
    }
}

/// A transition the state machine does not permit.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("build {id} cannot move from {from} to {to}")]
pub struct TransitionRejected {
    pub id: BuildId,
    pub from: BuildStatus,
    pub to: BuildStatus,
}

/// What caused a build to exist: the plan to run and the profiles requested.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerContext {
    /// Plan file to compile into steps
    pub plan: PathBuf,
    /// Profiles requested by the trigger
    #[serde(default)]
    pub profiles: Vec<String>,
    /// Free-form origin label (e.g. "cli", "webhook:push")
    #[serde(default)]
    pub source: String,
}

impl TriggerContext {
    pub fn new(plan: impl Into<PathBuf>) -> Self {
        Self { plan: plan.into(), profiles: Vec::new(), source: String::new() }
    }

    /// Where the trigger came from (`cli`, a webhook name, ...)
    pub fn source(mut self, source: impl Into<String>) -> Self {
        self.source = source.into();
        self
    }

    crate::setters! {
        set {
            profiles: Vec<String>,
        }
    }
}

/// One execution instance of a workflow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Build {
    pub id: BuildId,
    pub status: BuildStatus,
    pub trigger: TriggerContext,
    pub queued_at_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at_ms: Option<u64>,
    #[serde(default)]
    pub steps_total: u32,
    #[serde(default)]
    pub steps_completed: u32,
    #[serde(default)]
    pub steps_failed: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Build this one was retried from
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry_of: Option<BuildId>,
}

impl Build {
    /// Create a queued build for the given trigger.
    pub fn new(trigger: TriggerContext, clock: &impl Clock) -> Self {
        Self {
            id: BuildId::new(),
            status: BuildStatus::Queued,
            trigger,
            queued_at_ms: clock.epoch_ms(),
            started_at_ms: None,
            finished_at_ms: None,
            steps_total: 0,
            steps_completed: 0,
            steps_failed: 0,
            error: None,
            retry_of: None,
        }
    }

    /// Create a fresh build re-running this build's trigger.
    pub fn retry(&self, clock: &impl Clock) -> Self {
        let mut build = Build::new(self.trigger.clone(), clock);
        build.retry_of = Some(self.id.clone());
        build
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Move to `next`, stamping `started_at_ms` / `finished_at_ms`.
    ///
    /// A rejected transition leaves the build untouched.
    pub fn transition(&mut self, next: BuildStatus, now_ms: u64) -> Result<(), TransitionRejected> {
        if !self.status.can_transition_to(next) {
            return Err(TransitionRejected { id: self.id.clone(), from: self.status, to: next });
        }
        self.status = next;
        if next == BuildStatus::Running {
            self.started_at_ms = Some(now_ms);
        }
        if next.is_terminal() {
            self.finished_at_ms = Some(now_ms);
        }
        Ok(())
    }

    /// Move to a terminal state with an error message.
    pub fn fail_with(
        &mut self,
        next: BuildStatus,
        error: impl Into<String>,
        now_ms: u64,
    ) -> Result<(), TransitionRejected> {
        self.transition(next, now_ms)?;
        self.error = Some(error.into());
        Ok(())
    }

    /// Wall-clock duration in ms, if the build has started.
    pub fn elapsed_ms(&self, now_ms: u64) -> Option<u64> {
        let started = self.started_at_ms?;
        Some(self.finished_at_ms.unwrap_or(now_ms).saturating_sub(started))
    }
}

#[cfg(test)]
#[path = "build_tests.rs"]
mod tests;
