// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Step and workflow lifecycle events.
//!
//! Emitted by the workflow runner to registered observers at fixed points:
//! workflow start, each step's start and end (or skip), workflow end.

use serde::{Deserialize, Serialize};

/// Final disposition of a workflow run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowOutcome {
    /// Every step succeeded
    Succeeded,
    /// A step failed; later steps were skipped
    Failed,
    /// Cancellation stopped the run; later steps were skipped
    Stopped,
}

crate::simple_display! {
    WorkflowOutcome {
        Succeeded => "succeeded",
        Failed => "failed",
        Stopped => "stopped",
    }
}

/// Step lifecycle event. `index` is the zero-based registration position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StepEvent {
    Started {
        index: usize,
        name: String,
    },
    Completed {
        index: usize,
        name: String,
        elapsed_ms: u64,
    },
    Failed {
        index: usize,
        name: String,
        elapsed_ms: u64,
        /// Failure reason with any tool hint appended
        error: String,
    },
    Cancelled {
        index: usize,
        name: String,
        elapsed_ms: u64,
    },
    Skipped {
        index: usize,
        name: String,
    },
}

impl StepEvent {
    pub fn name(&self) -> &str {
        match self {
            StepEvent::Started { name, .. }
            | StepEvent::Completed { name, .. }
            | StepEvent::Failed { name, .. }
            | StepEvent::Cancelled { name, .. }
            | StepEvent::Skipped { name, .. } => name,
        }
    }

    pub fn index(&self) -> usize {
        match self {
            StepEvent::Started { index, .. }
            | StepEvent::Completed { index, .. }
            | StepEvent::Failed { index, .. }
            | StepEvent::Cancelled { index, .. }
            | StepEvent::Skipped { index, .. } => *index,
        }
    }
}

/// Workflow lifecycle event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WorkflowEvent {
    Started {
        total_steps: usize,
    },
    Completed {
        outcome: WorkflowOutcome,
        completed: usize,
        failed: usize,
        skipped: usize,
        elapsed_ms: u64,
    },
}
