// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Outcome of a single step's operation.

use serde::{Deserialize, Serialize};

/// What a step's operation reported when it resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "reason", rename_all = "snake_case")]
pub enum StepOutcome {
    Succeeded,
    /// The operation failed; carries a human-readable reason
    Failed(String),
    /// The operation was terminated by a cancellation request
    Cancelled,
}

impl StepOutcome {
    pub fn failed(reason: impl Into<String>) -> Self {
        StepOutcome::Failed(reason.into())
    }

    pub fn is_success(&self) -> bool {
        matches!(self, StepOutcome::Succeeded)
    }
}

crate::simple_display! {
    StepOutcome {
        Succeeded => "succeeded",
        Failed(..) => "failed",
        Cancelled => "cancelled",
    }
}
