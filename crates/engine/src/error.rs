// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use kiln_core::{BuildId, BuildStatus, TransitionRejected};
use kiln_storage::StoreError;
use thiserror::Error;

/// Errors returned by build control operations. None of them are fatal to
/// the engine; callers report them and carry on.
#[derive(Debug, Error)]
pub enum ControlError {
    #[error("build not found: {0}")]
    NotFound(String),

    #[error(transparent)]
    Rejected(#[from] TransitionRejected),

    #[error("build {id} is {status} and cannot be retried")]
    NotRetryable { id: BuildId, status: BuildStatus },

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("job queue is closed")]
    QueueClosed,
}
