// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::path::PathBuf;

use kiln_core::{Build, BuildId, BuildStatus};
use serde::{Deserialize, Serialize};

/// Summary of a build for listing
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BuildSummary {
    pub id: BuildId,
    pub status: BuildStatus,
    pub plan: PathBuf,
    #[serde(default)]
    pub profiles: Vec<String>,
    pub queued_at_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at_ms: Option<u64>,
    #[serde(default)]
    pub steps_total: u32,
    #[serde(default)]
    pub steps_completed: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry_of: Option<BuildId>,
}

impl From<&Build> for BuildSummary {
    fn from(build: &Build) -> Self {
        Self {
            id: build.id.clone(),
            status: build.status,
            plan: build.trigger.plan.clone(),
            profiles: build.trigger.profiles.clone(),
            queued_at_ms: build.queued_at_ms,
            finished_at_ms: build.finished_at_ms,
            steps_total: build.steps_total,
            steps_completed: build.steps_completed,
            retry_of: build.retry_of.clone(),
        }
    }
}

/// Counters from one artifact sweep
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SweepSummary {
    pub batches: u32,
    pub artifacts_deleted: u64,
    pub files_deleted: u64,
    pub files_missing: u64,
    pub bytes_freed: u64,
    #[serde(default)]
    pub files_failed: u64,
}
