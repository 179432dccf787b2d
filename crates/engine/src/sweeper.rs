// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Batched reclamation of expired build artifacts.

use std::collections::HashSet;
use std::sync::Arc;

use kiln_core::{ArtifactId, Clock};
use kiln_storage::{ArtifactRepo, StoreError};
use serde::{Deserialize, Serialize};

/// Artifacts fetched and deleted per batch.
pub const SWEEP_BATCH_SIZE: usize = 100;

/// Counters from one sweep.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SweepReport {
    pub batches: u32,
    pub artifacts_deleted: u64,
    pub files_deleted: u64,
    /// Records whose backing file was already gone
    pub files_missing: u64,
    pub bytes_freed: u64,
    /// Records kept because their file could not be removed
    #[serde(default)]
    pub files_failed: u64,
}

pub struct ArtifactSweeper<C: Clock> {
    repo: Arc<dyn ArtifactRepo>,
    clock: C,
    batch_size: usize,
}

impl<C: Clock> ArtifactSweeper<C> {
    pub fn new(repo: Arc<dyn ArtifactRepo>, clock: C) -> Self {
        Self { repo, clock, batch_size: SWEEP_BATCH_SIZE }
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Delete expired artifacts batch by batch until none remain.
    ///
    /// A missing backing file is logged and its record deleted anyway. A
    /// file that cannot be removed for any other reason keeps its record
    /// and is not fetched again during this sweep.
    pub fn sweep(&self) -> Result<SweepReport, StoreError> {
        let now = self.clock.epoch_ms();
        let mut report = SweepReport::default();
        let mut kept: HashSet<ArtifactId> = HashSet::new();

        loop {
            let batch = self.repo.fetch_expired(now, self.batch_size, &kept)?;
            if batch.is_empty() {
                break;
            }
            report.batches += 1;

            let mut deletable = Vec::with_capacity(batch.len());
            for artifact in batch {
                match std::fs::remove_file(&artifact.storage_path) {
                    Ok(()) => {
                        report.files_deleted += 1;
                        report.bytes_freed += artifact.size_bytes;
                        deletable.push(artifact.id);
                    }
                    Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                        tracing::warn!(
                            artifact_id = %artifact.id,
                            build_id = %artifact.build_id,
                            path = %artifact.storage_path.display(),
                            "artifact file already missing"
                        );
                        report.files_missing += 1;
                        deletable.push(artifact.id);
                    }
                    Err(e) => {
                        tracing::error!(
                            artifact_id = %artifact.id,
                            path = %artifact.storage_path.display(),
                            error = %e,
                            "failed to remove artifact file"
                        );
                        report.files_failed += 1;
                        kept.insert(artifact.id);
                    }
                }
            }

            if !deletable.is_empty() {
                report.artifacts_deleted += self.repo.delete_artifacts(&deletable)? as u64;
            }
            tracing::debug!(batch = report.batches, deleted = deletable.len(), "sweep batch done");
        }

        if report.batches > 0 {
            tracing::info!(
                batches = report.batches,
                artifacts_deleted = report.artifacts_deleted,
                files_missing = report.files_missing,
                bytes_freed = report.bytes_freed,
                "artifact sweep finished"
            );
        }
        Ok(report)
    }
}

#[cfg(test)]
#[path = "sweeper_tests.rs"]
mod tests;
