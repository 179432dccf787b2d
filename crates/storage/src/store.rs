// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Key-value store of build, log and artifact records.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use kiln_core::{ArtifactId, Build, BuildArtifact, BuildId, BuildStatus, LogEntry};
use parking_lot::Mutex;
use thiserror::Error;

use crate::snapshot::{Snapshot, SnapshotError};
use crate::state::StoreState;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Snapshot(#[from] SnapshotError),
    #[error("build not found: {0}")]
    BuildNotFound(String),
    #[error("log entry {sequence} for build {build_id} is out of order (last is {last})")]
    OutOfOrder { build_id: BuildId, sequence: u64, last: u64 },
}

/// Bounds on one page of log entries read back from the store.
///
/// A page always carries at least one entry when any remain, so a single
/// oversized line still makes progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageLimit {
    pub entries: usize,
    /// Budget for the summed message lengths
    pub message_bytes: usize,
}

impl Default for PageLimit {
    fn default() -> Self {
        Self { entries: 5_000, message_bytes: 2 * 1024 * 1024 }
    }
}

/// One page of a build's log.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogPage {
    pub entries: Vec<LogEntry>,
    /// Entries past this page were already stored when it was read
    pub has_more: bool,
}

/// Thread-safe record store. When opened with a path, [`Store::commit`]
/// checkpoints the whole state to a compressed snapshot there.
pub struct Store {
    state: Mutex<StoreState>,
    path: Option<PathBuf>,
}

impl Store {
    pub fn in_memory() -> Self {
        Self { state: Mutex::new(StoreState::default()), path: None }
    }

    /// Open the snapshot at `path`, starting empty if it does not exist.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let state = match Snapshot::load(&path)? {
            Some(snapshot) => {
                tracing::info!(
                    path = %path.display(),
                    builds = snapshot.state.builds.len(),
                    artifacts = snapshot.state.artifacts.len(),
                    "loaded snapshot"
                );
                snapshot.state
            }
            None => StoreState::default(),
        };
        Ok(Self { state: Mutex::new(state), path: Some(path) })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Persist the current state. A no-op for in-memory stores.
    pub fn commit(&self) -> Result<(), StoreError> {
        let Some(path) = &self.path else { return Ok(()) };
        let snapshot = Snapshot::new(self.state.lock().clone());
        snapshot.save(path)?;
        Ok(())
    }

    /// Run `f` against the state under the lock.
    pub fn read<R>(&self, f: impl FnOnce(&StoreState) -> R) -> R {
        f(&self.state.lock())
    }

    // --- builds ---

    pub fn insert_build(&self, build: Build) {
        self.state.lock().builds.insert(build.id.clone(), build);
    }

    pub fn get_build(&self, id: &str) -> Option<Build> {
        self.state.lock().builds.get(id).cloned()
    }

    /// Exact ID or unique prefix.
    pub fn find_build(&self, query: &str) -> Option<Build> {
        self.state.lock().find_build(query).cloned()
    }

    /// Mutate a stored build in place.
    pub fn update_build<R>(&self, id: &str, f: impl FnOnce(&mut Build) -> R) -> Result<R, StoreError> {
        let mut state = self.state.lock();
        let build =
            state.builds.get_mut(id).ok_or_else(|| StoreError::BuildNotFound(id.to_string()))?;
        Ok(f(build))
    }

    /// All builds, most recently queued first.
    pub fn list_builds(&self) -> Vec<Build> {
        let mut builds: Vec<Build> = self.state.lock().builds.values().cloned().collect();
        builds.sort_by(|a, b| b.queued_at_ms.cmp(&a.queued_at_ms).then_with(|| b.id.cmp(&a.id)));
        builds
    }

    pub fn builds_with_status(&self, status: BuildStatus) -> Vec<Build> {
        let mut builds: Vec<Build> =
            self.state.lock().builds.values().filter(|b| b.status == status).cloned().collect();
        builds.sort_by_key(|b| b.queued_at_ms);
        builds
    }

    // --- logs ---

    /// Append an entry. Sequences must strictly increase per build.
    pub fn append_log(&self, entry: LogEntry) -> Result<(), StoreError> {
        let mut state = self.state.lock();
        let entries = state.logs.entry(entry.build_id.clone()).or_default();
        let last = entries.last().map_or(0, |e| e.sequence);
        if entry.sequence <= last {
            return Err(StoreError::OutOfOrder {
                build_id: entry.build_id,
                sequence: entry.sequence,
                last,
            });
        }
        entries.push(entry);
        Ok(())
    }

    /// Entries with `sequence > after`, ascending.
    pub fn logs_after(&self, build_id: &str, after: u64) -> Vec<LogEntry> {
        let state = self.state.lock();
        let Some(entries) = state.logs.get(build_id) else { return Vec::new() };
        let start = entries.partition_point(|e| e.sequence <= after);
        entries[start..].to_vec()
    }

    /// Entries with `sequence > after`, ascending, cut off at `limit`.
    pub fn logs_page(&self, build_id: &str, after: u64, limit: PageLimit) -> LogPage {
        let state = self.state.lock();
        let Some(entries) = state.logs.get(build_id) else { return LogPage::default() };
        let start = entries.partition_point(|e| e.sequence <= after);
        let tail = &entries[start..];

        let mut bytes = 0;
        let mut taken = 0;
        for entry in tail.iter().take(limit.entries.max(1)) {
            bytes += entry.message.len();
            if taken > 0 && bytes > limit.message_bytes {
                break;
            }
            taken += 1;
        }
        LogPage { entries: tail[..taken].to_vec(), has_more: taken < tail.len() }
    }

    pub fn last_sequence(&self, build_id: &str) -> u64 {
        self.state.lock().last_sequence(build_id)
    }

    // --- artifacts ---

    pub fn insert_artifact(&self, artifact: BuildArtifact) {
        self.state.lock().artifacts.insert(artifact.id.clone(), artifact);
    }

    pub fn artifacts_for_build(&self, build_id: &str) -> Vec<BuildArtifact> {
        let mut artifacts: Vec<BuildArtifact> = self
            .state
            .lock()
            .artifacts
            .values()
            .filter(|a| a.build_id.as_str() == build_id)
            .cloned()
            .collect();
        artifacts.sort_by_key(|a| a.created_at_ms);
        artifacts
    }

    pub fn artifact_count(&self) -> usize {
        self.state.lock().artifacts.len()
    }
}

/// Artifact record access used by the retention sweep.
pub trait ArtifactRepo: Send + Sync {
    /// Up to `limit` artifacts with `expires_at_ms <= now_ms`, earliest
    /// expiry first, skipping `exclude`.
    fn fetch_expired(
        &self,
        now_ms: u64,
        limit: usize,
        exclude: &HashSet<ArtifactId>,
    ) -> Result<Vec<BuildArtifact>, StoreError>;

    /// Delete the given records and commit. Returns how many existed.
    fn delete_artifacts(&self, ids: &[ArtifactId]) -> Result<usize, StoreError>;
}

impl ArtifactRepo for Store {
    fn fetch_expired(
        &self,
        now_ms: u64,
        limit: usize,
        exclude: &HashSet<ArtifactId>,
    ) -> Result<Vec<BuildArtifact>, StoreError> {
        let state = self.state.lock();
        let mut expired: Vec<&BuildArtifact> = state
            .artifacts
            .values()
            .filter(|a| a.is_expired(now_ms) && !exclude.contains(&a.id))
            .collect();
        expired.sort_by(|a, b| a.expires_at_ms.cmp(&b.expires_at_ms).then_with(|| a.id.cmp(&b.id)));
        Ok(expired.into_iter().take(limit).cloned().collect())
    }

    fn delete_artifacts(&self, ids: &[ArtifactId]) -> Result<usize, StoreError> {
        let removed = {
            let mut state = self.state.lock();
            ids.iter().filter(|id| state.artifacts.remove(*id).is_some()).count()
        };
        self.commit()?;
        Ok(removed)
    }
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
