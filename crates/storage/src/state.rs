// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory record maps.

use kiln_core::{ArtifactId, Build, BuildArtifact, BuildId, LogEntry};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Build, log and artifact records.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct StoreState {
    pub builds: HashMap<BuildId, Build>,
    /// Per-build log entries in ascending sequence order
    #[serde(default)]
    pub logs: HashMap<BuildId, Vec<LogEntry>>,
    #[serde(default)]
    pub artifacts: HashMap<ArtifactId, BuildArtifact>,
}

impl StoreState {
    /// Get a build by exact ID or unique prefix (like git commit hashes).
    pub fn find_build(&self, query: &str) -> Option<&Build> {
        if let Some(build) = self.builds.get(query) {
            return Some(build);
        }
        let mut matches = self.builds.values().filter(|b| b.id.matches_prefix(query));
        match (matches.next(), matches.next()) {
            (Some(build), None) => Some(build),
            _ => None,
        }
    }

    pub fn last_sequence(&self, build_id: &str) -> u64 {
        self.logs.get(build_id).and_then(|entries| entries.last()).map_or(0, |e| e.sequence)
    }
}
