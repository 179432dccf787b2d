// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Retained build output files.

use crate::build::BuildId;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

crate::define_id! {
    /// Unique identifier for a registered artifact.
    pub struct ArtifactId("art-");
}

/// A retained output file of a build, reclaimed once `expires_at_ms` passes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildArtifact {
    pub id: ArtifactId,
    pub build_id: BuildId,
    /// Server-owned copy of the file
    pub storage_path: PathBuf,
    pub size_bytes: u64,
    pub created_at_ms: u64,
    pub expires_at_ms: u64,
}

impl BuildArtifact {
    pub fn is_expired(&self, now_ms: u64) -> bool {
        self.expires_at_ms <= now_ms
    }
}
