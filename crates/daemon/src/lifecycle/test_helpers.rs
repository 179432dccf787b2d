// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared helpers for lifecycle tests.

pub(super) use std::path::Path;
pub(super) use std::sync::Arc;

pub(super) use kiln_adapters::{FakeExecutor, ProcessExecutor};
pub(super) use kiln_core::{Build, BuildStatus, SystemClock, TriggerContext};
pub(super) use kiln_storage::Store;
pub(super) use tempfile::tempdir;

pub(super) use super::{Config, LifecycleError};

pub(super) fn test_config(dir: &Path) -> Config {
    Config::at(dir.join("state"))
}

pub(super) fn fake_executor() -> Arc<dyn ProcessExecutor> {
    Arc::new(FakeExecutor::new())
}

/// Write a snapshot holding one build per status.
pub(super) fn seed_snapshot(config: &Config, statuses: &[BuildStatus]) -> Vec<Build> {
    std::fs::create_dir_all(&config.state_dir).unwrap();
    let store = Store::open(&config.snapshot_path).unwrap();
    let mut builds = Vec::new();
    for status in statuses {
        let mut build = Build::new(TriggerContext::new("/work/kiln.toml"), &SystemClock);
        build.status = *status;
        store.insert_build(build.clone());
        builds.push(build);
    }
    store.commit().unwrap();
    builds
}
