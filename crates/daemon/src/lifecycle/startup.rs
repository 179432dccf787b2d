// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon startup and initialization logic.

use std::io::Write;
use std::sync::Arc;
use std::time::Instant;

use fs2::FileExt;
use kiln_adapters::{ProcessExecutor, ToolRegistry};
use kiln_core::SystemClock;
use kiln_engine::{ArtifactSweeper, BuildOrchestrator, JobQueue, LogBroadcaster, OrchestratorConfig};
use kiln_storage::{ArtifactRepo, Store};
use tokio::net::UnixListener;
use tracing::info;

use super::{Config, DaemonState, LifecycleError, StartupResult};

/// Start the daemon
pub async fn startup(
    config: &Config,
    executor: Arc<dyn ProcessExecutor>,
) -> Result<StartupResult, LifecycleError> {
    match startup_inner(config, executor).await {
        Ok(result) => Ok(result),
        Err(e) => {
            // Don't clean up if we failed to acquire the lock:
            // those files belong to the already-running daemon.
            if !matches!(e, LifecycleError::LockFailed(_)) {
                cleanup_on_failure(config);
            }
            Err(e)
        }
    }
}

/// Inner startup logic - cleanup_on_failure called if this fails
async fn startup_inner(
    config: &Config,
    executor: Arc<dyn ProcessExecutor>,
) -> Result<StartupResult, LifecycleError> {
    // 1. Create state directory
    std::fs::create_dir_all(&config.state_dir)?;

    // 2. Acquire lock file FIRST - prevents races.
    // Open without truncating so a running daemon's PID survives.
    let lock_file = std::fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(false)
        .open(&config.lock_path)?;
    lock_file.try_lock_exclusive().map_err(LifecycleError::LockFailed)?;

    let mut lock_file = lock_file;
    lock_file.set_len(0)?;
    writeln!(lock_file, "{}", std::process::id())?;
    let lock_file = lock_file;

    // 3. Create directories
    std::fs::create_dir_all(&config.logs_path)?;
    std::fs::create_dir_all(&config.artifacts_path)?;

    // 4. Load state from snapshot (if exists)
    let store = Arc::new(Store::open(&config.snapshot_path)?);
    let (builds, artifacts) = store.read(|s| (s.builds.len(), s.artifacts.len()));
    info!(builds, artifacts, "Recovered state");

    // 5. Wire the engine
    let broadcaster = Arc::new(LogBroadcaster::new(Arc::clone(&store), SystemClock));
    let tools = Arc::new(ToolRegistry::with_builtin_checkers());
    let (queue, jobs) = JobQueue::new();
    let orchestrator = Arc::new(BuildOrchestrator::new(
        Arc::clone(&store),
        broadcaster,
        executor,
        tools,
        queue,
        SystemClock,
        OrchestratorConfig {
            artifact_dir: config.artifacts_path.clone(),
            log_dir: Some(config.logs_path.clone()),
            build_timeout: config.build_timeout,
            artifact_retention: config.artifact_retention,
        },
    ));
    let sweeper = Arc::new(ArtifactSweeper::new(store as Arc<dyn ArtifactRepo>, SystemClock));

    // 6. Fail interrupted builds and requeue queued ones
    let recovery = orchestrator.recover()?;
    if !recovery.interrupted.is_empty() || !recovery.requeued.is_empty() {
        info!(
            interrupted = recovery.interrupted.len(),
            requeued = recovery.requeued.len(),
            "reconciled builds from previous run"
        );
    }

    // 7. Remove stale socket and bind (LAST - only after all validation passes)
    if config.socket_path.exists() {
        std::fs::remove_file(&config.socket_path)?;
    }
    let listener = UnixListener::bind(&config.socket_path)
        .map_err(|e| LifecycleError::BindFailed(config.socket_path.clone(), e))?;

    info!("Daemon started");

    Ok(StartupResult {
        daemon: DaemonState {
            config: config.clone(),
            lock_file,
            orchestrator,
            sweeper,
            start_time: Instant::now(),
        },
        listener,
        jobs,
        recovery,
    })
}

/// Clean up resources on startup failure
fn cleanup_on_failure(config: &Config) {
    if config.socket_path.exists() {
        let _ = std::fs::remove_file(&config.socket_path);
    }
    if config.lock_path.exists() {
        let _ = std::fs::remove_file(&config.lock_path);
    }
}

#[cfg(test)]
#[path = "startup_tests.rs"]
mod tests;
