// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon lifecycle management: startup, shutdown, recovery.

mod startup;
mod sweep;
pub use startup::startup;
pub use sweep::spawn_sweep_loop;
pub(crate) use sweep::sweep_now;

use std::fs::File;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use kiln_core::SystemClock;
use kiln_engine::{ArtifactSweeper, BuildOrchestrator, ControlError, JobReceiver, Recovery};
use kiln_storage::StoreError;
use thiserror::Error;
use tokio::net::UnixListener;
use tracing::{info, warn};

/// Orchestrator with the daemon's concrete clock
pub type DaemonOrchestrator = BuildOrchestrator<SystemClock>;

/// Daemon configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Root state directory (e.g. ~/.local/state/kiln)
    pub state_dir: PathBuf,
    /// Path to Unix socket
    pub socket_path: PathBuf,
    /// Path to lock/PID file
    pub lock_path: PathBuf,
    /// Path to daemon log file
    pub log_path: PathBuf,
    /// Path to the store snapshot
    pub snapshot_path: PathBuf,
    /// Per-build activity logs
    pub logs_path: PathBuf,
    /// Retained artifact copies
    pub artifacts_path: PathBuf,
    pub max_concurrent_builds: usize,
    pub build_timeout: Option<Duration>,
    pub artifact_retention: Duration,
    pub sweep_interval: Duration,
}

impl Config {
    /// Load configuration from the environment.
    ///
    /// One daemon serves all builds for a user.
    pub fn load() -> Result<Self, LifecycleError> {
        let mut config = Self::at(crate::env::state_dir()?);
        config.max_concurrent_builds = crate::env::max_concurrent_builds();
        config.build_timeout = crate::env::build_timeout();
        config.artifact_retention = crate::env::artifact_retention();
        config.sweep_interval = crate::env::sweep_interval();
        Ok(config)
    }

    /// Default layout rooted at `state_dir`.
    pub fn at(state_dir: impl Into<PathBuf>) -> Self {
        let state_dir = state_dir.into();
        Self {
            socket_path: state_dir.join("daemon.sock"),
            lock_path: state_dir.join("daemon.pid"),
            log_path: state_dir.join("daemon.log"),
            snapshot_path: state_dir.join("snapshot.zst"),
            logs_path: state_dir.join("logs"),
            artifacts_path: state_dir.join("artifacts"),
            max_concurrent_builds: 4,
            build_timeout: Some(Duration::from_secs(60 * 60)),
            artifact_retention: Duration::from_secs(7 * 24 * 60 * 60),
            sweep_interval: Duration::from_secs(60 * 60),
            state_dir,
        }
    }
}

/// Daemon state during operation.
pub struct DaemonState {
    pub config: Config,
    // NOTE(lifetime): Held to maintain exclusive file lock; released on drop
    #[allow(dead_code)]
    lock_file: File,
    pub orchestrator: Arc<DaemonOrchestrator>,
    pub sweeper: Arc<ArtifactSweeper<SystemClock>>,
    pub start_time: Instant,
}

/// Result of daemon startup: the daemon state plus the pieces to spawn.
pub struct StartupResult {
    pub daemon: DaemonState,
    /// The Unix socket listener to spawn as a task
    pub listener: UnixListener,
    /// Execution jobs for the worker loop
    pub jobs: JobReceiver,
    /// What startup reconciliation did
    pub recovery: Recovery,
}

impl DaemonState {
    /// Shutdown the daemon gracefully.
    ///
    /// Running builds should already have been interrupted and drained; this
    /// writes the final snapshot and removes the socket and PID files.
    pub fn shutdown(&mut self) -> Result<(), LifecycleError> {
        info!("Shutting down daemon...");

        self.orchestrator.interrupt_all();
        if let Err(e) = self.orchestrator.store().commit() {
            warn!("Failed to save shutdown snapshot: {}", e);
        }

        if self.config.socket_path.exists() {
            if let Err(e) = std::fs::remove_file(&self.config.socket_path) {
                warn!("Failed to remove socket file: {}", e);
            }
        }

        if self.config.lock_path.exists() {
            if let Err(e) = std::fs::remove_file(&self.config.lock_path) {
                warn!("Failed to remove PID file: {}", e);
            }
        }

        info!("Daemon shutdown complete");
        Ok(())
    }
}

/// Lifecycle errors
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("Could not determine state directory")]
    NoStateDir,

    #[error("Failed to acquire lock: daemon already running?")]
    LockFailed(#[source] std::io::Error),

    #[error("Failed to bind socket at {0}: {1}")]
    BindFailed(PathBuf, std::io::Error),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Recovery failed: {0}")]
    Recovery(#[from] ControlError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod test_helpers;

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
