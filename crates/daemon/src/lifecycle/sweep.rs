// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Scheduled artifact sweeps.

use std::sync::Arc;
use std::time::Duration;

use kiln_core::Clock;
use kiln_engine::{ArtifactSweeper, SweepReport};
use kiln_storage::StoreError;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

/// Run one sweep on the blocking pool.
pub(crate) async fn sweep_now<C: Clock>(
    sweeper: &Arc<ArtifactSweeper<C>>,
) -> Result<SweepReport, String> {
    let sweeper = Arc::clone(sweeper);
    match tokio::task::spawn_blocking(move || sweeper.sweep()).await {
        Ok(result) => result.map_err(|e: StoreError| e.to_string()),
        Err(e) => Err(format!("sweep task failed: {}", e)),
    }
}

/// Sweep once per `interval` (first sweep immediately) until `shutdown`.
pub fn spawn_sweep_loop<C: Clock>(
    sweeper: Arc<ArtifactSweeper<C>>,
    interval: Duration,
    shutdown: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = ticker.tick() => {}
            }
            if let Err(e) = sweep_now(&sweeper).await {
                tracing::error!(error = %e, "scheduled artifact sweep failed");
            }
        }
    })
}

#[cfg(test)]
#[path = "sweep_tests.rs"]
mod tests;
