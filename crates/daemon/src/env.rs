// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for the daemon crate.

use std::path::PathBuf;
use std::time::Duration;

use crate::lifecycle::LifecycleError;

/// Resolve state directory: KILN_STATE_DIR > XDG_STATE_HOME/kiln > ~/.local/state/kiln
pub fn state_dir() -> Result<PathBuf, LifecycleError> {
    if let Ok(dir) = std::env::var("KILN_STATE_DIR") {
        return Ok(PathBuf::from(dir));
    }
    if let Ok(xdg) = std::env::var("XDG_STATE_HOME") {
        return Ok(PathBuf::from(xdg).join("kiln"));
    }
    let home = dirs::home_dir().ok_or(LifecycleError::NoStateDir)?;
    Ok(home.join(".local/state/kiln"))
}

fn parse_env<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|s| s.trim().parse::<T>().ok())
}

/// Default IPC timeout
pub fn ipc_timeout() -> Duration {
    parse_env::<u64>("KILN_IPC_TIMEOUT_MS").map(Duration::from_millis).unwrap_or(Duration::from_secs(5))
}

/// Builds allowed to execute at once (default 4)
pub fn max_concurrent_builds() -> usize {
    parse_env::<usize>("KILN_MAX_CONCURRENT_BUILDS").filter(|n| *n > 0).unwrap_or(4)
}

/// Overall budget per build (default 1h). `-1` disables it.
pub fn build_timeout() -> Option<Duration> {
    match parse_env::<i64>("KILN_BUILD_TIMEOUT_MS") {
        Some(-1) => None,
        Some(ms) if ms > 0 => Some(Duration::from_millis(ms as u64)),
        _ => Some(Duration::from_secs(60 * 60)),
    }
}

/// How long retained artifacts live (default 7 days)
pub fn artifact_retention() -> Duration {
    let days = parse_env::<u64>("KILN_ARTIFACT_RETENTION_DAYS").unwrap_or(7);
    Duration::from_secs(days * 24 * 60 * 60)
}

/// Interval between scheduled artifact sweeps (default 1h)
pub fn sweep_interval() -> Duration {
    parse_env::<u64>("KILN_SWEEP_INTERVAL_MS")
        .filter(|ms| *ms > 0)
        .map(Duration::from_millis)
        .unwrap_or(Duration::from_secs(60 * 60))
}

/// Shutdown drain timeout for in-flight builds (default 10s)
pub fn drain_timeout() -> Duration {
    parse_env::<u64>("KILN_DRAIN_TIMEOUT_MS").map(Duration::from_millis).unwrap_or(Duration::from_secs(10))
}

/// Log filter directive: KILN_LOG > RUST_LOG > "info"
pub fn log_filter() -> String {
    std::env::var("KILN_LOG")
        .or_else(|_| std::env::var("RUST_LOG"))
        .unwrap_or_else(|_| "info".to_string())
}

#[cfg(test)]
#[path = "env_tests.rs"]
mod tests;
