// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! kilnd: the Kiln build daemon.

use std::ffi::OsStr;
use std::sync::Arc;

use anyhow::Context;
use kiln_adapters::SystemExecutor;
use kiln_daemon::env;
use kiln_daemon::lifecycle::{spawn_sweep_loop, startup, Config};
use kiln_daemon::{ListenCtx, Listener};
use kiln_engine::run_jobs;
use tokio::signal::unix::{signal, SignalKind};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::prelude::*;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::load()?;
    std::fs::create_dir_all(&config.state_dir)
        .with_context(|| format!("creating {}", config.state_dir.display()))?;

    let log_dir = config.log_path.parent().unwrap_or(config.state_dir.as_path());
    let log_name = config.log_path.file_name().unwrap_or(OsStr::new("daemon.log"));
    let appender = tracing_appender::rolling::never(log_dir, log_name);
    let (writer, _guard) = tracing_appender::non_blocking(appender);
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(writer)
                .with_filter(tracing_subscriber::EnvFilter::new(env::log_filter())),
        )
        .init();

    let started = match startup(&config, Arc::new(SystemExecutor)).await {
        Ok(started) => started,
        Err(e) => {
            error!("startup failed: {}", e);
            return Err(e.into());
        }
    };
    let mut daemon = started.daemon;
    info!(
        socket = %config.socket_path.display(),
        requeued = started.recovery.requeued.len(),
        "listening"
    );

    let shutdown = CancellationToken::new();
    let ctx = Arc::new(ListenCtx {
        orchestrator: Arc::clone(&daemon.orchestrator),
        sweeper: Arc::clone(&daemon.sweeper),
        start_time: daemon.start_time,
        shutdown: shutdown.clone(),
    });

    let listener = tokio::spawn(Listener::new(started.listener, ctx).run());
    let workers = tokio::spawn(run_jobs(
        started.jobs,
        Arc::clone(&daemon.orchestrator),
        config.max_concurrent_builds,
        shutdown.clone(),
    ));
    let sweeps = spawn_sweep_loop(Arc::clone(&daemon.sweeper), config.sweep_interval, shutdown.clone());

    let mut sigterm = signal(SignalKind::terminate())?;
    tokio::select! {
        _ = tokio::signal::ctrl_c() => info!("received SIGINT"),
        _ = sigterm.recv() => info!("received SIGTERM"),
        _ = shutdown.cancelled() => info!("shutdown requested"),
    }

    // Stop the workers from taking new jobs before interrupting, so no build
    // can start after the sweep over running ones. Then give them a bounded
    // window to record the interruption.
    shutdown.cancel();
    daemon.orchestrator.interrupt_all();
    if tokio::time::timeout(env::drain_timeout(), workers).await.is_err() {
        warn!(
            active = daemon.orchestrator.active_count(),
            "drain timeout elapsed with builds still running"
        );
    }
    let _ = listener.await;
    let _ = sweeps.await;

    daemon.shutdown()?;
    Ok(())
}
