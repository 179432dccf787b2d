// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Listener task for handling socket I/O.
//!
//! The Listener runs in a spawned task, accepting connections and handling
//! each in its own task. Build control goes straight to the orchestrator;
//! `Follow` turns the connection into a log stream.

mod builds;
mod logs;

use std::sync::Arc;
use std::time::Instant;

use kiln_core::SystemClock;
use kiln_engine::ArtifactSweeper;
use kiln_wire::{self as wire, ProtocolError, Request, Response};
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite};
use tokio::net::UnixListener;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::env::ipc_timeout;
use crate::lifecycle::DaemonOrchestrator;

/// Shared daemon context for all request handlers.
pub struct ListenCtx {
    pub orchestrator: Arc<DaemonOrchestrator>,
    pub sweeper: Arc<ArtifactSweeper<SystemClock>>,
    pub start_time: Instant,
    /// Cancelled when a client requests shutdown
    pub shutdown: CancellationToken,
}

/// Listener task for accepting socket connections.
pub struct Listener {
    unix: UnixListener,
    ctx: Arc<ListenCtx>,
}

/// Errors from connection handling.
#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),
}

impl Listener {
    pub fn new(unix: UnixListener, ctx: Arc<ListenCtx>) -> Self {
        Self { unix, ctx }
    }

    /// Accept connections until shutdown, spawning a task for each.
    pub async fn run(self) {
        loop {
            tokio::select! {
                _ = self.ctx.shutdown.cancelled() => break,
                result = self.unix.accept() => match result {
                    Ok((stream, _)) => {
                        let ctx = Arc::clone(&self.ctx);
                        tokio::spawn(async move {
                            let (reader, writer) = stream.into_split();
                            if let Err(e) = handle_connection(reader, writer, &ctx).await {
                                log_connection_error(e);
                            }
                        });
                    }
                    Err(e) => error!("Unix accept error: {}", e),
                },
            }
        }
        debug!("listener stopped");
    }
}

fn log_connection_error(e: ConnectionError) {
    match e {
        ConnectionError::Protocol(ProtocolError::ConnectionClosed) => debug!("Client disconnected"),
        ConnectionError::Protocol(ProtocolError::Timeout) => warn!("Connection timeout"),
        _ => error!("Connection error: {}", e),
    }
}

/// Handle a single client connection.
///
/// The request handler races client disconnect detection: if the client
/// goes away first the handler is dropped.
pub(crate) async fn handle_connection<R, W>(
    mut reader: R,
    mut writer: W,
    ctx: &ListenCtx,
) -> Result<(), ConnectionError>
where
    R: AsyncRead + Unpin + Send + 'static,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let request = wire::read_request(&mut reader, ipc_timeout()).await?;

    // Log polling requests at debug level, other requests at info
    if matches!(request, Request::Ping | Request::Status { .. } | Request::List | Request::GetLogs { .. }) {
        debug!(request = ?request, "received request");
    } else {
        info!(request = ?request, "received request");
    }

    if let Request::Follow { id, after } = request {
        return logs::handle_follow(&id, after, reader, writer, ctx).await;
    }

    let response = tokio::select! {
        response = handle_request(request, ctx) => response,
        _ = detect_client_disconnect(&mut reader) => {
            debug!("Client disconnected, cancelling handler");
            return Ok(());
        }
    };

    debug!("Sending response: {:?}", response);
    wire::write_response(&mut writer, &response, ipc_timeout()).await?;
    Ok(())
}

/// Detect client disconnect by reading from the socket after the request.
///
/// The client sends one request then waits, so a read only returns when
/// the client closes its end.
async fn detect_client_disconnect<R: AsyncRead + Unpin>(reader: &mut R) {
    let mut buf = [0u8; 1];
    let _ = reader.read(&mut buf).await;
}

/// Handle a single request and return a response.
async fn handle_request(request: Request, ctx: &ListenCtx) -> Response {
    match request {
        Request::Ping => Response::Pong,

        Request::Trigger { plan, profiles, source } => {
            builds::handle_trigger(ctx, plan, profiles, source)
        }

        Request::Cancel { id } => builds::handle_cancel(ctx, &id),

        Request::Retry { id } => builds::handle_retry(ctx, &id),

        Request::Status { id } => builds::handle_status(ctx, &id),

        Request::List => builds::handle_list(ctx),

        Request::GetLogs { id, after } => logs::handle_get_logs(ctx, &id, after),

        Request::Sweep => builds::handle_sweep(ctx).await,

        Request::Shutdown => {
            info!(uptime_secs = ctx.start_time.elapsed().as_secs(), "shutdown requested by client");
            ctx.shutdown.cancel();
            Response::ShuttingDown
        }

        // Intercepted in handle_connection before reaching handle_request
        Request::Follow { .. } => {
            Response::Error { message: "follow must be the only request on a connection".to_string() }
        }
    }
}

fn error_response(e: impl std::fmt::Display) -> Response {
    Response::Error { message: e.to_string() }
}

#[cfg(test)]
pub(crate) fn test_ctx(
    executor: Arc<dyn kiln_adapters::ProcessExecutor>,
) -> (ListenCtx, kiln_engine::JobReceiver) {
    use kiln_engine::{BuildOrchestrator, JobQueue, LogBroadcaster, OrchestratorConfig};
    use kiln_storage::{ArtifactRepo, Store};

    let store = Arc::new(Store::in_memory());
    let broadcaster = Arc::new(LogBroadcaster::new(Arc::clone(&store), SystemClock));
    let (queue, jobs) = JobQueue::new();
    let orchestrator = Arc::new(BuildOrchestrator::new(
        Arc::clone(&store),
        broadcaster,
        executor,
        Arc::new(kiln_adapters::ToolRegistry::new()),
        queue,
        SystemClock,
        OrchestratorConfig::new(std::env::temp_dir().join("kiln-listener-tests")),
    ));
    let sweeper = Arc::new(ArtifactSweeper::new(store as Arc<dyn ArtifactRepo>, SystemClock));
    let ctx = ListenCtx {
        orchestrator,
        sweeper,
        start_time: Instant::now(),
        shutdown: CancellationToken::new(),
    };
    (ctx, jobs)
}

#[cfg(test)]
#[path = "../listener_tests.rs"]
mod tests;
