// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Log catch-up and follow streams.

use kiln_storage::PageLimit;
use kiln_wire::{self as wire, Response};
use tokio::io::{AsyncRead, AsyncWrite};
use tracing::debug;

use super::{detect_client_disconnect, error_response, ConnectionError, ListenCtx};
use crate::env::ipc_timeout;

/// One page of entries after `after`. `is_complete` is false while the
/// build runs or more stored entries remain.
pub(super) fn handle_get_logs(ctx: &ListenCtx, id: &str, after: u64) -> Response {
    let build = match ctx.orchestrator.status(id) {
        Ok(build) => build,
        Err(e) => return error_response(e),
    };
    match ctx.orchestrator.broadcaster().catch_up(build.id.as_str(), after) {
        Ok(catch_up) => Response::Logs {
            entries: catch_up.entries,
            status: catch_up.status,
            is_complete: catch_up.is_complete,
        },
        Err(e) => error_response(e),
    }
}

/// Stream a build's log: one `Logs` frame with the first page of the
/// backlog, an `Entry` frame for each later entry (stored or live), then
/// `Done` once the build completes.
///
/// The subscription is dropped as soon as the client disconnects.
pub(super) async fn handle_follow<R, W>(
    id: &str,
    after: u64,
    mut reader: R,
    mut writer: W,
    ctx: &ListenCtx,
) -> Result<(), ConnectionError>
where
    R: AsyncRead + Unpin + Send + 'static,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let timeout = ipc_timeout();
    let broadcaster = ctx.orchestrator.broadcaster();
    let follow =
        ctx.orchestrator.status(id).and_then(|b| broadcaster.follow(&b.id, after, PageLimit::default()));
    let mut follow = match follow {
        Ok(follow) => follow,
        Err(e) => {
            wire::write_response(&mut writer, &error_response(e), timeout).await?;
            return Ok(());
        }
    };

    let backlog = Response::Logs {
        entries: std::mem::take(&mut follow.backlog.entries),
        status: follow.backlog.status,
        is_complete: follow.backlog.is_complete,
    };
    wire::write_response(&mut writer, &backlog, timeout).await?;
    if follow.backlog.is_complete {
        let done = Response::Done { status: follow.backlog.status };
        wire::write_response(&mut writer, &done, timeout).await?;
        return Ok(());
    }

    let build_id = follow.build_id.clone();
    let subscriber_id = follow.subscriber_id;
    let streamed = loop {
        tokio::select! {
            entry = follow.next() => match entry {
                Some(entry) => {
                    if let Err(e) = wire::write_response(&mut writer, &Response::Entry { entry }, timeout).await {
                        break Err(e);
                    }
                }
                None => break Ok(()),
            },
            _ = detect_client_disconnect(&mut reader) => {
                debug!(build_id = %build_id, "follower disconnected");
                break Err(kiln_wire::ProtocolError::ConnectionClosed);
            }
        }
    };
    broadcaster.unsubscribe(&build_id, subscriber_id);
    streamed?;

    let status = match ctx.orchestrator.status(build_id.as_str()) {
        Ok(build) => build.status,
        Err(_) => follow.backlog.status,
    };
    wire::write_response(&mut writer, &Response::Done { status }, timeout).await?;
    Ok(())
}
