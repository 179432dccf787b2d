// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Build control handlers.

use std::path::PathBuf;

use kiln_core::TriggerContext;
use kiln_engine::SweepReport;
use kiln_wire::{BuildSummary, Response, SweepSummary};

use super::{error_response, ListenCtx};

pub(super) fn handle_trigger(
    ctx: &ListenCtx,
    plan: PathBuf,
    profiles: Vec<String>,
    source: String,
) -> Response {
    if !plan.is_absolute() {
        return error_response(format!("plan path must be absolute: {}", plan.display()));
    }
    let trigger = TriggerContext::new(plan).profiles(profiles).source(source);
    match ctx.orchestrator.trigger(trigger) {
        Ok(id) => Response::Triggered { id },
        Err(e) => error_response(e),
    }
}

pub(super) fn handle_cancel(ctx: &ListenCtx, id: &str) -> Response {
    let build = match ctx.orchestrator.status(id) {
        Ok(build) => build,
        Err(e) => return error_response(e),
    };
    match ctx.orchestrator.cancel(build.id.as_str()) {
        Ok(status) => Response::Cancelled { id: build.id, status },
        Err(e) => error_response(e),
    }
}

pub(super) fn handle_retry(ctx: &ListenCtx, id: &str) -> Response {
    let original = match ctx.orchestrator.status(id) {
        Ok(build) => build,
        Err(e) => return error_response(e),
    };
    match ctx.orchestrator.retry(original.id.as_str()) {
        Ok(id) => Response::Retried { id, retry_of: original.id },
        Err(e) => error_response(e),
    }
}

pub(super) fn handle_status(ctx: &ListenCtx, id: &str) -> Response {
    match ctx.orchestrator.status(id) {
        Ok(build) => Response::Build { build: Box::new(build) },
        Err(e) => error_response(e),
    }
}

pub(super) fn handle_list(ctx: &ListenCtx) -> Response {
    let builds = ctx.orchestrator.list().iter().map(BuildSummary::from).collect();
    Response::Builds { builds }
}

pub(super) async fn handle_sweep(ctx: &ListenCtx) -> Response {
    match crate::lifecycle::sweep_now(&ctx.sweeper).await {
        Ok(report) => Response::Swept { report: summary(report) },
        Err(message) => Response::Error { message },
    }
}

fn summary(report: SweepReport) -> SweepSummary {
    SweepSummary {
        batches: report.batches,
        artifacts_deleted: report.artifacts_deleted,
        files_deleted: report.files_deleted,
        files_missing: report.files_missing,
        bytes_freed: report.bytes_freed,
        files_failed: report.files_failed,
    }
}
