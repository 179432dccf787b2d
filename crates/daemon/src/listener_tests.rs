// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use kiln_adapters::FakeExecutor;
use kiln_core::{BuildStatus, LogEntry, LogLine, LogStream};
use std::path::Path;
use std::time::Duration;
use tempfile::TempDir;

const PLAN: &str = r#"
[[step]]
name = "compile"
run = "make"

[[step]]
name = "test"
run = "make"
args = ["test"]
"#;

struct Fixture {
    ctx: Arc<ListenCtx>,
    executor: FakeExecutor,
    plan: std::path::PathBuf,
    _jobs: kiln_engine::JobReceiver,
    _tmp: TempDir,
}

fn fixture() -> Fixture {
    let tmp = TempDir::new().unwrap();
    let plan = tmp.path().join("kiln.toml");
    std::fs::write(&plan, PLAN).unwrap();
    let executor = FakeExecutor::new();
    let (ctx, jobs) = test_ctx(Arc::new(executor.clone()));
    Fixture { ctx: Arc::new(ctx), executor, plan, _jobs: jobs, _tmp: tmp }
}

/// Send one request over an in-memory connection and collect every
/// response frame until the daemon closes it.
async fn exchange(ctx: &Arc<ListenCtx>, request: Request) -> Vec<Response> {
    let (mut client, server) = tokio::io::duplex(64 * 1024);
    let ctx = Arc::clone(ctx);
    let server = tokio::spawn(async move {
        let (reader, writer) = tokio::io::split(server);
        handle_connection(reader, writer, &ctx).await
    });

    wire::write_request(&mut client, &request, Duration::from_secs(5)).await.unwrap();
    let mut responses = Vec::new();
    loop {
        match wire::read_response(&mut client, Duration::from_secs(5)).await {
            Ok(response) => responses.push(response),
            Err(ProtocolError::ConnectionClosed) => break,
            Err(e) => panic!("unexpected protocol error: {e}"),
        }
    }
    server.await.unwrap().unwrap();
    responses
}

async fn one(ctx: &Arc<ListenCtx>, request: Request) -> Response {
    let mut responses = exchange(ctx, request).await;
    assert_eq!(responses.len(), 1, "{responses:?}");
    responses.remove(0)
}

fn trigger_request(plan: &Path) -> Request {
    Request::Trigger { plan: plan.to_path_buf(), profiles: vec![], source: "test".to_string() }
}

async fn trigger(f: &Fixture) -> kiln_core::BuildId {
    match one(&f.ctx, trigger_request(&f.plan)).await {
        Response::Triggered { id } => id,
        other => panic!("expected Triggered, got {other:?}"),
    }
}

fn sequences(entries: &[LogEntry]) -> Vec<u64> {
    entries.iter().map(|e| e.sequence).collect()
}

#[tokio::test]
async fn ping_pongs() {
    let f = fixture();
    assert_eq!(one(&f.ctx, Request::Ping).await, Response::Pong);
}

#[tokio::test]
async fn trigger_then_status_and_list() {
    let f = fixture();
    let id = trigger(&f).await;

    match one(&f.ctx, Request::Status { id: id.short(8).to_string() }).await {
        Response::Build { build } => {
            assert_eq!(build.id, id);
            assert_eq!(build.status, BuildStatus::Queued);
            assert_eq!(build.trigger.source, "test");
        }
        other => panic!("expected Build, got {other:?}"),
    }
    match one(&f.ctx, Request::List).await {
        Response::Builds { builds } => {
            assert_eq!(builds.len(), 1);
            assert_eq!(builds[0].id, id);
            assert_eq!(builds[0].plan, f.plan);
        }
        other => panic!("expected Builds, got {other:?}"),
    }
}

#[tokio::test]
async fn relative_plan_is_rejected() {
    let f = fixture();
    let response = one(&f.ctx, trigger_request(Path::new("kiln.toml"))).await;
    assert!(matches!(response, Response::Error { ref message } if message.contains("absolute")));
}

#[tokio::test]
async fn unknown_build_is_an_error() {
    let f = fixture();
    let response = one(&f.ctx, Request::Status { id: "bld-zzzz".to_string() }).await;
    assert_eq!(response, Response::Error { message: "build not found: bld-zzzz".to_string() });
}

#[tokio::test]
async fn cancel_queued_then_cancel_again_is_rejected() {
    let f = fixture();
    let id = trigger(&f).await;

    let response = one(&f.ctx, Request::Cancel { id: id.to_string() }).await;
    assert_eq!(response, Response::Cancelled { id: id.clone(), status: BuildStatus::Cancelled });

    match one(&f.ctx, Request::Cancel { id: id.to_string() }).await {
        Response::Error { message } => assert!(message.contains("cannot move from cancelled"), "{message}"),
        other => panic!("expected Error, got {other:?}"),
    }
}

#[tokio::test]
async fn retry_of_failed_build_links_to_original() {
    let f = fixture();
    f.executor.fail("make", "make: *** [all] Error 2");
    let id = trigger(&f).await;
    f.ctx.orchestrator.execute(&id).await.unwrap();

    match one(&f.ctx, Request::Retry { id: id.to_string() }).await {
        Response::Retried { id: retry, retry_of } => {
            assert_ne!(retry, id);
            assert_eq!(retry_of, id);
        }
        other => panic!("expected Retried, got {other:?}"),
    }
}

#[tokio::test]
async fn get_logs_catch_up_is_gap_free_and_idempotent() {
    let f = fixture();
    let id = trigger(&f).await;
    f.ctx.orchestrator.execute(&id).await.unwrap();

    let (entries, status, is_complete) = match one(&f.ctx, Request::GetLogs { id: id.to_string(), after: 0 }).await {
        Response::Logs { entries, status, is_complete } => (entries, status, is_complete),
        other => panic!("expected Logs, got {other:?}"),
    };
    assert_eq!(status, BuildStatus::Succeeded);
    assert!(is_complete);
    let expected: Vec<u64> = (1..=entries.len() as u64).collect();
    assert_eq!(sequences(&entries), expected);

    let again = one(&f.ctx, Request::GetLogs { id: id.to_string(), after: 0 }).await;
    assert_eq!(again, Response::Logs { entries: entries.clone(), status, is_complete });

    let last = entries.len() as u64;
    match one(&f.ctx, Request::GetLogs { id: id.to_string(), after: last }).await {
        Response::Logs { entries, .. } => assert!(entries.is_empty()),
        other => panic!("expected Logs, got {other:?}"),
    }
}

#[tokio::test]
async fn follow_finished_build_sends_backlog_then_done() {
    let f = fixture();
    let id = trigger(&f).await;
    f.ctx.orchestrator.execute(&id).await.unwrap();

    let responses = exchange(&f.ctx, Request::Follow { id: id.to_string(), after: 2 }).await;

    assert_eq!(responses.len(), 2, "{responses:?}");
    match &responses[0] {
        Response::Logs { entries, is_complete, .. } => {
            assert!(is_complete);
            assert_eq!(entries.first().map(|e| e.sequence), Some(3));
        }
        other => panic!("expected Logs, got {other:?}"),
    }
    assert_eq!(responses[1], Response::Done { status: BuildStatus::Succeeded });
}

/// Finish a build, then pad its log past the frame size limit.
async fn build_with_oversized_log(f: &Fixture) -> (kiln_core::BuildId, u64) {
    let id = trigger(f).await;
    f.ctx.orchestrator.execute(&id).await.unwrap();
    let broadcaster = f.ctx.orchestrator.broadcaster();
    let text = "x".repeat(200);
    for _ in 0..100_000 {
        broadcaster.publish(&id, LogLine::output(LogStream::Stdout, text.clone())).unwrap();
    }
    let total = broadcaster.store().last_sequence(id.as_str());
    (id, total)
}

#[tokio::test]
async fn get_logs_pages_a_log_larger_than_one_frame() {
    let f = fixture();
    let (id, total) = build_with_oversized_log(&f).await;

    let mut after = 0;
    loop {
        match one(&f.ctx, Request::GetLogs { id: id.to_string(), after }).await {
            Response::Logs { entries, is_complete, .. } => {
                assert!(!entries.is_empty());
                assert_eq!(entries[0].sequence, after + 1);
                after = entries[entries.len() - 1].sequence;
                if is_complete {
                    break;
                }
            }
            other => panic!("expected Logs, got {other:?}"),
        }
    }
    assert_eq!(after, total);
}

#[tokio::test]
async fn follow_resumes_a_log_larger_than_one_frame() {
    let f = fixture();
    let (id, total) = build_with_oversized_log(&f).await;

    let responses = exchange(&f.ctx, Request::Follow { id: id.to_string(), after: 0 }).await;
    let mut seen = Vec::new();
    match &responses[0] {
        Response::Logs { entries, is_complete, .. } => {
            assert!(!is_complete);
            seen.extend(sequences(entries));
        }
        other => panic!("expected Logs, got {other:?}"),
    }
    for response in &responses[1..responses.len() - 1] {
        match response {
            Response::Entry { entry } => seen.push(entry.sequence),
            other => panic!("expected Entry, got {other:?}"),
        }
    }
    assert_eq!(responses.last(), Some(&Response::Done { status: BuildStatus::Succeeded }));
    assert_eq!(seen, (1..=total).collect::<Vec<_>>());
}

#[tokio::test]
async fn follow_streams_live_entries_until_build_ends() {
    let f = fixture();
    f.executor.hang("make");
    let id = trigger(&f).await;

    let orchestrator = Arc::clone(&f.ctx.orchestrator);
    let run_id = id.clone();
    let run = tokio::spawn(async move { orchestrator.execute(&run_id).await });
    while f.executor.calls().is_empty() {
        tokio::task::yield_now().await;
    }

    let follower = {
        let ctx = Arc::clone(&f.ctx);
        let id = id.to_string();
        tokio::spawn(async move { exchange(&ctx, Request::Follow { id, after: 0 }).await })
    };
    while f.ctx.orchestrator.broadcaster().subscriber_count(&id) == 0 {
        tokio::task::yield_now().await;
    }
    f.ctx.orchestrator.cancel(id.as_str()).unwrap();
    assert_eq!(run.await.unwrap().unwrap(), BuildStatus::Cancelled);

    let responses = follower.await.unwrap();
    let mut seen = Vec::new();
    match &responses[0] {
        Response::Logs { entries, is_complete, .. } => {
            assert!(!is_complete);
            seen.extend(sequences(entries));
        }
        other => panic!("expected Logs, got {other:?}"),
    }
    for response in &responses[1..responses.len() - 1] {
        match response {
            Response::Entry { entry } => seen.push(entry.sequence),
            other => panic!("expected Entry, got {other:?}"),
        }
    }
    assert_eq!(responses.last(), Some(&Response::Done { status: BuildStatus::Cancelled }));

    let expected: Vec<u64> = (1..=f.ctx.orchestrator.store().last_sequence(id.as_str())).collect();
    assert_eq!(seen, expected);
}

#[tokio::test]
async fn follow_unknown_build_is_an_error() {
    let f = fixture();
    let responses = exchange(&f.ctx, Request::Follow { id: "bld-nope".to_string(), after: 0 }).await;
    assert!(matches!(responses.as_slice(), [Response::Error { .. }]));
}

#[tokio::test]
async fn sweep_reports_counters() {
    let f = fixture();
    match one(&f.ctx, Request::Sweep).await {
        Response::Swept { report } => assert_eq!(report.batches, 0),
        other => panic!("expected Swept, got {other:?}"),
    }
}

#[tokio::test]
async fn shutdown_request_cancels_token() {
    let f = fixture();
    assert_eq!(one(&f.ctx, Request::Shutdown).await, Response::ShuttingDown);
    assert!(f.ctx.shutdown.is_cancelled());
}
