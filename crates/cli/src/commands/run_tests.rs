// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use kiln_adapters::{FakeExecutor, FakeProbe};
use serial_test::serial;
use tempfile::TempDir;

const PLAN: &str = r#"
profiles = ["deploy"]

[[step]]
name = "install"
run = "npm"
args = ["ci"]

[[step]]
name = "test"
run = "npm"
args = ["test"]

[[step]]
name = "publish"
run = "az"
profile = "deploy"
"#;

struct Local {
    executor: FakeExecutor,
    plan: PathBuf,
    _tmp: TempDir,
}

fn local() -> Local {
    std::env::set_var("NO_COLOR", "1");
    let tmp = TempDir::new().unwrap();
    let plan = tmp.path().join("kiln.toml");
    std::fs::write(&plan, PLAN).unwrap();
    Local { executor: FakeExecutor::new(), plan, _tmp: tmp }
}

async fn run_plan(l: &Local, profiles: &[&str]) -> (Result<WorkflowReport>, String) {
    let logger = Arc::new(ConsoleLogger::new(Vec::new()));
    let profiles: Vec<String> = profiles.iter().map(|p| p.to_string()).collect();
    let report = run_local(
        &l.plan,
        &profiles,
        Arc::new(l.executor.clone()),
        Arc::new(ToolRegistry::with_probe(Arc::new(FakeProbe::new()))),
        Arc::clone(&logger),
        &CancellationToken::new(),
    )
    .await;
    let out = Arc::try_unwrap(logger).ok().unwrap().into_inner();
    (report, String::from_utf8(out).unwrap())
}

#[tokio::test]
#[serial]
async fn inactive_profile_steps_are_left_out() {
    let l = local();
    let (report, out) = run_plan(&l, &[]).await;
    let report = report.unwrap();

    assert_eq!(report.outcome, WorkflowOutcome::Succeeded);
    assert_eq!(report.steps.len(), 2);
    assert_eq!(l.executor.commands(), vec!["npm", "npm"]);
    assert!(out.starts_with("running 2 step(s)\n"), "{out}");
    assert!(finish(&report).is_ok());
}

#[tokio::test]
#[serial]
async fn requested_profile_adds_its_steps() {
    let l = local();
    let (report, _) = run_plan(&l, &["deploy"]).await;
    assert_eq!(report.unwrap().steps.len(), 3);
    assert_eq!(l.executor.commands(), vec!["npm", "npm", "az"]);
}

#[tokio::test]
#[serial]
async fn undeclared_profile_fails_before_any_step() {
    let l = local();
    let (report, out) = run_plan(&l, &["nightly"]).await;
    let err = report.unwrap_err();
    assert!(err.to_string().contains("nightly"), "{err}");
    assert!(l.executor.calls().is_empty());
    assert!(out.is_empty());
}

#[tokio::test]
#[serial]
async fn failing_step_exits_with_code_one() {
    let l = local();
    l.executor.fail("npm", "npm ERR! missing script: test");
    let (report, out) = run_plan(&l, &[]).await;
    let report = report.unwrap();

    assert_eq!(report.outcome, WorkflowOutcome::Failed);
    assert_eq!(report.skipped(), 1);
    assert!(out.contains("✗ step `install` failed"), "{out}");

    let err = finish(&report).unwrap_err();
    let exit = err.downcast_ref::<ExitError>().unwrap();
    assert_eq!(exit.code, 1);
    assert!(exit.message.starts_with("step `install` failed: npm ERR! missing script"), "{}", exit.message);
}

#[test]
fn stopped_run_exits_like_an_interrupt() {
    let report = WorkflowReport { outcome: WorkflowOutcome::Stopped, steps: vec![], elapsed_ms: 0 };
    let err = finish(&report).unwrap_err();
    assert_eq!(err.downcast_ref::<ExitError>().unwrap().code, 130);
}
