// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `kiln run` - Run a plan locally, without the daemon

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use clap::Args;
use kiln_adapters::{ProcessExecutor, SystemExecutor, ToolRegistry};
use kiln_core::WorkflowOutcome;
use kiln_engine::{FullLogger, Observers, WorkflowReport, WorkflowRunner};
use tokio_util::sync::CancellationToken;

use crate::console::ConsoleLogger;
use crate::exit_error::ExitError;

#[derive(Args)]
pub struct RunArgs {
    /// Plan file to run
    #[arg(default_value = "kiln.toml")]
    pub plan: PathBuf,

    /// Activate a declared profile (can be repeated)
    #[arg(short = 'p', long = "profile")]
    pub profiles: Vec<String>,
}

pub async fn run(args: RunArgs) -> Result<()> {
    let cancel = CancellationToken::new();
    let interrupt = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                cancel.cancel();
            }
        })
    };

    let report = run_local(
        &args.plan,
        &args.profiles,
        Arc::new(SystemExecutor),
        Arc::new(ToolRegistry::with_builtin_checkers()),
        Arc::new(ConsoleLogger::stdout()),
        &cancel,
    )
    .await;
    interrupt.abort();
    finish(&report?)
}

/// Compile `plan` and run its steps with `logger` observing everything.
pub async fn run_local<L: FullLogger + 'static>(
    plan: &Path,
    profiles: &[String],
    executor: Arc<dyn ProcessExecutor>,
    tools: Arc<ToolRegistry>,
    logger: Arc<L>,
    cancel: &CancellationToken,
) -> Result<WorkflowReport> {
    let compiled = kiln_plan::compile_file(plan, profiles, executor)?;
    let runner = WorkflowRunner::new(tools).with_observers(Observers::new().with_full(logger));
    Ok(runner.run(&compiled.steps, cancel).await)
}

fn finish(report: &WorkflowReport) -> Result<()> {
    match report.outcome {
        WorkflowOutcome::Succeeded => Ok(()),
        WorkflowOutcome::Failed => {
            let message = report.error_message().unwrap_or_else(|| "build failed".to_string());
            Err(ExitError::new(1, message).into())
        }
        WorkflowOutcome::Stopped => Err(ExitError::new(130, "build cancelled").into()),
    }
}

#[cfg(test)]
#[path = "run_tests.rs"]
mod tests;
