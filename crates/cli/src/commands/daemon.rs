// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `kiln daemon` and `kiln sweep` - Daemon management

use anyhow::Result;
use clap::{Args, Subcommand};

use crate::client::DaemonClient;
use crate::output::{format_or_json, OutputFormat};

#[derive(Args)]
pub struct DaemonArgs {
    #[command(subcommand)]
    pub command: DaemonCommand,
}

#[derive(Subcommand)]
pub enum DaemonCommand {
    /// Check that the daemon is reachable
    Ping,
    /// Cancel running builds and stop the daemon
    Stop,
}

pub async fn daemon(client: &DaemonClient, args: DaemonArgs, format: OutputFormat) -> Result<()> {
    match args.command {
        DaemonCommand::Ping => ping(client, format).await,
        DaemonCommand::Stop => stop(client, format).await,
    }
}

async fn ping(client: &DaemonClient, format: OutputFormat) -> Result<()> {
    let running = match client.ping().await {
        Ok(()) => true,
        Err(e) if e.is_not_running() => false,
        Err(e) => return Err(e.into()),
    };
    let obj = serde_json::json!({
        "running": running,
        "socket": client.socket_path(),
    });
    format_or_json(format, &obj, || {
        if running {
            println!("Daemon running ({})", client.socket_path().display());
        } else {
            println!("Daemon not running");
        }
    })
}

async fn stop(client: &DaemonClient, format: OutputFormat) -> Result<()> {
    let stopped = match client.shutdown().await {
        Ok(()) => true,
        Err(e) if e.is_not_running() => false,
        Err(e) => return Err(e.into()),
    };
    let obj = serde_json::json!({ "stopped": stopped });
    format_or_json(format, &obj, || {
        if stopped {
            println!("Daemon stopping");
        } else {
            println!("Daemon not running");
        }
    })
}

/// Run an artifact sweep now instead of waiting for the schedule.
pub async fn sweep(client: &DaemonClient, format: OutputFormat) -> Result<()> {
    let report = client.sweep().await?;
    format_or_json(format, &report, || {
        println!(
            "Deleted {} artifact(s) in {} batch(es): {} file(s) removed, {} already missing, {} bytes freed",
            report.artifacts_deleted,
            report.batches,
            report.files_deleted,
            report.files_missing,
            report.bytes_freed
        );
        if report.files_failed > 0 {
            println!("{} file(s) could not be removed", report.files_failed);
        }
    })
}
