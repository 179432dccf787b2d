// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! kiln: run build plans locally or control builds on the daemon.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod client;
mod color;
mod commands;
mod console;
mod exit_error;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};

use client::DaemonClient;
use commands::{build, daemon, logs, run};
use exit_error::ExitError;
use output::OutputFormat;

#[derive(Parser)]
#[command(name = "kiln", version, about = "Kiln build pipeline", styles = color::styles())]
struct Cli {
    /// Output format
    #[arg(short = 'o', long = "output", value_enum, default_value_t, global = true)]
    output: OutputFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run a plan locally without the daemon
    Run(run::RunArgs),
    /// Queue a build on the daemon
    Trigger(build::TriggerArgs),
    /// Cancel a queued or running build
    Cancel {
        /// Build ID (prefix match)
        id: String,
    },
    /// Queue a new build from a finished one
    Retry {
        /// Build ID (prefix match)
        id: String,
        /// Stream the new build's log until it finishes
        #[arg(long, short)]
        follow: bool,
    },
    /// Show details of a build
    Status {
        /// Build ID (prefix match)
        id: String,
    },
    /// List builds, newest first
    List,
    /// Show a build's log
    Logs {
        /// Build ID (prefix match)
        id: String,
        /// Only entries with a higher sequence number
        #[arg(long, default_value_t = 0)]
        after: u64,
        /// Stream live entries until the build finishes
        #[arg(long, short)]
        follow: bool,
    },
    /// Delete expired artifacts now
    Sweep,
    /// Daemon management
    Daemon(daemon::DaemonArgs),
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    if let Err(e) = dispatch(cli).await {
        match e.downcast_ref::<ExitError>() {
            Some(exit) => {
                eprintln!("{}", exit.message);
                std::process::exit(exit.code);
            }
            None => {
                eprintln!("error: {:#}", e);
                std::process::exit(1);
            }
        }
    }
}

async fn dispatch(cli: Cli) -> Result<()> {
    let format = cli.output;
    let connect = DaemonClient::connect;
    match cli.command {
        Command::Run(args) => run::run(args).await,
        Command::Trigger(args) => build::trigger(&connect()?, args, format).await,
        Command::Cancel { id } => build::cancel(&connect()?, &id, format).await,
        Command::Retry { id, follow } => build::retry(&connect()?, &id, follow, format).await,
        Command::Status { id } => build::status(&connect()?, &id, format).await,
        Command::List => build::list(&connect()?, format).await,
        Command::Logs { id, after, follow } => {
            logs::logs(&connect()?, &id, after, follow, format).await
        }
        Command::Sweep => daemon::sweep(&connect()?, format).await,
        Command::Daemon(args) => daemon::daemon(&connect()?, args, format).await,
    }
}
