// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `kiln logs` - Build log catch-up and live follow

use anyhow::Result;
use kiln_core::{BuildStatus, LogEntry};

use crate::client::DaemonClient;
use crate::color;
use crate::exit_error::ExitError;
use crate::output::{format_or_json, print_entry, OutputFormat};

pub async fn logs(
    client: &DaemonClient,
    id: &str,
    after: u64,
    follow: bool,
    format: OutputFormat,
) -> Result<()> {
    if follow {
        return self::follow(client, id, after, format).await;
    }

    let page = client.logs(id, after).await?;
    let obj = serde_json::json!({
        "entries": page.entries,
        "status": page.status,
        "is_complete": page.is_complete,
    });
    format_or_json(format, &obj, || {
        if page.entries.is_empty() {
            eprintln!("No log entries after sequence {}", after);
        }
        for entry in &page.entries {
            print_entry(entry);
        }
        if !page.is_complete {
            eprintln!("build is {} (use --follow to stream)", color::status(page.status));
        }
    })
}

/// Stream until the build finishes; a build that did not succeed exits
/// non-zero.
pub async fn follow(client: &DaemonClient, id: &str, after: u64, format: OutputFormat) -> Result<()> {
    let status = client.follow(id, after, |entry| emit(entry, format)).await?;
    if format == OutputFormat::Text {
        println!("Build {}", color::status(status));
    }
    match status {
        BuildStatus::Succeeded => Ok(()),
        other => Err(ExitError::for_status(other, format!("build {}", other)).into()),
    }
}

fn emit(entry: &LogEntry, format: OutputFormat) {
    match format {
        OutputFormat::Text => print_entry(entry),
        // One JSON object per line so the stream can be piped
        OutputFormat::Json => match serde_json::to_string(entry) {
            Ok(json) => println!("{}", json),
            Err(e) => eprintln!("failed to encode log entry {}: {}", entry.sequence, e),
        },
    }
}
