// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use clap::ValueEnum;
use kiln_core::{format_elapsed, format_utc, short, Build, LogEntry, LogStream};
use kiln_wire::BuildSummary;
use serde::Serialize;

use crate::color;

#[cfg(test)]
#[path = "output_tests.rs"]
mod tests;

/// Characters of a build id shown in tables.
const SHORT_ID: usize = 12;

#[derive(Clone, Copy, Debug, Default, PartialEq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Print `data` as pretty JSON, or run `text_fn` for text output.
pub fn format_or_json<T: Serialize>(
    format: OutputFormat,
    data: &T,
    text_fn: impl FnOnce(),
) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(data)?);
        }
        OutputFormat::Text => {
            text_fn();
        }
    }
    Ok(())
}

/// Format a timestamp as relative time (e.g., "5s", "2m", "1h", "3d")
pub fn format_time_ago(epoch_ms: u64) -> String {
    if epoch_ms == 0 {
        return "-".to_string();
    }
    let now_ms = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64;
    let elapsed_secs = now_ms.saturating_sub(epoch_ms) / 1000;
    format_elapsed(elapsed_secs)
}

/// One log entry as `<seq> <time> [step] message`.
pub fn format_entry(entry: &LogEntry) -> String {
    let mut line = format!(
        "{:>5} {} ",
        entry.sequence,
        color::context(&format_utc(entry.timestamp_ms))
    );
    if let Some(step) = &entry.step {
        line.push_str(&format!("[{}] ", step));
    }
    match entry.stream {
        LogStream::Stderr => line.push_str(&color::context(&entry.message)),
        LogStream::System if entry.level >= kiln_core::LogLevel::Warn => {
            line.push_str(&format!("{}: {}", entry.level, entry.message))
        }
        _ => line.push_str(&entry.message),
    }
    line
}

pub fn print_entry(entry: &LogEntry) {
    println!("{}", format_entry(entry));
}

/// Column header for [`format_build_row`].
pub fn build_table_header() -> String {
    format!("{:<12}  {:<10}  {:<7}  {:<6}  {}", "ID", "STATUS", "STEPS", "AGE", "PLAN")
}

pub fn format_build_row(build: &BuildSummary) -> String {
    let status = build.status.to_string();
    // Pad before coloring so escape codes don't skew the column
    let padded = format!("{:<10}", status);
    let status = padded.replacen(&status, &color::status(build.status), 1);
    let mut row = format!(
        "{:<12}  {}  {:<7}  {:<6}  {}",
        short(build.id.as_str(), SHORT_ID),
        status,
        format!("{}/{}", build.steps_completed, build.steps_total),
        format_time_ago(build.queued_at_ms),
        build.plan.display()
    );
    if let Some(original) = &build.retry_of {
        row.push_str(&format!(" (retry of {})", short(original.as_str(), SHORT_ID)));
    }
    row
}

/// Multi-line description of one build.
pub fn format_build_detail(build: &Build) -> String {
    let mut lines = vec![
        format!("Build:    {}", color::header(build.id.as_str())),
        format!("Status:   {}", color::status(build.status)),
        format!("Plan:     {}", build.trigger.plan.display()),
    ];
    if !build.trigger.profiles.is_empty() {
        lines.push(format!("Profiles: {}", build.trigger.profiles.join(", ")));
    }
    if !build.trigger.source.is_empty() {
        lines.push(format!("Source:   {}", build.trigger.source));
    }
    lines.push(format!("Queued:   {}", format_utc(build.queued_at_ms)));
    if let Some(started) = build.started_at_ms {
        lines.push(format!("Started:  {}", format_utc(started)));
    }
    if let Some(finished) = build.finished_at_ms {
        lines.push(format!("Finished: {}", format_utc(finished)));
    }
    lines.push(format!(
        "Steps:    {} completed, {} failed, {} total",
        build.steps_completed, build.steps_failed, build.steps_total
    ));
    if let Some(original) = &build.retry_of {
        lines.push(format!("Retry of: {}", original));
    }
    if let Some(error) = &build.error {
        lines.push(format!("Error:    {}", error));
    }
    lines.join("\n")
}
