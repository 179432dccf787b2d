// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use kiln_core::{BuildId, BuildStatus, FakeClock, LogLevel, LogLine, TriggerContext};
use serial_test::serial;

fn no_color() {
    std::env::set_var("NO_COLOR", "1");
}

fn entry(line: LogLine) -> LogEntry {
    LogEntry::from_line(BuildId::from("bld-abcdef123456789"), 7, line, 0)
}

#[test]
fn time_ago_of_zero_is_a_dash() {
    assert_eq!(format_time_ago(0), "-");
}

#[test]
#[serial]
fn entry_shows_sequence_time_and_step() {
    no_color();
    let line = LogLine::output(LogStream::Stdout, "added 312 packages").with_step("install");
    assert_eq!(format_entry(&entry(line)), "    7 1970-01-01T00:00:00Z [install] added 312 packages");
}

#[test]
#[serial]
fn system_warning_entry_shows_level() {
    no_color();
    let line = LogLine::system(LogLevel::Warn, "artifact missing: out/app.zip");
    assert_eq!(
        format_entry(&entry(line)),
        "    7 1970-01-01T00:00:00Z warn: artifact missing: out/app.zip"
    );
}

#[test]
#[serial]
fn build_row_aligns_and_marks_retries() {
    no_color();
    let summary = BuildSummary {
        id: BuildId::from("bld-abcdef123456789"),
        status: BuildStatus::Failed,
        plan: "/work/kiln.toml".into(),
        profiles: vec![],
        queued_at_ms: 0,
        finished_at_ms: None,
        steps_total: 3,
        steps_completed: 1,
        retry_of: Some(BuildId::from("bld-000000000000")),
    };
    assert_eq!(
        format_build_row(&summary),
        "bld-abcdef12  failed      1/3      -       /work/kiln.toml (retry of bld-00000000)"
    );
    assert!(build_table_header().starts_with("ID            STATUS"));
}

#[test]
#[serial]
fn build_detail_lists_optional_fields_only_when_set() {
    no_color();
    let clock = FakeClock::new();
    let trigger = TriggerContext::new("/work/kiln.toml").profiles(vec!["deploy".into()]);
    let mut build = Build::new(trigger, &clock);
    build.status = BuildStatus::Failed;
    build.error = Some("step `install` failed: exit code 1".to_string());

    let detail = format_build_detail(&build);
    assert!(detail.contains("Status:   failed"), "{detail}");
    assert!(detail.contains("Profiles: deploy"));
    assert!(detail.contains("Error:    step `install` failed: exit code 1"));
    assert!(!detail.contains("Source:"));
    assert!(!detail.contains("Started:"));
    assert!(!detail.contains("Retry of:"));
}
