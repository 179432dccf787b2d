// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use kiln_core::{LogLevel, LogLine};

#[test]
fn logs_response_carries_completion_flag() {
    let entry = LogEntry::from_line(
        BuildId::from_string("bld-abc"),
        1,
        LogLine::system(LogLevel::Info, "build started"),
        1_000,
    );
    let response =
        Response::Logs { entries: vec![entry], status: BuildStatus::Succeeded, is_complete: true };

    let json = serde_json::to_value(&response).expect("serialize failed");
    assert_eq!(json["type"], "Logs");
    assert_eq!(json["is_complete"], true);
    assert_eq!(json["status"], "succeeded");
    assert_eq!(json["entries"][0]["sequence"], 1);
}

#[test]
fn sweep_summary_files_failed_defaults_to_zero() {
    let json = r#"{"type":"Swept","report":{"batches":3,"artifacts_deleted":250,"files_deleted":248,"files_missing":2,"bytes_freed":1024}}"#;
    let decoded: Response = serde_json::from_str(json).expect("deserialize failed");
    match decoded {
        Response::Swept { report } => {
            assert_eq!(report.batches, 3);
            assert_eq!(report.files_failed, 0);
        }
        _ => panic!("Expected Swept response"),
    }
}
