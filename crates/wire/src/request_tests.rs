// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Backward compatibility tests for Request deserialization.

use super::*;

#[test]
fn trigger_profiles_and_source_default_to_empty() {
    let json = r#"{"type":"Trigger","plan":"/work/kiln.toml"}"#;
    let decoded: Request = serde_json::from_str(json).expect("deserialize failed");
    match decoded {
        Request::Trigger { plan, profiles, source } => {
            assert_eq!(plan, PathBuf::from("/work/kiln.toml"));
            assert!(profiles.is_empty());
            assert!(source.is_empty());
        }
        _ => panic!("Expected Trigger request"),
    }
}

#[test]
fn log_requests_default_to_start_of_log() {
    let json = r#"{"type":"Follow","id":"bld-abc"}"#;
    let decoded: Request = serde_json::from_str(json).expect("deserialize failed");
    assert_eq!(decoded, Request::Follow { id: "bld-abc".to_string(), after: 0 });

    let json = r#"{"type":"GetLogs","id":"bld-abc"}"#;
    let decoded: Request = serde_json::from_str(json).expect("deserialize failed");
    assert_eq!(decoded, Request::GetLogs { id: "bld-abc".to_string(), after: 0 });
}

#[yare::parameterized(
    ping = { Request::Ping, r#"{"type":"Ping"}"# },
    list = { Request::List, r#"{"type":"List"}"# },
    sweep = { Request::Sweep, r#"{"type":"Sweep"}"# },
    shutdown = { Request::Shutdown, r#"{"type":"Shutdown"}"# },
)]
fn unit_requests_are_tagged(request: Request, expected: &str) {
    let json = serde_json::to_string(&request).expect("serialize failed");
    assert_eq!(json, expected);
}
