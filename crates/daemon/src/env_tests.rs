// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serial_test::serial;

/// Run `f` with `name` set to `value`, restoring the previous value after.
fn with_var<R>(name: &str, value: Option<&str>, f: impl FnOnce() -> R) -> R {
    let previous = std::env::var(name).ok();
    match value {
        Some(v) => std::env::set_var(name, v),
        None => std::env::remove_var(name),
    }
    let result = f();
    match previous {
        Some(v) => std::env::set_var(name, v),
        None => std::env::remove_var(name),
    }
    result
}

#[test]
#[serial]
fn state_dir_prefers_explicit_override() {
    let dir = with_var("KILN_STATE_DIR", Some("/tmp/kiln-state"), || state_dir().unwrap());
    assert_eq!(dir, PathBuf::from("/tmp/kiln-state"));
}

#[test]
#[serial]
fn state_dir_falls_back_to_xdg() {
    let dir = with_var("KILN_STATE_DIR", None, || {
        with_var("XDG_STATE_HOME", Some("/xdg/state"), || state_dir().unwrap())
    });
    assert_eq!(dir, PathBuf::from("/xdg/state/kiln"));
}

#[test]
#[serial]
fn build_timeout_parsing() {
    let cases = [
        (None, Some(3_600_000)),
        (Some("-1"), None),
        (Some("90000"), Some(90_000)),
        (Some("soon"), Some(3_600_000)),
        (Some("0"), Some(3_600_000)),
    ];
    for (value, expected_ms) in cases {
        let timeout = with_var("KILN_BUILD_TIMEOUT_MS", value, build_timeout);
        assert_eq!(timeout, expected_ms.map(Duration::from_millis), "{value:?}");
    }
}

#[test]
#[serial]
fn zero_concurrency_falls_back_to_default() {
    assert_eq!(with_var("KILN_MAX_CONCURRENT_BUILDS", Some("0"), max_concurrent_builds), 4);
    assert_eq!(with_var("KILN_MAX_CONCURRENT_BUILDS", Some("2"), max_concurrent_builds), 2);
}

#[test]
#[serial]
fn retention_is_counted_in_days() {
    let retention = with_var("KILN_ARTIFACT_RETENTION_DAYS", Some("2"), artifact_retention);
    assert_eq!(retention, Duration::from_secs(2 * 86_400));
}

#[test]
#[serial]
fn kiln_log_wins_over_rust_log() {
    let filter = with_var("RUST_LOG", Some("debug"), || {
        with_var("KILN_LOG", Some("kiln_engine=trace"), log_filter)
    });
    assert_eq!(filter, "kiln_engine=trace");
}
