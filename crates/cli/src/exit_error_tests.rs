// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[yare::parameterized(
    succeeded = { BuildStatus::Succeeded, 0 },
    failed = { BuildStatus::Failed, 1 },
    timed_out = { BuildStatus::TimedOut, 124 },
    cancelled = { BuildStatus::Cancelled, 130 },
)]
fn status_maps_to_exit_code(status: BuildStatus, code: i32) {
    assert_eq!(status_code(status), code);
}

#[test]
fn for_status_keeps_message() {
    let err = ExitError::for_status(BuildStatus::TimedOut, "build timed_out");
    assert_eq!(err.code, 124);
    assert_eq!(err.to_string(), "build timed_out");
}
