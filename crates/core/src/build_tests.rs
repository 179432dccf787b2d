// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::FakeClock;
use proptest::prelude::*;
use yare::parameterized;

use BuildStatus::*;

const ALL: [BuildStatus; 6] = [Queued, Running, Succeeded, Failed, TimedOut, Cancelled];

fn build_in(status: BuildStatus) -> Build {
    let mut build = Build::new(TriggerContext::new("/plans/ci.toml"), &FakeClock::new());
    build.status = status;
    build
}

#[test]
fn new_build_is_queued() {
    let clock = FakeClock::new();
    clock.set_epoch_ms(42_000);
    let build = Build::new(TriggerContext::new("/plans/ci.toml").source("cli"), &clock);

    assert_eq!(build.status, Queued);
    assert_eq!(build.queued_at_ms, 42_000);
    assert!(build.started_at_ms.is_none());
    assert!(build.id.starts_with(BuildId::PREFIX));
    assert_eq!(build.trigger.source, "cli");
}

#[parameterized(
    start = { Queued, Running },
    cancel_queued = { Queued, Cancelled },
    succeed = { Running, Succeeded },
    fail = { Running, Failed },
    time_out = { Running, TimedOut },
    cancel_running = { Running, Cancelled },
)]
fn allowed_transitions(from: BuildStatus, to: BuildStatus) {
    let mut build = build_in(from);
    build.transition(to, 5_000).unwrap();
    assert_eq!(build.status, to);
}

#[parameterized(
    succeeded = { Succeeded },
    failed = { Failed },
    timed_out = { TimedOut },
    cancelled = { Cancelled },
)]
fn terminal_states_reject_every_transition(from: BuildStatus) {
    for to in ALL {
        let mut build = build_in(from);
        let before = build.clone();
        let err = build.transition(to, 9_000).unwrap_err();
        assert_eq!(err.from, from);
        assert_eq!(err.to, to);
        assert_eq!(build, before, "rejected transition must not mutate the build");
    }
}

#[test]
fn queued_cannot_skip_to_outcome() {
    for to in [Succeeded, Failed, TimedOut] {
        assert!(build_in(Queued).transition(to, 1).is_err());
    }
}

#[test]
fn running_stamps_started_and_terminal_stamps_finished() {
    let mut build = build_in(Queued);
    build.transition(Running, 100).unwrap();
    assert_eq!(build.started_at_ms, Some(100));
    assert!(build.finished_at_ms.is_none());

    build.transition(Succeeded, 350).unwrap();
    assert_eq!(build.finished_at_ms, Some(350));
    assert_eq!(build.elapsed_ms(1_000), Some(250));
}

#[test]
fn fail_with_records_error_only_when_allowed() {
    let mut build = build_in(Running);
    build.fail_with(Failed, "step `test` failed", 10).unwrap();
    assert_eq!(build.error.as_deref(), Some("step `test` failed"));

    let mut done = build_in(Succeeded);
    assert!(done.fail_with(Failed, "late", 10).is_err());
    assert!(done.error.is_none());
}

#[parameterized(
    queued = { Queued, true, false },
    running = { Running, true, false },
    succeeded = { Succeeded, false, true },
    failed = { Failed, false, true },
    timed_out = { TimedOut, false, true },
    cancelled = { Cancelled, false, false },
)]
fn cancel_and_retry_eligibility(status: BuildStatus, cancellable: bool, retryable: bool) {
    assert_eq!(status.is_cancellable(), cancellable);
    assert_eq!(status.is_retryable(), retryable);
}

#[test]
fn retry_creates_fresh_identity_with_same_trigger() {
    let clock = FakeClock::new();
    let original = build_in(Failed);
    let retry = original.retry(&clock);

    assert_ne!(retry.id, original.id);
    assert_eq!(retry.status, Queued);
    assert_eq!(retry.trigger, original.trigger);
    assert_eq!(retry.retry_of.as_ref(), Some(&original.id));
}

#[test]
fn status_round_trips_through_display() {
    for status in ALL {
        assert_eq!(status.to_string().parse::<BuildStatus>(), Ok(status));
    }
}

fn any_status() -> impl Strategy<Value = BuildStatus> {
    prop::sample::select(ALL.to_vec())
}

proptest! {
    #[test]
    fn transitions_only_follow_the_graph(path in prop::collection::vec(any_status(), 0..12)) {
        let mut build = build_in(Queued);
        for next in path {
            let from = build.status;
            let allowed = from.can_transition_to(next);
            let result = build.transition(next, 1);
            prop_assert_eq!(result.is_ok(), allowed);
            if !allowed {
                prop_assert_eq!(build.status, from);
            }
        }
    }
}
