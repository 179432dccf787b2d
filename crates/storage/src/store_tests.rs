// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use kiln_core::{FakeClock, LogLine, LogStream, TriggerContext};
use proptest::prelude::*;
use tempfile::TempDir;

fn build_at(ms: u64) -> Build {
    let clock = FakeClock::at(ms);
    Build::new(TriggerContext::new("/p/kiln.toml"), &clock)
}

fn entry(build: &BuildId, sequence: u64) -> LogEntry {
    LogEntry::from_line(
        build.clone(),
        sequence,
        LogLine::output(LogStream::Stdout, format!("line {sequence}")),
        1_000 + sequence,
    )
}

fn artifact(build: &BuildId, expires_at_ms: u64) -> BuildArtifact {
    BuildArtifact {
        id: ArtifactId::new(),
        build_id: build.clone(),
        storage_path: PathBuf::from(format!("/tmp/artifacts/{expires_at_ms}")),
        size_bytes: 10,
        created_at_ms: 0,
        expires_at_ms,
    }
}

#[test]
fn update_build_mutates_in_place() {
    let store = Store::in_memory();
    let build = build_at(1);
    store.insert_build(build.clone());

    store.update_build(build.id.as_str(), |b| b.transition(BuildStatus::Running, 5)).unwrap().unwrap();
    assert_eq!(store.get_build(build.id.as_str()).unwrap().status, BuildStatus::Running);
}

#[test]
fn update_unknown_build_is_not_found() {
    let err = Store::in_memory().update_build("bld-missing", |_| ()).unwrap_err();
    assert!(matches!(err, StoreError::BuildNotFound(_)));
}

#[test]
fn list_is_newest_first() {
    let store = Store::in_memory();
    let (old, new) = (build_at(1), build_at(2));
    store.insert_build(old.clone());
    store.insert_build(new.clone());
    let ids: Vec<_> = store.list_builds().into_iter().map(|b| b.id).collect();
    assert_eq!(ids, vec![new.id, old.id]);
}

#[test]
fn find_build_by_suffix_prefix() {
    let store = Store::in_memory();
    let build = build_at(1);
    store.insert_build(build.clone());
    let found = store.find_build(build.id.short(9)).unwrap();
    assert_eq!(found.id, build.id);
    assert_eq!(store.find_build(&build.id.suffix()[..6]).unwrap().id, build.id);
}

#[yare::parameterized(
    empty = { "" },
    other_type_prefix = { "art-" },
    no_such_suffix = { "bld-!!" },
)]
fn find_build_misses(query: &str) {
    let store = Store::in_memory();
    store.insert_build(build_at(1));
    assert!(store.find_build(query).is_none());
}

#[yare::parameterized(
    by_count = { PageLimit { entries: 2, message_bytes: 1024 }, vec![4, 5], true },
    by_bytes = { PageLimit { entries: 10, message_bytes: 12 }, vec![4, 5], true },
    whole_tail = { PageLimit::default(), vec![4, 5, 6, 7], false },
    oversized_line = { PageLimit { entries: 10, message_bytes: 1 }, vec![4], true },
)]
fn logs_page_cuts_tail(limit: PageLimit, expected: Vec<u64>, has_more: bool) {
    let store = Store::in_memory();
    let id = BuildId::new();
    for seq in 1..=7 {
        store.append_log(entry(&id, seq)).unwrap();
    }
    let page = store.logs_page(id.as_str(), 3, limit);
    let seqs: Vec<_> = page.entries.iter().map(|e| e.sequence).collect();
    assert_eq!(seqs, expected);
    assert_eq!(page.has_more, has_more);
}

#[test]
fn logs_page_of_unknown_build_is_empty() {
    let store = Store::in_memory();
    assert_eq!(store.logs_page("bld-unknown", 0, PageLimit::default()), LogPage::default());
}

#[test]
fn logs_after_returns_tail_in_order() {
    let store = Store::in_memory();
    let id = BuildId::new();
    for seq in 1..=5 {
        store.append_log(entry(&id, seq)).unwrap();
    }
    let seqs: Vec<_> = store.logs_after(id.as_str(), 3).iter().map(|e| e.sequence).collect();
    assert_eq!(seqs, vec![4, 5]);
    assert!(store.logs_after(id.as_str(), 5).is_empty());
    assert!(store.logs_after("bld-unknown", 0).is_empty());
    assert_eq!(store.last_sequence(id.as_str()), 5);
}

#[test]
fn out_of_order_append_is_rejected() {
    let store = Store::in_memory();
    let id = BuildId::new();
    store.append_log(entry(&id, 1)).unwrap();
    store.append_log(entry(&id, 2)).unwrap();
    assert!(matches!(store.append_log(entry(&id, 2)), Err(StoreError::OutOfOrder { last: 2, .. })));
}

#[test]
fn fetch_expired_orders_by_expiry_and_respects_limit_and_exclusions() {
    let store = Store::in_memory();
    let build = BuildId::new();
    let late = artifact(&build, 300);
    let early = artifact(&build, 100);
    let mid = artifact(&build, 200);
    let future = artifact(&build, 10_000);
    for a in [&late, &early, &mid, &future] {
        store.insert_artifact(a.clone());
    }

    let ids = |v: Vec<BuildArtifact>| v.into_iter().map(|a| a.id).collect::<Vec<_>>();
    assert_eq!(ids(store.fetch_expired(500, 2, &HashSet::new()).unwrap()), vec![early.id.clone(), mid.id.clone()]);

    let exclude = HashSet::from([early.id.clone()]);
    assert_eq!(ids(store.fetch_expired(500, 10, &exclude).unwrap()), vec![mid.id, late.id]);
}

#[test]
fn delete_artifacts_commits_snapshot() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("snapshot.zst");
    let store = Store::open(&path).unwrap();
    let a = artifact(&BuildId::new(), 1);
    store.insert_artifact(a.clone());

    assert_eq!(store.delete_artifacts(&[a.id.clone(), ArtifactId::new()]).unwrap(), 1);
    let reopened = Store::open(&path).unwrap();
    assert_eq!(reopened.artifact_count(), 0);
}

#[test]
fn reopen_restores_builds_and_logs() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("snapshot.zst");
    let build = build_at(7);
    {
        let store = Store::open(&path).unwrap();
        store.insert_build(build.clone());
        store.append_log(entry(&build.id, 1)).unwrap();
        store.commit().unwrap();
    }
    let store = Store::open(&path).unwrap();
    assert_eq!(store.get_build(build.id.as_str()), Some(build.clone()));
    assert_eq!(store.last_sequence(build.id.as_str()), 1);
}

#[test]
fn in_memory_commit_is_noop() {
    let store = Store::in_memory();
    store.commit().unwrap();
    assert!(store.path().is_none());
}

proptest! {
    #[test]
    fn logs_after_is_gap_free_suffix(total in 0u64..40, after in 0u64..50) {
        let store = Store::in_memory();
        let id = BuildId::new();
        for seq in 1..=total {
            store.append_log(entry(&id, seq)).unwrap();
        }
        let seqs: Vec<u64> = store.logs_after(id.as_str(), after).iter().map(|e| e.sequence).collect();
        let expected: Vec<u64> = ((after + 1)..=total).collect();
        prop_assert_eq!(seqs, expected);
    }
}
