// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Live log fan-out with sequence-numbered catch-up.
//!
//! Every published line gets the next per-build sequence number, is
//! appended to the store, then pushed to that build's subscribers. A viewer
//! that reconnects asks for everything after the last sequence it saw.
//!
//! Sequence assignment, the store append and delivery happen under one
//! per-build lock, so subscribers see entries in sequence order and the
//! store never has gaps.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use kiln_core::{BuildId, BuildStatus, Clock, LogEntry, LogLine, SystemClock};
use kiln_storage::{PageLimit, Store, StoreError};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::error::ControlError;

/// Receives live entries for the builds it subscribed to.
pub trait LogSubscriber: Send + Sync {
    /// Deliver one entry. Returning `false` means the subscriber is gone
    /// and should be pruned.
    fn deliver(&self, entry: &LogEntry) -> bool;
}

/// Subscriber backed by an unbounded channel.
pub struct ChannelSubscriber {
    tx: mpsc::UnboundedSender<LogEntry>,
}

impl ChannelSubscriber {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<LogEntry>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl LogSubscriber for ChannelSubscriber {
    fn deliver(&self, entry: &LogEntry) -> bool {
        self.tx.send(entry.clone()).is_ok()
    }
}

pub type SubscriberId = u64;

/// Result of a catch-up request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatchUp {
    /// Entries after the requested sequence, ascending
    pub entries: Vec<LogEntry>,
    pub status: BuildStatus,
    /// The build is terminal, so no more entries will follow
    pub is_complete: bool,
}

impl CatchUp {
    pub fn last_sequence(&self) -> Option<u64> {
        self.entries.last().map(|e| e.sequence)
    }
}

#[derive(Default)]
struct Groups {
    members: HashMap<BuildId, Vec<(SubscriberId, Arc<dyn LogSubscriber>)>>,
    next_id: SubscriberId,
}

pub struct LogBroadcaster<C: Clock = SystemClock> {
    store: Arc<Store>,
    clock: C,
    /// Next-sequence bookkeeping: last assigned sequence per build
    counters: Mutex<HashMap<BuildId, Arc<Mutex<u64>>>>,
    groups: Mutex<Groups>,
}

impl<C: Clock> LogBroadcaster<C> {
    pub fn new(store: Arc<Store>, clock: C) -> Self {
        Self { store, clock, counters: Mutex::new(HashMap::new()), groups: Mutex::new(Groups::default()) }
    }

    pub fn store(&self) -> &Arc<Store> {
        &self.store
    }

    /// Per-build counter, resumed from the store on first use.
    fn counter(&self, build_id: &BuildId) -> Arc<Mutex<u64>> {
        let mut counters = self.counters.lock();
        Arc::clone(
            counters
                .entry(build_id.clone())
                .or_insert_with(|| Arc::new(Mutex::new(self.store.last_sequence(build_id.as_str())))),
        )
    }

    /// Sequence, persist and fan out one line.
    pub fn publish(&self, build_id: &BuildId, line: LogLine) -> Result<LogEntry, StoreError> {
        let counter = self.counter(build_id);
        let mut last = counter.lock();
        let entry = LogEntry::from_line(build_id.clone(), *last + 1, line, self.clock.epoch_ms());
        self.store.append_log(entry.clone())?;
        *last = entry.sequence;

        let subscribers = self.groups.lock().members.get(build_id).cloned().unwrap_or_default();
        let closed: Vec<SubscriberId> = subscribers
            .iter()
            .filter(|(_, subscriber)| !subscriber.deliver(&entry))
            .map(|(id, _)| *id)
            .collect();
        drop(last);

        if !closed.is_empty() {
            tracing::debug!(build_id = %build_id, count = closed.len(), "pruning closed log subscribers");
            let mut groups = self.groups.lock();
            if let Some(members) = groups.members.get_mut(build_id) {
                members.retain(|(id, _)| !closed.contains(id));
            }
        }
        Ok(entry)
    }

    pub fn subscribe(&self, build_id: &BuildId, subscriber: Arc<dyn LogSubscriber>) -> SubscriberId {
        let mut groups = self.groups.lock();
        groups.next_id += 1;
        let id = groups.next_id;
        groups.members.entry(build_id.clone()).or_default().push((id, subscriber));
        id
    }

    /// Leave a build's group. Returns whether the subscriber was present.
    pub fn unsubscribe(&self, build_id: &BuildId, subscriber: SubscriberId) -> bool {
        let mut groups = self.groups.lock();
        let Some(members) = groups.members.get_mut(build_id) else { return false };
        let before = members.len();
        members.retain(|(id, _)| *id != subscriber);
        let removed = members.len() != before;
        if members.is_empty() {
            groups.members.remove(build_id);
        }
        removed
    }

    pub fn subscriber_count(&self, build_id: &BuildId) -> usize {
        self.groups.lock().members.get(build_id).map_or(0, Vec::len)
    }

    /// Entries after `after`, plus the build's status, in one default-sized
    /// page.
    pub fn catch_up(&self, build_id: &str, after: u64) -> Result<CatchUp, ControlError> {
        self.catch_up_page(build_id, after, PageLimit::default())
    }

    /// Entries after `after`, cut off at `limit`.
    ///
    /// Status is read before the entries: once a build is terminal all of
    /// its lines are already stored, so a complete catch-up is never short.
    /// `is_complete` stays false while stored entries remain past the page.
    pub fn catch_up_page(
        &self,
        build_id: &str,
        after: u64,
        limit: PageLimit,
    ) -> Result<CatchUp, ControlError> {
        let build =
            self.store.get_build(build_id).ok_or_else(|| ControlError::NotFound(build_id.to_string()))?;
        let page = self.store.logs_page(build_id, after, limit);
        Ok(CatchUp {
            entries: page.entries,
            status: build.status,
            is_complete: build.status.is_terminal() && !page.has_more,
        })
    }

    /// Subscribe, then catch up. Entries published in between appear in
    /// both and are filtered by [`LogFollow::next`].
    ///
    /// `backlog` holds the first page. Whatever the store held beyond it is
    /// paged in by [`LogFollow::next`] ahead of live entries.
    pub fn follow(&self, build_id: &BuildId, after: u64, limit: PageLimit) -> Result<LogFollow, ControlError> {
        let (subscriber, live) = ChannelSubscriber::new();
        let subscriber_id = self.subscribe(build_id, Arc::new(subscriber));
        let backlog = match self.catch_up_page(build_id.as_str(), after, limit) {
            Ok(backlog) => backlog,
            Err(e) => {
                self.unsubscribe(build_id, subscriber_id);
                return Err(e);
            }
        };
        // A terminal build's group is already closed, nothing live will come.
        let terminal = backlog.status.is_terminal();
        if terminal {
            self.unsubscribe(build_id, subscriber_id);
        }
        let last_sent = backlog.last_sequence().unwrap_or(after);
        Ok(LogFollow {
            build_id: build_id.clone(),
            subscriber_id,
            stored_done: backlog.is_complete,
            backlog,
            store: Arc::clone(&self.store),
            limit,
            pending: VecDeque::new(),
            terminal,
            live,
            last_sent,
        })
    }

    /// Drop a finished build's group and counter. Subscribers see their
    /// channel close.
    pub fn close(&self, build_id: &BuildId) {
        self.groups.lock().members.remove(build_id);
        self.counters.lock().remove(build_id);
    }
}

/// A live log subscription with its catch-up backlog.
pub struct LogFollow {
    pub build_id: BuildId,
    pub subscriber_id: SubscriberId,
    pub backlog: CatchUp,
    store: Arc<Store>,
    limit: PageLimit,
    /// Stored entries past the backlog, not yet handed out
    pending: VecDeque<LogEntry>,
    /// No stored entries remain past `last_sent`
    stored_done: bool,
    terminal: bool,
    live: mpsc::UnboundedReceiver<LogEntry>,
    last_sent: u64,
}

impl LogFollow {
    /// Next entry not already handed out: stored entries past the backlog
    /// first, then live ones. `None` once the build is complete and its
    /// group has been closed.
    pub async fn next(&mut self) -> Option<LogEntry> {
        loop {
            if let Some(entry) = self.pending.pop_front() {
                self.last_sent = entry.sequence;
                return Some(entry);
            }
            if !self.stored_done {
                let page = self.store.logs_page(self.build_id.as_str(), self.last_sent, self.limit);
                self.stored_done = !page.has_more;
                self.pending.extend(page.entries);
                continue;
            }
            if self.terminal {
                return None;
            }
            let entry = self.live.recv().await?;
            if entry.sequence > self.last_sent {
                self.last_sent = entry.sequence;
                return Some(entry);
            }
        }
    }
}

#[cfg(test)]
#[path = "broadcast_tests.rs"]
mod tests;
