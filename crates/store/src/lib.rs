// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! The Event Store: one bounded FIFO ring per tag, each behind its own lock
//! so writes to different tags never contend.

mod reaper;
mod stats;

pub use reaper::spawn_reaper;
pub use stats::StoreStats;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use proctail_core::NormalizedEvent;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

type TagQueue = Arc<Mutex<VecDeque<NormalizedEvent>>>;

/// Per-tag bounded event store.
pub struct Store {
    max_events_per_tag: usize,
    tags: Mutex<HashMap<String, TagQueue>>,
}

impl Store {
    pub fn new(max_events_per_tag: usize) -> Self {
        Self { max_events_per_tag, tags: Mutex::new(HashMap::new()) }
    }

    fn queue_for(&self, tag: &str) -> TagQueue {
        let mut tags = self.tags.lock();
        tags.entry(tag.to_string()).or_insert_with(|| Arc::new(Mutex::new(VecDeque::new()))).clone()
    }

    /// Append `event` to `tag`'s ring, evicting the oldest entries until the
    /// count is back at `max_events_per_tag`. Creates the ring on first use.
    pub fn store(&self, tag: &str, event: NormalizedEvent) {
        let queue = self.queue_for(tag);
        let mut queue = queue.lock();
        queue.push_back(event);
        while queue.len() > self.max_events_per_tag {
            queue.pop_front();
        }
    }

    /// Snapshot of `tag`'s queue in insertion order. Empty if the tag has
    /// never been stored to (or was cleared).
    pub fn get(&self, tag: &str) -> Vec<NormalizedEvent> {
        let Some(queue) = self.tags.lock().get(tag).cloned() else {
            return Vec::new();
        };
        queue.lock().iter().cloned().collect()
    }

    /// Up to `n` most recent entries, newest first.
    pub fn get_latest(&self, tag: &str, n: usize) -> Vec<NormalizedEvent> {
        let Some(queue) = self.tags.lock().get(tag).cloned() else {
            return Vec::new();
        };
        let queue = queue.lock();
        queue.iter().rev().take(n).cloned().collect()
    }

    /// Entries with `from <= timestamp <= to`, in insertion order.
    pub fn get_time_range(
        &self,
        tag: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Vec<NormalizedEvent> {
        let Some(queue) = self.tags.lock().get(tag).cloned() else {
            return Vec::new();
        };
        queue.lock().iter().filter(|e| e.timestamp >= from && e.timestamp <= to).cloned().collect()
    }

    /// Drop `tag`'s queue entirely. Idempotent; a subsequent `get` returns
    /// empty regardless of whether `tag` existed.
    pub fn clear(&self, tag: &str) {
        self.tags.lock().remove(tag);
    }

    pub fn all_tags(&self) -> Vec<String> {
        self.tags.lock().keys().cloned().collect()
    }

    pub fn stats(&self) -> StoreStats {
        stats::compute(&self.tags.lock())
    }

    /// One reaper pass: drop events older than `retention` from every tag,
    /// one tag at a time, and reclaim tags left empty.
    /// Each tag's queue is locked only for the duration of its own sweep so
    /// a concurrent `store` on another tag is never blocked for longer
    /// than one tag's worth of work.
    pub(crate) fn reap(&self, retention: chrono::Duration, now: DateTime<Utc>) {
        let cutoff = now - retention;
        let snapshot: Vec<(String, TagQueue)> =
            self.tags.lock().iter().map(|(k, v)| (k.clone(), v.clone())).collect();
        let mut emptied = Vec::new();
        for (tag, queue) in snapshot {
            let mut queue = queue.lock();
            while matches!(queue.front(), Some(e) if e.timestamp < cutoff) {
                queue.pop_front();
            }
            if queue.is_empty() {
                emptied.push(tag);
            }
        }
        if !emptied.is_empty() {
            let mut tags = self.tags.lock();
            for tag in emptied {
                // Re-check emptiness under the map lock: a concurrent `store`
                // may have refilled this tag between the sweep above and here.
                if tags.get(&tag).is_some_and(|q| q.lock().is_empty()) {
                    tags.remove(&tag);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proctail_core::{EventVariant, Payload};

    fn event(tag: &str, path: &str, ts: DateTime<Utc>) -> NormalizedEvent {
        NormalizedEvent {
            timestamp: ts,
            tag_name: tag.to_string(),
            process_id: 1,
            thread_id: 1,
            provider_name: "p".into(),
            event_name: "FileIO/Write".into(),
            activity_id: String::new(),
            related_activity_id: String::new(),
            payload: Payload::new(),
            variant: EventVariant::File { file_path: path.to_string() },
        }
    }

    #[test]
    fn stores_up_to_max_in_insertion_order() {
        let store = Store::new(10_000);
        let base = Utc::now();
        for i in 0..5 {
            store.store("q", event("q", &format!("f{i}"), base + chrono::Duration::seconds(i)));
        }
        let got = store.get("q");
        assert_eq!(got.len(), 5);
        let paths: Vec<_> = got.iter().map(|e| e.file_path().unwrap()).collect();
        assert_eq!(paths, vec!["f0", "f1", "f2", "f3", "f4"]);
    }

    #[test]
    fn evicts_oldest_beyond_max() {
        let store = Store::new(3);
        let base = Utc::now();
        for i in 0..4 {
            store.store("q", event("q", &format!("f{}", i + 1), base + chrono::Duration::seconds(i)));
        }
        let got = store.get("q");
        let paths: Vec<_> = got.iter().map(|e| e.file_path().unwrap()).collect();
        assert_eq!(paths, vec!["f2", "f3", "f4"]);
    }

    #[test]
    fn clear_then_get_is_empty_and_idempotent() {
        let store = Store::new(10);
        store.store("q", event("q", "f", Utc::now()));
        store.clear("q");
        assert!(store.get("q").is_empty());
        store.clear("q"); // idempotent
        assert!(store.get("q").is_empty());
    }

    #[test]
    fn get_latest_is_reverse_chronological() {
        let store = Store::new(10);
        let base = Utc::now();
        for i in 0..3 {
            store.store("q", event("q", &format!("f{i}"), base + chrono::Duration::seconds(i)));
        }
        let got = store.get_latest("q", 2);
        let paths: Vec<_> = got.iter().map(|e| e.file_path().unwrap()).collect();
        assert_eq!(paths, vec!["f2", "f1"]);
    }

    #[test]
    fn get_time_range_filters_inclusive_bounds() {
        let store = Store::new(10);
        let base = Utc::now();
        for i in 0..5 {
            store.store("q", event("q", &format!("f{i}"), base + chrono::Duration::seconds(i)));
        }
        let got = store.get_time_range("q", base + chrono::Duration::seconds(1), base + chrono::Duration::seconds(3));
        let paths: Vec<_> = got.iter().map(|e| e.file_path().unwrap()).collect();
        assert_eq!(paths, vec!["f1", "f2", "f3"]);
    }

    #[test]
    fn unknown_tag_reads_return_empty_not_error() {
        let store = Store::new(10);
        assert!(store.get("missing").is_empty());
        assert!(store.get_latest("missing", 5).is_empty());
    }

    #[test]
    fn different_tags_do_not_share_storage() {
        let store = Store::new(10);
        store.store("a", event("a", "f1", Utc::now()));
        store.store("b", event("b", "f2", Utc::now()));
        assert_eq!(store.get("a").len(), 1);
        assert_eq!(store.get("b").len(), 1);
    }
}
