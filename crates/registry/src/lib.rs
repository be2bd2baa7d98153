// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! The Watch Target Registry: the authoritative `{process id -> tag}`
//! attribution map, with the `{tag -> {process id}}` reverse index derived
//! and mutated alongside it under a single lock.

mod inspector;

pub use inspector::ProcessInspector;
#[cfg(windows)]
pub use inspector::WindowsProcessInspector;
pub use inspector::NoopProcessInspector;

use parking_lot::Mutex;
use proctail_core::{Clock, SystemClock, WatchTarget};
use std::collections::{HashMap, HashSet};

struct State {
    forward: HashMap<u32, WatchTarget>,
    reverse: HashMap<String, HashSet<u32>>,
}

impl State {
    fn new() -> Self {
        Self { forward: HashMap::new(), reverse: HashMap::new() }
    }

    fn insert(&mut self, target: WatchTarget) {
        self.reverse.entry(target.tag_name.clone()).or_default().insert(target.process_id);
        self.forward.insert(target.process_id, target);
    }

    fn remove(&mut self, pid: u32) -> Option<WatchTarget> {
        let target = self.forward.remove(&pid)?;
        if let Some(set) = self.reverse.get_mut(&target.tag_name) {
            set.remove(&pid);
            if set.is_empty() {
                self.reverse.remove(&target.tag_name);
            }
        }
        Some(target)
    }
}

/// Registry of live watch targets, guarded by a single mutex so the forward
/// map and reverse index are always observed consistently.
pub struct Registry<C: Clock = SystemClock> {
    state: Mutex<State>,
    clock: C,
}

impl Default for Registry<SystemClock> {
    fn default() -> Self {
        Self::new(SystemClock)
    }
}

impl<C: Clock> Registry<C> {
    pub fn new(clock: C) -> Self {
        Self { state: Mutex::new(State::new()), clock }
    }

    /// Register a new watch target. Returns `true` on insert, `false` if
    /// `pid` is already present (no-op, not an overwrite).
    pub fn add(&self, pid: u32, tag: impl Into<String>) -> bool {
        let tag = tag.into();
        let mut state = self.state.lock();
        if state.forward.contains_key(&pid) {
            return false;
        }
        state.insert(WatchTarget::new(pid, tag, self.clock.now()));
        true
    }

    /// Register a child process under its parent's tag (a `Process/Start`
    /// side effect). Returns `false` if the parent is not registered or the
    /// child is already present.
    pub fn add_child(&self, child_pid: u32, parent_pid: u32) -> bool {
        let mut state = self.state.lock();
        if state.forward.contains_key(&child_pid) {
            return false;
        }
        let Some(parent_tag) = state.forward.get(&parent_pid).map(|t| t.tag_name.clone()) else {
            return false;
        };
        state.insert(WatchTarget::child(child_pid, parent_tag, parent_pid, self.clock.now()));
        true
    }

    /// Remove a single watch target by pid. Returns `true` if it existed.
    pub fn remove(&self, pid: u32) -> bool {
        self.state.lock().remove(pid).is_some()
    }

    /// Remove every target carrying `tag`. Returns the number removed.
    pub fn remove_by_tag(&self, tag: &str) -> usize {
        let mut state = self.state.lock();
        let Some(pids) = state.reverse.remove(tag) else {
            return 0;
        };
        for pid in &pids {
            state.forward.remove(pid);
        }
        pids.len()
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn is_watched(&self, pid: u32) -> bool {
        self.state.lock().forward.contains_key(&pid)
    }

    pub fn tag_of(&self, pid: u32) -> Option<String> {
        self.state.lock().forward.get(&pid).map(|t| t.tag_name.clone())
    }

    /// Snapshot of every registered target, no process metadata filled in.
    pub fn list(&self) -> Vec<WatchTarget> {
        self.state.lock().forward.values().cloned().collect()
    }

    /// Snapshot with best-effort process metadata. Lookups
    /// that fail are surfaced as sentinel strings rather than dropping the
    /// target, since the target itself is still authoritative.
    pub fn list_detailed(&self, inspector: &dyn ProcessInspector) -> Vec<WatchTarget> {
        let mut targets = self.list();
        for target in &mut targets {
            match inspector.inspect(target.process_id) {
                Some(info) => {
                    target.process_name = Some(info.process_name);
                    target.image_path = Some(info.image_path);
                }
                None => {
                    target.process_name = Some("[Terminated]".to_string());
                    target.image_path = Some("[Terminated]".to_string());
                }
            }
        }
        targets
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proctail_core::FakeClock;

    fn registry() -> Registry<FakeClock> {
        Registry::new(FakeClock::new())
    }

    #[test]
    fn add_then_tag_of_then_remove() {
        let reg = registry();
        assert!(reg.add(1234, "A"));
        assert_eq!(reg.tag_of(1234), Some("A".to_string()));
        assert!(reg.remove(1234));
        assert!(!reg.is_watched(1234));
    }

    #[test]
    fn add_is_idempotent_on_existing_pid() {
        let reg = registry();
        assert!(reg.add(1, "A"));
        assert!(!reg.add(1, "B"));
        assert_eq!(reg.tag_of(1), Some("A".to_string()));
    }

    #[test]
    fn add_child_inherits_parent_tag() {
        let reg = registry();
        reg.add(1000, "svc");
        assert!(reg.add_child(2000, 1000));
        assert_eq!(reg.tag_of(2000), Some("svc".to_string()));
        let child = reg.list().into_iter().find(|t| t.process_id == 2000).unwrap();
        assert!(child.is_child);
        assert_eq!(child.parent_process_id, Some(1000));
    }

    #[test]
    fn add_child_fails_without_registered_parent() {
        let reg = registry();
        assert!(!reg.add_child(2000, 999));
        assert!(!reg.is_watched(2000));
    }

    #[test]
    fn remove_by_tag_removes_every_member_and_reports_count() {
        let reg = registry();
        reg.add(1, "A");
        reg.add(2, "A");
        reg.add(3, "B");
        assert_eq!(reg.remove_by_tag("A"), 2);
        assert!(!reg.is_watched(1));
        assert!(!reg.is_watched(2));
        assert!(reg.is_watched(3));
        assert_eq!(reg.remove_by_tag("A"), 0);
    }

    #[test]
    fn reverse_index_stays_consistent_with_forward_map() {
        let reg = registry();
        reg.add(1, "A");
        reg.add(2, "A");
        reg.remove(1);
        let state = reg.state.lock();
        let members = state.reverse.get("A").cloned().unwrap_or_default();
        for pid in &members {
            assert!(state.forward.contains_key(pid));
        }
        for (pid, target) in &state.forward {
            assert!(state.reverse.get(&target.tag_name).is_some_and(|s| s.contains(pid)));
        }
    }

    #[test]
    fn list_detailed_marks_terminated_when_inspector_has_nothing() {
        let reg = registry();
        reg.add(1, "A");
        let targets = reg.list_detailed(&NoopProcessInspector);
        assert_eq!(targets[0].process_name.as_deref(), Some("[Terminated]"));
    }
}
