// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Event-name normalization: the kernel surfaces names as concatenated
//! tokens (`FileIOCreate`); this rewrites them to the canonical
//! `Category/Action` form (`FileIO/Create`) before a raw event
//! leaves the Trace Session Manager.

const FILE_IO_PREFIX: &str = "FileIO";
const PROCESS_PREFIX: &str = "Process";

/// Known actions for each category, longest first so e.g. `SetInfo` isn't
/// mistaken for a prefix of something else starting with the same letters.
const FILE_IO_ACTIONS: &[&str] =
    &["Create", "Write", "Delete", "Rename", "SetInfo", "Close", "Read"];
const PROCESS_ACTIONS: &[&str] = &["Start", "End"];

fn split_category(raw: &str, prefix: &str, actions: &[&str]) -> Option<String> {
    let rest = raw.strip_prefix(prefix)?;
    actions.iter().find(|a| **a == rest).map(|a| format!("{prefix}/{a}"))
}

/// Rewrites a raw kernel event name into canonical form. Names that don't
/// match a known category/action pair pass through unchanged; they are
/// filtered out later by the event-name gate rather than here.
pub fn normalize_event_name(raw: &str) -> String {
    if raw.contains('/') {
        return raw.to_string();
    }
    split_category(raw, FILE_IO_PREFIX, FILE_IO_ACTIONS)
        .or_else(|| split_category(raw, PROCESS_PREFIX, PROCESS_ACTIONS))
        .unwrap_or_else(|| raw.to_string())
}
