// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Event Store statistics.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::TagQueue;

/// Coarse per-event byte estimate used for `estimated_memory_bytes`. The
/// store does not rely on this figure for any decision; it is
/// informational only.
const ESTIMATED_BYTES_PER_EVENT: u64 = 512;
const ESTIMATED_BYTES_PER_TAG_OVERHEAD: u64 = 64;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StoreStats {
    pub tag_count: usize,
    pub total_event_count: usize,
    pub per_tag_event_counts: HashMap<String, usize>,
    pub estimated_memory_bytes: u64,
}

pub(crate) fn compute(tags: &HashMap<String, TagQueue>) -> StoreStats {
    let mut per_tag = HashMap::with_capacity(tags.len());
    let mut total = 0usize;
    for (tag, queue) in tags {
        let len = queue.lock().len();
        total += len;
        per_tag.insert(tag.clone(), len);
    }
    let estimated_memory_bytes = total as u64 * ESTIMATED_BYTES_PER_EVENT
        + tags.len() as u64 * ESTIMATED_BYTES_PER_TAG_OVERHEAD;
    StoreStats {
        tag_count: tags.len(),
        total_event_count: total,
        per_tag_event_counts: per_tag,
        estimated_memory_bytes,
    }
}
