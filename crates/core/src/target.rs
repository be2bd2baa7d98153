// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Watch target: a (process id, tag) membership record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A registered attribution record. Immutable after creation; destroyed by
/// explicit removal, `Process/End`, or daemon shutdown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatchTarget {
    pub process_id: u32,
    pub tag_name: String,
    pub registered_at: DateTime<Utc>,
    pub is_child: bool,
    pub parent_process_id: Option<u32>,
    /// Best-effort metadata filled in by `list_detailed`; absent from the
    /// authoritative registry record itself.
    #[serde(default)]
    pub process_name: Option<String>,
    #[serde(default)]
    pub image_path: Option<String>,
}

impl WatchTarget {
    pub fn new(process_id: u32, tag_name: String, registered_at: DateTime<Utc>) -> Self {
        Self {
            process_id,
            tag_name,
            registered_at,
            is_child: false,
            parent_process_id: None,
            process_name: None,
            image_path: None,
        }
    }

    pub fn child(
        process_id: u32,
        tag_name: String,
        parent_process_id: u32,
        registered_at: DateTime<Utc>,
    ) -> Self {
        Self {
            process_id,
            tag_name,
            registered_at,
            is_child: true,
            parent_process_id: Some(parent_process_id),
            process_name: None,
            image_path: None,
        }
    }
}
