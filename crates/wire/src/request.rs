// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use serde::{Deserialize, Serialize};

/// Request from a control client to the daemon.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "RequestType")]
pub enum Request {
    AddWatchTarget {
        #[serde(rename = "ProcessId")]
        process_id: u32,
        #[serde(rename = "TagName")]
        tag_name: String,
    },

    RemoveWatchTarget {
        #[serde(rename = "TagName")]
        tag_name: String,
    },

    GetWatchTargets,

    GetRecordedEvents {
        #[serde(rename = "TagName")]
        tag_name: String,
    },

    ClearEvents {
        #[serde(rename = "TagName")]
        tag_name: String,
    },

    GetStatus,

    Shutdown,
}
