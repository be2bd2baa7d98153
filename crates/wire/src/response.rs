// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use chrono::{DateTime, Utc};
use proctail_core::{NormalizedEvent, WatchTarget};
use serde::{Deserialize, Serialize};

/// Wire shape for a watch target, returned by `GetWatchTargets`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WatchTargetDto {
    #[serde(rename = "ProcessId")]
    pub process_id: u32,
    #[serde(rename = "TagName")]
    pub tag_name: String,
    #[serde(rename = "RegisteredAt")]
    pub registered_at: DateTime<Utc>,
    #[serde(rename = "IsChild")]
    pub is_child: bool,
    #[serde(rename = "ParentProcessId", skip_serializing_if = "Option::is_none")]
    pub parent_process_id: Option<u32>,
    #[serde(rename = "ProcessName", skip_serializing_if = "Option::is_none")]
    pub process_name: Option<String>,
    #[serde(rename = "ImagePath", skip_serializing_if = "Option::is_none")]
    pub image_path: Option<String>,
}

impl From<WatchTarget> for WatchTargetDto {
    fn from(t: WatchTarget) -> Self {
        Self {
            process_id: t.process_id,
            tag_name: t.tag_name,
            registered_at: t.registered_at,
            is_child: t.is_child,
            parent_process_id: t.parent_process_id,
            process_name: t.process_name,
            image_path: t.image_path,
        }
    }
}

/// Daemon status payload (`GetStatus`).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StatusPayload {
    #[serde(rename = "Running")]
    pub running: bool,
    #[serde(rename = "UptimeSeconds")]
    pub uptime_seconds: u64,
    #[serde(rename = "WatchTargetCount")]
    pub watch_target_count: usize,
    #[serde(rename = "TagCount")]
    pub tag_count: usize,
    #[serde(rename = "EventCount")]
    pub event_count: usize,
    #[serde(rename = "EstimatedMemoryBytes")]
    pub estimated_memory_bytes: u64,
}

/// The typed payload fields a successful response adds on top of
/// `Success`/`ErrorMessage`. Serialized untagged so the
/// fields sit directly alongside `Success` with no wrapper key.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum ResponsePayload {
    WatchTargets {
        #[serde(rename = "WatchTargets")]
        watch_targets: Vec<WatchTargetDto>,
    },
    Events {
        #[serde(rename = "Events")]
        events: Vec<NormalizedEvent>,
    },
    Status(StatusPayload),
}

/// Response from the daemon to a control client.
///
/// Every response carries `Success`; on failure `ErrorMessage` is set and
/// `payload` is `None`. On success, `payload` is `Some` for
/// `GetWatchTargets`/`GetRecordedEvents`/`GetStatus` and `None` for the
/// plain-acknowledgement request types.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Response {
    #[serde(rename = "Success")]
    pub success: bool,
    #[serde(rename = "ErrorMessage", skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(flatten, skip_serializing_if = "Option::is_none")]
    pub payload: Option<ResponsePayload>,
}

impl Response {
    pub fn ok() -> Self {
        Self { success: true, error_message: None, payload: None }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self { success: false, error_message: Some(message.into()), payload: None }
    }

    pub fn watch_targets(targets: Vec<WatchTargetDto>) -> Self {
        Self {
            success: true,
            error_message: None,
            payload: Some(ResponsePayload::WatchTargets { watch_targets: targets }),
        }
    }

    pub fn events(events: Vec<NormalizedEvent>) -> Self {
        Self { success: true, error_message: None, payload: Some(ResponsePayload::Events { events }) }
    }

    pub fn status(status: StatusPayload) -> Self {
        Self { success: true, error_message: None, payload: Some(ResponsePayload::Status(status)) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ok_serializes_without_error_or_payload() {
        let json = serde_json::to_value(Response::ok()).unwrap();
        assert_eq!(json, serde_json::json!({"Success": true}));
    }

    #[test]
    fn error_carries_message() {
        let json = serde_json::to_value(Response::error("boom")).unwrap();
        assert_eq!(json, serde_json::json!({"Success": false, "ErrorMessage": "boom"}));
    }

    #[test]
    fn status_flattens_fields_alongside_success() {
        let status = StatusPayload {
            running: true,
            uptime_seconds: 42,
            watch_target_count: 2,
            tag_count: 1,
            event_count: 5,
            estimated_memory_bytes: 1024,
        };
        let json = serde_json::to_value(Response::status(status)).unwrap();
        assert_eq!(json["Success"], true);
        assert_eq!(json["UptimeSeconds"], 42);
        assert!(json.get("ErrorMessage").is_none());
    }

    #[test]
    fn watch_targets_round_trip() {
        let dto = WatchTargetDto {
            process_id: 10,
            tag_name: "a".into(),
            registered_at: Utc::now(),
            is_child: false,
            parent_process_id: None,
            process_name: None,
            image_path: None,
        };
        let resp = Response::watch_targets(vec![dto]);
        let json = serde_json::to_string(&resp).unwrap();
        let back: Response = serde_json::from_str(&json).unwrap();
        assert_eq!(resp, back);
    }
}
