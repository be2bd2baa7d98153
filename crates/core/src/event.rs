// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Raw and normalized event types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A scalar payload value, as surfaced by the kernel provider schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PayloadValue {
    String(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
}

impl PayloadValue {
    /// Best-effort coercion to a path/string value, used by the file-path
    /// filter.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            PayloadValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Best-effort coercion to an integer, used for exit codes and child pids.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            PayloadValue::Integer(n) => Some(*n),
            PayloadValue::String(s) => s.trim().parse().ok(),
            PayloadValue::Float(f) => Some(*f as i64),
            PayloadValue::Bool(_) => None,
        }
    }
}

pub type Payload = HashMap<String, PayloadValue>;

/// An event as delivered by the kernel trace session, before filtering or
/// attribution. Consumed once by the Event Processor; never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawEvent {
    /// 100ns-resolution ticks since the Unix epoch.
    pub timestamp_100ns: u64,
    pub provider_name: String,
    /// Canonical `Category/Action` form; normalization happens in the
    /// Trace Session Manager before this type is constructed.
    pub event_name: String,
    pub process_id: u32,
    pub thread_id: u32,
    pub activity_id: String,
    pub related_activity_id: String,
    pub payload: Payload,
}

/// Variant-specific data for a normalized event. Serialized untagged so the
/// JSON wire shape is the common fields plus the variant's extra fields,
/// with no separate discriminator field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EventVariant {
    File {
        #[serde(rename = "FilePath")]
        file_path: String,
    },
    ProcessStart {
        #[serde(rename = "ChildProcessId")]
        child_process_id: u32,
        #[serde(rename = "ChildProcessName")]
        child_process_name: String,
    },
    ProcessEnd {
        #[serde(rename = "ExitCode")]
        exit_code: i32,
    },
    Generic,
}

/// An event that has been attributed to a tag and shaped into one of the
/// four variants. Immutable; owned by the Event Store until evicted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedEvent {
    #[serde(rename = "Timestamp")]
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "TagName")]
    pub tag_name: String,
    #[serde(rename = "ProcessId")]
    pub process_id: u32,
    #[serde(rename = "ThreadId")]
    pub thread_id: u32,
    #[serde(rename = "ProviderName")]
    pub provider_name: String,
    #[serde(rename = "EventName")]
    pub event_name: String,
    #[serde(rename = "ActivityId")]
    pub activity_id: String,
    #[serde(rename = "RelatedActivityId")]
    pub related_activity_id: String,
    #[serde(rename = "Payload")]
    pub payload: Payload,
    #[serde(flatten)]
    pub variant: EventVariant,
}

impl NormalizedEvent {
    pub fn is_file(&self) -> bool {
        matches!(self.variant, EventVariant::File { .. })
    }

    pub fn file_path(&self) -> Option<&str> {
        match &self.variant {
            EventVariant::File { file_path } => Some(file_path),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_variant_round_trips_through_json() {
        let event = NormalizedEvent {
            timestamp: Utc::now(),
            tag_name: "A".into(),
            process_id: 1234,
            thread_id: 1,
            provider_name: "Microsoft-Windows-Kernel-File".into(),
            event_name: "FileIO/Create".into(),
            activity_id: String::new(),
            related_activity_id: String::new(),
            payload: Payload::new(),
            variant: EventVariant::File { file_path: "C:\\a.txt".into() },
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["FilePath"], "C:\\a.txt");
        assert_eq!(json["TagName"], "A");
        let back: NormalizedEvent = serde_json::from_value(json).unwrap();
        assert_eq!(back.file_path(), Some("C:\\a.txt"));
    }

    #[test]
    fn payload_value_coerces_string_integer() {
        let v = PayloadValue::String("42".into());
        assert_eq!(v.as_i64(), Some(42));
    }
}
