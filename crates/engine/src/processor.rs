// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The Event Processor: a pure function from raw event to at most one
//! normalized event, plus two Registry side effects.

use crate::filter::{extract_path, path_is_excluded, PathLookup};
use proctail_core::{Clock, EventVariant, NormalizedEvent, RawEvent};
use proctail_registry::Registry;

/// Gate and filter configuration the processor needs from `Config`. Kept as
/// its own borrowed view rather than taking `proctail_core::Config` by
/// value so callers can cheaply re-derive it once at startup.
pub struct ProcessorConfig<'a> {
    pub enabled_providers: &'a [String],
    pub enabled_event_names: &'a [String],
    pub exclude_system_processes: bool,
    pub minimum_process_id: u32,
    pub excluded_process_names: &'a [String],
    pub include_file_extensions: Option<&'a [String]>,
    pub exclude_file_patterns: &'a [String],
}

/// Synthetic marker for a `FileIO/Close` event whose payload carries no
/// path.
fn close_marker(pid: u32) -> String {
    format!("<Close:PID{pid}>")
}

fn is_close_event(event_name: &str) -> bool {
    event_name == "FileIO/Close"
}

fn is_file_event(event_name: &str) -> bool {
    event_name.starts_with("FileIO/")
}

/// Payload keys tried in order for a `Process/Start` child pid, and for a
/// `Process/End` exit code.
const CHILD_PID_KEYS: &[&str] = &["ChildProcessId", "ProcessId"];
const CHILD_IMAGE_KEYS: &[&str] = &["ImageFileName", "ChildProcessName", "ImageName"];
const EXIT_CODE_KEYS: &[&str] = &["ExitStatus", "ExitCode", "Status"];

/// Processes one raw event against the current registry and filter
/// configuration, returning the normalized event to store (if any). Runs
/// `registry.add_child` / `registry.remove` inline as side effects; inline
/// execution is fine provided it does not block the raw-event channel long
/// enough to cause drops, which these
/// in-memory, lock-guarded operations do not.
pub fn process<C: Clock>(
    raw: &RawEvent,
    registry: &Registry<C>,
    config: &ProcessorConfig<'_>,
) -> Option<NormalizedEvent> {
    // 1. Provider gate.
    if !config.enabled_providers.iter().any(|p| p == &raw.provider_name) {
        return None;
    }
    // 2. Event-name gate.
    if !config.enabled_event_names.iter().any(|n| n == &raw.event_name) {
        return None;
    }
    // System-process gate (`ExcludeSystemProcesses` /
    // `MinimumProcessId` / `ExcludedProcessNames`), applied before
    // attribution since it is independent of tag membership.
    if config.exclude_system_processes && raw.process_id < config.minimum_process_id {
        return None;
    }
    if let Some(name) = raw.payload.get("ProcessName").and_then(|v| v.as_str()) {
        if config.excluded_process_names.iter().any(|n| n.eq_ignore_ascii_case(name)) {
            return None;
        }
    }

    // 3. Attribution. `tag_of` absent means the producing pid carries no
    // watch membership (watched ⟺ tag_of.is_some()), so there is nothing
    // left to check and the event is dropped.
    let Some(tag) = registry.tag_of(raw.process_id) else {
        tracing::debug!(pid = raw.process_id, event = %raw.event_name, "dropping unattributed event");
        return None;
    };

    // 4. File-path filter (variant == File only, i.e. non-Process events).
    let is_file = is_file_event(&raw.event_name) && raw.event_name != "Process/Start"
        && raw.event_name != "Process/End";
    let file_path = if is_file {
        match extract_path(&raw.payload) {
            PathLookup::Found(path) => {
                if path_is_excluded(&path, config.include_file_extensions, config.exclude_file_patterns) {
                    return None;
                }
                Some(path)
            }
            PathLookup::Absent if is_close_event(&raw.event_name) => {
                Some(close_marker(raw.process_id))
            }
            PathLookup::Absent => {
                tracing::warn!(pid = raw.process_id, event = %raw.event_name, "FileIO event missing path");
                return None;
            }
        }
    } else {
        None
    };

    // 5. Variant construction.
    let variant = if let Some(file_path) = file_path {
        EventVariant::File { file_path }
    } else if raw.event_name == "Process/Start" {
        let child_pid = CHILD_PID_KEYS
            .iter()
            .find_map(|k| raw.payload.get(*k))
            .and_then(|v| v.as_i64())
            .and_then(|n| u32::try_from(n).ok());
        let Some(child_pid) = child_pid else {
            tracing::warn!(pid = raw.process_id, "Process/Start with malformed child pid");
            return None;
        };
        let child_image = CHILD_IMAGE_KEYS
            .iter()
            .find_map(|k| raw.payload.get(*k))
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string();
        if !registry.add_child(child_pid, raw.process_id) {
            tracing::debug!(child_pid, parent = raw.process_id, "child attribution failed");
        }
        EventVariant::ProcessStart { child_process_id: child_pid, child_process_name: child_image }
    } else if raw.event_name == "Process/End" {
        let exit_code = EXIT_CODE_KEYS
            .iter()
            .find_map(|k| raw.payload.get(*k))
            .and_then(|v| v.as_i64())
            .map(|n| n as i32)
            .unwrap_or(0);
        registry.remove(raw.process_id);
        EventVariant::ProcessEnd { exit_code }
    } else {
        EventVariant::Generic
    };

    // 6. Emit.
    Some(NormalizedEvent {
        timestamp: registry_clock_now(registry),
        tag_name: tag,
        process_id: raw.process_id,
        thread_id: raw.thread_id,
        provider_name: raw.provider_name.clone(),
        event_name: raw.event_name.clone(),
        activity_id: raw.activity_id.clone(),
        related_activity_id: raw.related_activity_id.clone(),
        payload: raw.payload.clone(),
        variant,
    })
}

fn registry_clock_now<C: Clock>(registry: &Registry<C>) -> chrono::DateTime<chrono::Utc> {
    registry.clock().now()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proctail_core::{FakeClock, Payload, PayloadValue};
    use proctail_registry::Registry;
    use std::collections::HashMap;

    fn cfg() -> proctail_core::Config {
        proctail_core::Config::default()
    }

    fn raw(pid: u32, provider: &str, event_name: &str, payload: Payload) -> RawEvent {
        RawEvent {
            timestamp_100ns: 0,
            provider_name: provider.to_string(),
            event_name: event_name.to_string(),
            process_id: pid,
            thread_id: 1,
            activity_id: String::new(),
            related_activity_id: String::new(),
            payload,
        }
    }

    fn pconfig(c: &proctail_core::Config) -> ProcessorConfig<'_> {
        ProcessorConfig {
            enabled_providers: &c.enabled_providers,
            enabled_event_names: &c.enabled_event_names,
            exclude_system_processes: c.exclude_system_processes,
            minimum_process_id: c.minimum_process_id,
            excluded_process_names: &c.excluded_process_names,
            include_file_extensions: c.include_file_extensions.as_deref(),
            exclude_file_patterns: &c.exclude_file_patterns,
        }
    }

    #[test]
    fn attribution_basic_emits_file_event_for_watched_pid() {
        let registry = Registry::new(FakeClock::new());
        registry.add(1234, "A");
        let c = cfg();
        let mut p = HashMap::new();
        p.insert("FileName".to_string(), PayloadValue::String("C:\\a.txt".to_string()));
        let event = raw(1234, "Microsoft-Windows-Kernel-File", "FileIO/Create", p);
        let normalized = process(&event, &registry, &pconfig(&c)).unwrap();
        assert_eq!(normalized.tag_name, "A");
        assert_eq!(normalized.file_path(), Some("C:\\a.txt"));
    }

    #[test]
    fn non_target_pid_is_dropped() {
        let registry = Registry::new(FakeClock::new());
        registry.add(1234, "A");
        let c = cfg();
        let mut p = HashMap::new();
        p.insert("FileName".to_string(), PayloadValue::String("C:\\b.txt".to_string()));
        let event = raw(5678, "Microsoft-Windows-Kernel-File", "FileIO/Write", p);
        assert!(process(&event, &registry, &pconfig(&c)).is_none());
    }

    #[test]
    fn process_start_adds_child_and_emits_process_start() {
        let registry = Registry::new(FakeClock::new());
        registry.add(1000, "svc");
        let c = cfg();
        let mut p = HashMap::new();
        p.insert("ChildProcessId".to_string(), PayloadValue::Integer(2000));
        p.insert("ImageFileName".to_string(), PayloadValue::String("child.exe".to_string()));
        let event = raw(1000, "Microsoft-Windows-Kernel-Process", "Process/Start", p);
        let normalized = process(&event, &registry, &pconfig(&c)).unwrap();
        assert!(matches!(
            normalized.variant,
            EventVariant::ProcessStart { child_process_id: 2000, .. }
        ));
        assert_eq!(registry.tag_of(2000), Some("svc".to_string()));
    }

    #[test]
    fn process_end_removes_from_registry() {
        let registry = Registry::new(FakeClock::new());
        registry.add(3000, "t");
        let c = cfg();
        let mut p = HashMap::new();
        p.insert("ExitStatus".to_string(), PayloadValue::Integer(5));
        let event = raw(3000, "Microsoft-Windows-Kernel-Process", "Process/End", p);
        let normalized = process(&event, &registry, &pconfig(&c)).unwrap();
        assert!(matches!(normalized.variant, EventVariant::ProcessEnd { exit_code: 5 }));
        assert!(!registry.is_watched(3000));
    }

    #[test]
    fn close_without_path_gets_synthetic_marker() {
        let registry = Registry::new(FakeClock::new());
        registry.add(42, "k");
        let c = cfg();
        let event = raw(42, "Microsoft-Windows-Kernel-File", "FileIO/Close", Payload::new());
        let normalized = process(&event, &registry, &pconfig(&c)).unwrap();
        assert_eq!(normalized.file_path(), Some("<Close:PID42>"));
    }

    #[test]
    fn malformed_child_pid_drops_event_without_side_effect() {
        let registry = Registry::new(FakeClock::new());
        registry.add(1000, "svc");
        let c = cfg();
        let mut p = HashMap::new();
        p.insert("ChildProcessId".to_string(), PayloadValue::String("not-a-number".to_string()));
        let event = raw(1000, "Microsoft-Windows-Kernel-Process", "Process/Start", p);
        assert!(process(&event, &registry, &pconfig(&c)).is_none());
    }

    #[test]
    fn test_artifact_escape_hatch_survives_exclude_pattern() {
        let registry = Registry::new(FakeClock::new());
        registry.add(42, "k");
        let mut c = cfg();
        c.exclude_file_patterns = vec!["*\\Temp\\*".to_string()];
        let mut dropped = HashMap::new();
        dropped.insert(
            "FileName".to_string(),
            PayloadValue::String("C:\\Users\\u\\Temp\\other.txt".to_string()),
        );
        let event = raw(42, "Microsoft-Windows-Kernel-File", "FileIO/Create", dropped);
        assert!(process(&event, &registry, &pconfig(&c)).is_none());

        let mut kept = HashMap::new();
        kept.insert(
            "FileName".to_string(),
            PayloadValue::String("C:\\Users\\u\\Temp\\ProcTailTest\\t.txt".to_string()),
        );
        let event = raw(42, "Microsoft-Windows-Kernel-File", "FileIO/Create", kept);
        assert!(process(&event, &registry, &pconfig(&c)).is_some());
    }

    #[test]
    fn system_process_below_minimum_pid_is_dropped() {
        let registry = Registry::new(FakeClock::new());
        registry.add(50, "A");
        let mut c = cfg();
        c.exclude_system_processes = true;
        c.minimum_process_id = 100;
        let mut p = HashMap::new();
        p.insert("FileName".to_string(), PayloadValue::String("C:\\a.txt".to_string()));
        let event = raw(50, "Microsoft-Windows-Kernel-File", "FileIO/Create", p);
        assert!(process(&event, &registry, &pconfig(&c)).is_none());
    }
}
