// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Platform backend for the kernel trace session.
//!
//! The Windows backend owns a `ferrisetw::trace::KernelTrace` and a
//! dedicated OS thread running its blocking processing loop. Dropping the
//! `KernelTrace` stops the session and releases kernel buffers, which in
//! turn makes the blocking loop return — that's what `stop()` waits on.

use crate::error::TraceError;
use proctail_core::RawEvent;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

/// Category used to reconstruct the kernel's concatenated event name
/// (`{category}{Action}`, e.g. `FileIOCreate`) ahead of normalization.
pub(crate) enum Category {
    FileIo,
    Process,
}

impl Category {
    fn as_str(&self) -> &'static str {
        match self {
            Category::FileIo => "FileIO",
            Category::Process => "Process",
        }
    }
}

#[cfg(windows)]
pub struct Session {
    trace: parking_lot::Mutex<Option<ferrisetw::trace::KernelTrace>>,
    worker: parking_lot::Mutex<Option<std::thread::JoinHandle<()>>>,
    name: String,
}

#[cfg(windows)]
impl Session {
    pub fn start(
        name: String,
        include_file_read: bool,
        tx: mpsc::Sender<RawEvent>,
        dropped_events: Arc<AtomicU64>,
    ) -> Result<Self, TraceError> {
        use ferrisetw::provider::{kernel_providers, Provider};
        use ferrisetw::trace::{KernelTrace, RealTimeTraceTrait, TraceTrait};

        let file_tx = tx.clone();
        let file_drops = dropped_events.clone();
        let file_provider = Provider::kernel(&kernel_providers::FILE_IO_PROVIDER)
            .add_callback(move |record, locator| {
                deliver_event(Category::FileIo, record, locator, &file_tx, &file_drops);
            })
            .build();
        let _ = include_file_read; // read volume is bounded upstream by the event-name gate, not here

        let process_provider = Provider::kernel(&kernel_providers::PROCESS_PROVIDER)
            .add_callback(move |record, locator| {
                deliver_event(Category::Process, record, locator, &tx, &dropped_events);
            })
            .build();

        let (trace, handle) = KernelTrace::new()
            .named(name.clone())
            .enable(file_provider)
            .enable(process_provider)
            .start()
            .map_err(|e| TraceError::SessionUnavailable(format!("{e:?}")))?;

        let worker = std::thread::Builder::new()
            .name("proctail-etw-consumer".into())
            .spawn(move || {
                let _ = KernelTrace::process_from_handle(handle);
            })
            .map_err(|e| TraceError::SessionUnavailable(e.to_string()))?;

        Ok(Self {
            trace: parking_lot::Mutex::new(Some(trace)),
            worker: parking_lot::Mutex::new(Some(worker)),
            name,
        })
    }

    pub fn stop(&self, timeout: Duration) -> Result<(), TraceError> {
        if let Some(trace) = self.trace.lock().take() {
            drop(trace);
        }
        if let Some(worker) = self.worker.lock().take() {
            let (done_tx, done_rx) = std::sync::mpsc::channel();
            let _ = std::thread::spawn(move || {
                let _ = worker.join();
                let _ = done_tx.send(());
            });
            if done_rx.recv_timeout(timeout).is_err() {
                tracing::warn!(session = %self.name, "trace consumer did not stop within timeout");
                return Err(TraceError::StopTimedOut);
            }
        }
        let _ = ferrisetw::trace::stop_trace_by_name(&self.name);
        Ok(())
    }
}

#[cfg(windows)]
fn deliver_event(
    category: Category,
    record: &ferrisetw::native::etw_types::EventRecord,
    locator: &ferrisetw::schema_locator::SchemaLocator,
    tx: &mpsc::Sender<RawEvent>,
    dropped_events: &Arc<AtomicU64>,
) {
    use ferrisetw::parser::Parser;
    use proctail_core::{Payload, PayloadValue};

    let Ok(schema) = locator.event_schema(record) else {
        dropped_events.fetch_add(1, Ordering::Relaxed);
        return;
    };
    let parser = Parser::create(record, &schema);
    let mut payload: Payload = Payload::new();
    for property in schema.properties() {
        if let Ok(value) = parser.try_parse::<String>(&property.name) {
            payload.insert(property.name.clone(), PayloadValue::String(value));
        }
    }

    let raw_name = format!("{}{}", category.as_str(), schema.opcode_name());
    let event = RawEvent {
        timestamp_100ns: record.timestamp() as u64,
        provider_name: schema.provider_name(),
        event_name: crate::normalize::normalize_event_name(&raw_name),
        process_id: record.process_id(),
        thread_id: record.thread_id(),
        activity_id: format!("{:?}", record.activity_id()),
        related_activity_id: format!("{:?}", record.related_activity_id()),
        payload,
    };

    if tx.try_send(event).is_err() {
        dropped_events.fetch_add(1, Ordering::Relaxed);
    }
}

/// Non-Windows builds have nothing to subscribe to; the session never
/// produces events and `stop` is an immediate no-op. This keeps the crate
/// and its dependents compiling on development machines the same way
/// `proctail-registry`'s `NoopProcessInspector` does.
#[cfg(not(windows))]
pub struct Session;

#[cfg(not(windows))]
impl Session {
    pub fn start(
        _name: String,
        _include_file_read: bool,
        _tx: mpsc::Sender<RawEvent>,
        _dropped_events: Arc<AtomicU64>,
    ) -> Result<Self, TraceError> {
        Err(TraceError::SessionUnavailable(
            "kernel trace sessions are only available on Windows".to_string(),
        ))
    }

    pub fn stop(&self, _timeout: Duration) -> Result<(), TraceError> {
        Ok(())
    }
}
