// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The Service Orchestrator: wires the trace session, event
//! processor, registry, store, and IPC server together and drives the
//! `Stopped -> Starting -> Running -> Stopping -> Stopped` lifecycle.

use crate::server::{spawn_listener, ListenCtx};
use parking_lot::Mutex;
use proctail_core::{Config, RawEvent, SystemClock};
use proctail_registry::{NoopProcessInspector, ProcessInspector, Registry};
#[cfg(windows)]
use proctail_registry::WindowsProcessInspector;
use proctail_store::Store;
use proctail_trace::TraceSessionManager;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::{mpsc, Notify};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Raw events are consumed as fast as the processor can keep up; this only
/// bounds how far the trace consumer can get ahead of it before raw events
/// start counting toward `EventDropped`. Not exposed as a configuration
/// key.
const RAW_EVENT_CHANNEL_CAPACITY: usize = 4096;
const REAPER_INTERVAL: Duration = Duration::from_secs(60);
const DRAIN_TIMEOUT: Duration = Duration::from_secs(3);
const LISTENER_STOP_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error(transparent)]
    Trace(#[from] proctail_trace::TraceError),
}

struct RunningHandles {
    cancel: CancellationToken,
    processor: JoinHandle<()>,
    reaper: JoinHandle<()>,
    reaper_cancel: CancellationToken,
    listener: JoinHandle<()>,
}

enum State {
    Stopped,
    Running(RunningHandles),
}

/// Owns every live component for one daemon instance. Constructed once;
/// `start`/`stop` are the only lifecycle entry points.
pub struct Orchestrator {
    config: Config,
    registry: Arc<Registry<SystemClock>>,
    store: Arc<Store>,
    inspector: Arc<dyn ProcessInspector>,
    trace: Arc<TraceSessionManager>,
    state: Mutex<State>,
}

impl Orchestrator {
    pub fn new(config: Config) -> Self {
        let include_file_read = config.enabled_event_names.iter().any(|n| n == "FileIO/Read");
        let trace = Arc::new(TraceSessionManager::new(RAW_EVENT_CHANNEL_CAPACITY, include_file_read));
        Self {
            registry: Arc::new(Registry::new(SystemClock)),
            store: Arc::new(Store::new(config.max_events_per_tag)),
            inspector: default_inspector(),
            trace,
            config,
            state: Mutex::new(State::Stopped),
        }
    }

    /// Runs startup in wiring order: start the trace session, subscribe to
    /// the raw-event stream, then start the IPC server. Re-entrant on
    /// `Running` (no-op). Returns a handle the caller can await to learn a
    /// client asked for `Shutdown`.
    pub fn start(&self) -> Result<Arc<Notify>, OrchestratorError> {
        let mut state = self.state.lock();
        if matches!(*state, State::Running(_)) {
            return Ok(Arc::new(Notify::new()));
        }

        let rx = self.trace.start().inspect_err(|err| {
            tracing::error!(error = %err, "trace session failed to start");
        })?;

        let cancel = CancellationToken::new();
        let shutdown_requested = Arc::new(Notify::new());

        let processor =
            spawn_processor(rx, self.registry.clone(), self.store.clone(), self.config.clone(), cancel.clone());

        let (reaper, reaper_cancel) = proctail_store::spawn_reaper(
            self.store.clone(),
            SystemClock,
            REAPER_INTERVAL,
            self.config.event_retention(),
        );

        let ctx = Arc::new(ListenCtx {
            registry: self.registry.clone(),
            store: self.store.clone(),
            inspector: self.inspector.clone(),
            start_time: Instant::now(),
            cancel: cancel.clone(),
            shutdown_requested: shutdown_requested.clone(),
        });
        let listener = spawn_listener(&self.config, ctx);

        *state = State::Running(RunningHandles { cancel, processor, reaper, reaper_cancel, listener });
        tracing::info!(pipe_name = %self.config.pipe_name, "daemon running");
        Ok(shutdown_requested)
    }

    /// Cancels every task, stops the trace session (bounded wait internally),
    /// and waits (bounded) for the processor, reaper, and listener to drain.
    /// Re-entrant on `Stopped` (no-op).
    pub async fn stop(&self) {
        let handles = {
            let mut state = self.state.lock();
            match std::mem::replace(&mut *state, State::Stopped) {
                State::Running(handles) => handles,
                State::Stopped => return,
            }
        };

        handles.cancel.cancel();
        handles.reaper_cancel.cancel();
        self.trace.stop();

        if tokio::time::timeout(DRAIN_TIMEOUT, handles.processor).await.is_err() {
            tracing::warn!("event processor did not drain within timeout");
        }
        if tokio::time::timeout(DRAIN_TIMEOUT, handles.reaper).await.is_err() {
            tracing::warn!("reaper did not stop within timeout");
        }
        if tokio::time::timeout(LISTENER_STOP_TIMEOUT, handles.listener).await.is_err() {
            tracing::warn!("ipc listener did not stop within timeout");
        }
        tracing::info!("daemon stopped");
    }
}

fn spawn_processor(
    mut rx: mpsc::Receiver<RawEvent>,
    registry: Arc<Registry<SystemClock>>,
    store: Arc<Store>,
    config: Config,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let processor_config = proctail_engine::ProcessorConfig {
            enabled_providers: &config.enabled_providers,
            enabled_event_names: &config.enabled_event_names,
            exclude_system_processes: config.exclude_system_processes,
            minimum_process_id: config.minimum_process_id,
            excluded_process_names: &config.excluded_process_names,
            include_file_extensions: config.include_file_extensions.as_deref(),
            exclude_file_patterns: &config.exclude_file_patterns,
        };

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                raw = rx.recv() => {
                    let Some(raw) = raw else { break };
                    if let Some(event) = proctail_engine::process(&raw, &registry, &processor_config) {
                        let tag = event.tag_name.clone();
                        store.store(&tag, event);
                    }
                }
            }
        }
    })
}

fn default_inspector() -> Arc<dyn ProcessInspector> {
    #[cfg(windows)]
    {
        Arc::new(WindowsProcessInspector)
    }
    #[cfg(not(windows))]
    {
        Arc::new(NoopProcessInspector)
    }
}
