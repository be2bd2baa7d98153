// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The Trace Session Manager: owns the single kernel trace session for this
//! daemon instance and surfaces raw events on a bounded channel.

use crate::elevation::is_elevated;
use crate::naming::{random_suffix, session_name};
use crate::session::Session;
use proctail_core::RawEvent;
use std::process;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

use crate::error::TraceError;

const STOP_TIMEOUT: Duration = Duration::from_secs(5);

/// Owns the kernel trace session. Constructed once per daemon instance;
/// `start()` is not re-entrant: only one session may be active per daemon
/// instance.
pub struct TraceSessionManager {
    raw_event_channel_capacity: usize,
    include_file_read: bool,
    session: parking_lot::Mutex<Option<Session>>,
    dropped_events: Arc<AtomicU64>,
}

impl TraceSessionManager {
    pub fn new(raw_event_channel_capacity: usize, include_file_read: bool) -> Self {
        Self {
            raw_event_channel_capacity,
            include_file_read,
            session: parking_lot::Mutex::new(None),
            dropped_events: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Number of raw events dropped because the channel to the processor
    /// was full. Surfaced to clients as an `EventDropped` count.
    pub fn dropped_event_count(&self) -> u64 {
        self.dropped_events.load(Ordering::Relaxed)
    }

    /// Runs the full startup protocol and returns the receiving half of the
    /// raw-event channel. Retries session creation once on failure before
    /// giving up.
    pub fn start(&self) -> Result<mpsc::Receiver<RawEvent>, TraceError> {
        if !is_elevated() {
            return Err(TraceError::PermissionDenied);
        }

        self.best_effort_cleanup();

        let (tx, rx) = mpsc::channel(self.raw_event_channel_capacity);
        let pid = process::id();
        let first_attempt = session_name(pid, &random_suffix());
        let session = match Session::start(
            first_attempt,
            self.include_file_read,
            tx.clone(),
            self.dropped_events.clone(),
        ) {
            Ok(session) => session,
            Err(err) => {
                tracing::warn!(error = %err, "trace session creation failed, retrying once");
                self.best_effort_cleanup();
                let retry_name = session_name(pid, &random_suffix());
                Session::start(retry_name, self.include_file_read, tx, self.dropped_events.clone())?
            }
        };

        *self.session.lock() = Some(session);
        Ok(rx)
    }

    /// Cancels the consumer, stops the session, and runs cleanup a second
    /// time. A timeout here is logged, not fatal; process exit still
    /// releases the kernel session.
    pub fn stop(&self) {
        if let Some(session) = self.session.lock().take() {
            if let Err(err) = session.stop(STOP_TIMEOUT) {
                tracing::warn!(error = %err, "trace session did not stop cleanly");
            }
        }
        self.best_effort_cleanup();
    }

    /// Stops any trace session left over from a prior instance of this
    /// daemon under the simple (no-suffix) legacy name, ignoring
    /// not-found — a narrowed cleanup scope rather than a system-wide
    /// sweep.
    fn best_effort_cleanup(&self) {
        #[cfg(windows)]
        {
            let legacy_name = format!("ProcTail-Kernel-{}", process::id());
            let _ = ferrisetw::trace::stop_trace_by_name(&legacy_name);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dropped_event_count_starts_at_zero() {
        let manager = TraceSessionManager::new(256, false);
        assert_eq!(manager.dropped_event_count(), 0);
    }

    #[cfg(not(windows))]
    #[test]
    fn start_without_elevation_or_platform_support_fails() {
        let manager = TraceSessionManager::new(256, false);
        assert!(manager.start().is_err());
    }
}
