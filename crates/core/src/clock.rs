// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Clock abstraction for testable time handling.
//!
//! Raw kernel events carry 100ns-resolution timestamps; the clock exposes
//! both a wall-clock `DateTime<Utc>` for normalized events and a raw 100ns
//! tick counter for the trace session manager.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};

/// A clock that provides the current time.
pub trait Clock: Clone + Send + Sync + 'static {
    fn now(&self) -> DateTime<Utc>;

    /// 100ns ticks since the Unix epoch, matching the resolution raw kernel
    /// events are stamped with.
    fn now_100ns(&self) -> u64 {
        let micros = self.now().timestamp_micros();
        (micros.max(0) as u64) * 10
    }
}

/// Real system clock.
#[derive(Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Fake clock for testing with controllable time.
#[derive(Clone)]
pub struct FakeClock {
    micros: Arc<AtomicI64>,
    // Kept for API parity with callers that want a lock-guarded read/modify
    // of multiple fields at once; currently only `micros` is stateful.
    _guard: Arc<Mutex<()>>,
}

impl FakeClock {
    pub fn new() -> Self {
        Self { micros: Arc::new(AtomicI64::new(1_000_000_000_000)), _guard: Arc::new(Mutex::new(())) }
    }

    pub fn advance(&self, duration: chrono::Duration) {
        self.micros.fetch_add(duration.num_microseconds().unwrap_or(0), Ordering::SeqCst);
    }

    pub fn set(&self, time: DateTime<Utc>) {
        self.micros.store(time.timestamp_micros(), Ordering::SeqCst);
    }
}

impl Default for FakeClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for FakeClock {
    fn now(&self) -> DateTime<Utc> {
        DateTime::from_timestamp_micros(self.micros.load(Ordering::SeqCst)).unwrap_or_else(Utc::now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fake_clock_advances() {
        let clock = FakeClock::new();
        let t0 = clock.now();
        clock.advance(chrono::Duration::seconds(5));
        let t1 = clock.now();
        assert_eq!((t1 - t0).num_seconds(), 5);
    }

    #[test]
    fn now_100ns_is_monotonic_with_advance() {
        let clock = FakeClock::new();
        let a = clock.now_100ns();
        clock.advance(chrono::Duration::milliseconds(1));
        let b = clock.now_100ns();
        assert!(b > a);
    }
}
