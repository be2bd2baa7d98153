// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Background retention sweep: a long-lived task handed off to the runtime
//! at startup, with the caller holding a `CancellationToken` to stop it.

use crate::Store;
use proctail_core::Clock;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Spawns the periodic reaper. `interval` is the sweep cadence; `retention`
/// is how long an event may live in the store before it is eligible for
/// eviction. Dropping the returned token's cancellation (or letting the
/// handle go unawaited) does not stop the task; call `.cancel()` on the
/// token to stop it, then optionally await the handle.
pub fn spawn_reaper<C: Clock + Send + Sync + 'static>(
    store: Arc<Store>,
    clock: C,
    interval: Duration,
    retention: chrono::Duration,
) -> (JoinHandle<()>, CancellationToken) {
    let token = CancellationToken::new();
    let task_token = token.clone();
    let handle = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = task_token.cancelled() => break,
                _ = ticker.tick() => {
                    store.reap(retention, clock.now());
                }
            }
        }
    });
    (handle, token)
}
