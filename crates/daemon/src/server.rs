// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The IPC Server: accepts connections on the named pipe, handles each on
//! a dedicated task, and dispatches framed requests against
//! the Registry and Store.

use parking_lot::Mutex;
use proctail_core::{Config, SystemClock};
use proctail_registry::{ProcessInspector, Registry};
use proctail_store::Store;
use proctail_wire::{ProtocolError, Request, Response, StatusPayload, WatchTargetDto};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::Notify;
use tokio::task::{AbortHandle, JoinHandle};
use tokio_util::sync::CancellationToken;

/// Shared state every connection handler dispatches against.
pub(crate) struct ListenCtx {
    pub registry: Arc<Registry<SystemClock>>,
    pub store: Arc<Store>,
    pub inspector: Arc<dyn ProcessInspector>,
    pub start_time: Instant,
    /// Cancelled by the orchestrator's `stop()`; the accept loop and every
    /// open connection task watch it to wind down.
    pub cancel: CancellationToken,
    /// Notified by a `Shutdown` request so the orchestrator can schedule
    /// `stop()` after the response has been written.
    pub shutdown_requested: Arc<Notify>,
}

#[derive(Debug, Error)]
pub(crate) enum ConnectionError {
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),
}

fn log_connection_error(e: ConnectionError) {
    match e {
        ConnectionError::Protocol(ProtocolError::ConnectionClosed) => {
            tracing::debug!("client disconnected")
        }
        ConnectionError::Protocol(ProtocolError::Timeout) => {
            tracing::warn!("ipc response deadline exceeded")
        }
        other => tracing::warn!(error = %other, "connection closed on error"),
    }
}

/// Reads, dispatches, and answers framed requests on one connection,
/// looping until the client disconnects. Generic over the stream type so
/// it is exercised in tests against `tokio::io::duplex` pairs without a
/// real pipe.
async fn handle_connection<S>(
    mut stream: S,
    ctx: Arc<ListenCtx>,
    timeout: Duration,
) -> Result<(), ConnectionError>
where
    S: tokio::io::AsyncRead + tokio::io::AsyncWrite + Unpin + Send,
{
    loop {
        let request = match proctail_wire::read_request(&mut stream, timeout).await {
            Ok(Some(request)) => request,
            Ok(None) => return Ok(()),
            Err(e) => return Err(e.into()),
        };

        let is_shutdown = matches!(request, Request::Shutdown);
        tracing::debug!(request = ?request, "handling ipc request");
        let response = handle_request(request, &ctx);
        proctail_wire::write_response(&mut stream, &response, timeout).await?;

        if is_shutdown {
            return Ok(());
        }
    }
}

fn handle_request(request: Request, ctx: &ListenCtx) -> Response {
    match request {
        Request::AddWatchTarget { process_id, tag_name } => {
            if ctx.registry.add(process_id, tag_name) {
                Response::ok()
            } else {
                Response::error(format!("process {process_id} is already a watch target"))
            }
        }

        Request::RemoveWatchTarget { tag_name } => {
            ctx.registry.remove_by_tag(&tag_name);
            Response::ok()
        }

        Request::GetWatchTargets => {
            let targets = ctx
                .registry
                .list_detailed(ctx.inspector.as_ref())
                .into_iter()
                .map(WatchTargetDto::from)
                .collect();
            Response::watch_targets(targets)
        }

        Request::GetRecordedEvents { tag_name } => Response::events(ctx.store.get(&tag_name)),

        Request::ClearEvents { tag_name } => {
            ctx.store.clear(&tag_name);
            Response::ok()
        }

        Request::GetStatus => {
            let stats = ctx.store.stats();
            Response::status(StatusPayload {
                running: true,
                uptime_seconds: ctx.start_time.elapsed().as_secs(),
                watch_target_count: ctx.registry.list().len(),
                tag_count: stats.tag_count,
                event_count: stats.total_event_count,
                estimated_memory_bytes: stats.estimated_memory_bytes,
            })
        }

        // The response is written by `handle_connection` right after this
        // returns; the orchestrator stop itself happens asynchronously once
        // `shutdown_requested` wakes the waiting binary.
        Request::Shutdown => {
            ctx.shutdown_requested.notify_one();
            Response::ok()
        }
    }
}

/// Accepts connections on the named pipe and runs each on its own task,
/// evicting the oldest live connection when `max_connections` would be
/// exceeded.
pub(crate) struct Listener {
    pipe_name: String,
    max_connections: usize,
    response_timeout: Duration,
    ctx: Arc<ListenCtx>,
    active: Mutex<VecDeque<(u64, AbortHandle)>>,
    next_id: AtomicU64,
}

impl Listener {
    fn new(config: &Config, ctx: Arc<ListenCtx>) -> Self {
        Self {
            pipe_name: config.pipe_name.clone(),
            max_connections: config.max_concurrent_connections,
            response_timeout: config.response_timeout(),
            ctx,
            active: Mutex::new(VecDeque::new()),
            next_id: AtomicU64::new(0),
        }
    }

    fn spawn_connection<S>(&self, stream: S)
    where
        S: tokio::io::AsyncRead + tokio::io::AsyncWrite + Unpin + Send + 'static,
    {
        let ctx = self.ctx.clone();
        let timeout = self.response_timeout;
        let handle = tokio::spawn(async move {
            if let Err(e) = handle_connection(stream, ctx, timeout).await {
                log_connection_error(e);
            }
        });

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let mut active = self.active.lock();
        active.retain(|(_, h)| !h.is_finished());
        while active.len() >= self.max_connections {
            let Some((evicted_id, oldest)) = active.pop_front() else { break };
            tracing::debug!(connection = evicted_id, "evicting oldest connection over cap");
            oldest.abort();
        }
        active.push_back((id, handle.abort_handle()));
    }

    #[cfg(windows)]
    async fn run(&self) {
        use tokio::net::windows::named_pipe::ServerOptions;

        let pipe_path = format!(r"\\.\pipe\{}", self.pipe_name);
        let mut first_instance = true;
        loop {
            if self.ctx.cancel.is_cancelled() {
                break;
            }
            let mut options = ServerOptions::new();
            options.first_pipe_instance(first_instance);
            let server = match crate::acl::create_pipe(&options, &pipe_path) {
                Ok(server) => server,
                Err(e) => {
                    tracing::error!(error = %e, "failed to create named pipe instance");
                    tokio::time::sleep(Duration::from_millis(200)).await;
                    continue;
                }
            };
            first_instance = false;

            tokio::select! {
                _ = self.ctx.cancel.cancelled() => break,
                connected = server.connect() => {
                    match connected {
                        Ok(()) => self.spawn_connection(server),
                        Err(e) => tracing::warn!(error = %e, "named pipe connect failed"),
                    }
                }
            }
        }
    }

    /// Named pipes only exist on Windows; off-Windows the accept loop has
    /// nothing to listen on and simply idles until cancelled, the same
    /// compiles-everywhere stance `proctail-trace::Session` takes.
    #[cfg(not(windows))]
    async fn run(&self) {
        self.ctx.cancel.cancelled().await;
    }
}

pub(crate) fn spawn_listener(config: &Config, ctx: Arc<ListenCtx>) -> JoinHandle<()> {
    let listener = Listener::new(config, ctx);
    tokio::spawn(async move { listener.run().await })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proctail_core::{EventVariant, NormalizedEvent};
    use proctail_registry::NoopProcessInspector;
    use std::collections::HashMap;

    fn ctx() -> Arc<ListenCtx> {
        Arc::new(ListenCtx {
            registry: Arc::new(Registry::new(SystemClock)),
            store: Arc::new(Store::new(10)),
            inspector: Arc::new(NoopProcessInspector),
            start_time: Instant::now(),
            cancel: CancellationToken::new(),
            shutdown_requested: Arc::new(Notify::new()),
        })
    }

    #[test]
    fn add_watch_target_is_idempotent_not_overwrite() {
        let c = ctx();
        assert_eq!(handle_request(Request::AddWatchTarget { process_id: 1, tag_name: "a".into() }, &c), Response::ok());
        let again = handle_request(Request::AddWatchTarget { process_id: 1, tag_name: "b".into() }, &c);
        assert!(!again.success);
        assert_eq!(c.registry.tag_of(1), Some("a".to_string()));
    }

    #[test]
    fn get_status_reports_current_counts() {
        let c = ctx();
        c.registry.add(1, "a");
        c.store.store("a", sample_event("a"));
        let response = handle_request(Request::GetStatus, &c);
        assert!(response.success);
    }

    #[test]
    fn clear_events_then_get_recorded_events_is_empty() {
        let c = ctx();
        c.store.store("a", sample_event("a"));
        handle_request(Request::ClearEvents { tag_name: "a".into() }, &c);
        let response = handle_request(Request::GetRecordedEvents { tag_name: "a".into() }, &c);
        assert_eq!(response, Response::events(vec![]));
    }

    #[test]
    fn shutdown_notifies_without_failing() {
        let c = ctx();
        let response = handle_request(Request::Shutdown, &c);
        assert!(response.success);
    }

    #[tokio::test]
    async fn connection_loops_until_client_disconnects() {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let c = ctx();
        let (mut client, server) = tokio::io::duplex(4096);
        let handle = tokio::spawn(handle_connection(server, c, Duration::from_secs(1)));

        for pid in [10u32, 20u32] {
            let body = serde_json::to_vec(&Request::AddWatchTarget { process_id: pid, tag_name: "a".into() }).unwrap();
            client.write_all(&(body.len() as u32).to_le_bytes()).await.unwrap();
            client.write_all(&body).await.unwrap();

            let mut len_buf = [0u8; 4];
            client.read_exact(&mut len_buf).await.unwrap();
            let mut resp_buf = vec![0u8; u32::from_le_bytes(len_buf) as usize];
            client.read_exact(&mut resp_buf).await.unwrap();
            let response: Response = serde_json::from_slice(&resp_buf).unwrap();
            assert!(response.success);
        }

        drop(client);
        handle.await.unwrap().unwrap();
    }

    fn sample_event(tag: &str) -> NormalizedEvent {
        NormalizedEvent {
            timestamp: chrono::Utc::now(),
            tag_name: tag.to_string(),
            process_id: 1,
            thread_id: 1,
            provider_name: "p".into(),
            event_name: "FileIO/Write".into(),
            activity_id: String::new(),
            related_activity_id: String::new(),
            payload: HashMap::new(),
            variant: EventVariant::Generic,
        }
    }
}
