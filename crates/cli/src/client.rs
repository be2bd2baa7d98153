// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! A thin connect-send-read client for the daemon's named pipe. No
//! retry/reconnect policy beyond the initial connect: one connection, one
//! request, one response.

use proctail_wire::{ProtocolError, Request, Response};
use std::time::Duration;
use thiserror::Error;

const CONNECT_RETRY_DELAY: Duration = Duration::from_millis(50);
const CONNECT_ATTEMPTS: u32 = 20;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("could not connect to daemon pipe {0}: {1}")]
    Connect(String, std::io::Error),
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
    #[error("daemon closed the connection without responding")]
    NoResponse,
}

pub struct DaemonClient {
    pipe_name: String,
    timeout: Duration,
}

impl DaemonClient {
    pub fn new(pipe_name: impl Into<String>, timeout: Duration) -> Self {
        Self { pipe_name: pipe_name.into(), timeout }
    }

    /// Connects, writes one framed request, reads one framed response, and
    /// closes the connection.
    pub async fn send(&self, request: &Request) -> Result<Response, ClientError> {
        #[cfg(windows)]
        {
            let mut stream = self.connect().await?;
            proctail_wire::write_request(&mut stream, request, self.timeout).await?;
            proctail_wire::read_response(&mut stream, self.timeout)
                .await?
                .ok_or(ClientError::NoResponse)
        }
        #[cfg(not(windows))]
        {
            let _ = request;
            Err(ClientError::Connect(
                self.pipe_path(),
                std::io::Error::other("named pipes are only available on windows"),
            ))
        }
    }

    fn pipe_path(&self) -> String {
        format!(r"\\.\pipe\{}", self.pipe_name)
    }

    #[cfg(windows)]
    async fn connect(&self) -> Result<tokio::net::windows::named_pipe::NamedPipeClient, ClientError> {
        use tokio::net::windows::named_pipe::ClientOptions;
        use windows::Win32::Foundation::ERROR_PIPE_BUSY;

        let path = self.pipe_path();
        for attempt in 1..CONNECT_ATTEMPTS {
            match ClientOptions::new().open(&path) {
                Ok(client) => return Ok(client),
                Err(e) if e.raw_os_error() == Some(ERROR_PIPE_BUSY.0 as i32) => {
                    let _ = attempt;
                    tokio::time::sleep(CONNECT_RETRY_DELAY).await;
                }
                Err(e) => return Err(ClientError::Connect(path, e)),
            }
        }
        ClientOptions::new().open(&path).map_err(|e| ClientError::Connect(path, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pipe_path_matches_the_daemon_listeners_convention() {
        let client = DaemonClient::new("ProcTail", Duration::from_secs(1));
        assert_eq!(client.pipe_path(), r"\\.\pipe\ProcTail");
    }
}
