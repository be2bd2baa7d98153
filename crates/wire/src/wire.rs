// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Message framing: 4-byte little-endian length prefix + UTF-8 JSON payload.

use std::time::Duration;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::{Request, Response};

/// Maximum frame payload size: 1 MiB.
pub const MAX_MESSAGE_LEN: u32 = 1024 * 1024;

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("connection closed")]
    ConnectionClosed,
    #[error("message of {0} bytes exceeds the {MAX_MESSAGE_LEN}-byte limit")]
    MessageTooLarge(u32),
    #[error("request timed out")]
    Timeout,
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON decode error: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Read one length-prefixed JSON message. Returns `Ok(None)` for a
/// zero-length frame or a clean EOF before any bytes are read — both mean
/// "no message; continue or close".
async fn read_message<R>(reader: &mut R, max_len: u32) -> Result<Option<Vec<u8>>, ProtocolError>
where
    R: AsyncRead + Unpin,
{
    let mut len_buf = [0u8; 4];
    match reader.read_exact(&mut len_buf).await {
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e.into()),
    }
    let len = u32::from_le_bytes(len_buf);
    if len == 0 {
        return Ok(None);
    }
    if len > max_len {
        return Err(ProtocolError::MessageTooLarge(len));
    }

    let mut body = vec![0u8; len as usize];
    reader.read_exact(&mut body).await?;
    Ok(Some(body))
}

async fn write_message<W>(writer: &mut W, body: &[u8]) -> Result<(), ProtocolError>
where
    W: AsyncWrite + Unpin,
{
    if body.len() as u64 > MAX_MESSAGE_LEN as u64 {
        return Err(ProtocolError::MessageTooLarge(body.len() as u32));
    }
    let len = (body.len() as u32).to_le_bytes();
    writer.write_all(&len).await?;
    writer.write_all(body).await?;
    writer.flush().await?;
    Ok(())
}

/// Read one framed `Request`, bounded by `timeout`. `Ok(None)` means the
/// connection has nothing more to offer and should be closed.
pub async fn read_request<R>(
    reader: &mut R,
    timeout: Duration,
) -> Result<Option<Request>, ProtocolError>
where
    R: AsyncRead + Unpin,
{
    let body = match tokio::time::timeout(timeout, read_message(reader, MAX_MESSAGE_LEN)).await {
        Ok(result) => result?,
        Err(_) => return Err(ProtocolError::Timeout),
    };
    let Some(body) = body else {
        return Ok(None);
    };
    let request: Request = serde_json::from_slice(&body)?;
    Ok(Some(request))
}

/// Write one framed `Response`, bounded by `timeout`.
pub async fn write_response<W>(
    writer: &mut W,
    response: &Response,
    timeout: Duration,
) -> Result<(), ProtocolError>
where
    W: AsyncWrite + Unpin,
{
    let body = serde_json::to_vec(response)?;
    match tokio::time::timeout(timeout, write_message(writer, &body)).await {
        Ok(result) => result,
        Err(_) => Err(ProtocolError::Timeout),
    }
}

/// Write one framed `Request`, bounded by `timeout`. The control-client
/// counterpart to `write_response`.
pub async fn write_request<W>(
    writer: &mut W,
    request: &Request,
    timeout: Duration,
) -> Result<(), ProtocolError>
where
    W: AsyncWrite + Unpin,
{
    let body = serde_json::to_vec(request)?;
    match tokio::time::timeout(timeout, write_message(writer, &body)).await {
        Ok(result) => result,
        Err(_) => Err(ProtocolError::Timeout),
    }
}

/// Read one framed `Response`, bounded by `timeout`. `Ok(None)` means the
/// daemon closed the connection without answering. The control-client
/// counterpart to `read_request`.
pub async fn read_response<R>(
    reader: &mut R,
    timeout: Duration,
) -> Result<Option<Response>, ProtocolError>
where
    R: AsyncRead + Unpin,
{
    let body = match tokio::time::timeout(timeout, read_message(reader, MAX_MESSAGE_LEN)).await {
        Ok(result) => result?,
        Err(_) => return Err(ProtocolError::Timeout),
    };
    let Some(body) = body else {
        return Ok(None);
    };
    let response: Response = serde_json::from_slice(&body)?;
    Ok(Some(response))
}
