// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! IPC protocol for ProcTail daemon communication.
//!
//! Wire format: 4-byte length prefix (little-endian) + UTF-8 JSON payload.

mod request;
mod response;
mod wire;

pub use request::Request;
pub use response::{Response, ResponsePayload, StatusPayload, WatchTargetDto};
pub use wire::{read_request, read_response, write_request, write_response, ProtocolError, MAX_MESSAGE_LEN};

#[cfg(test)]
mod property_tests;
