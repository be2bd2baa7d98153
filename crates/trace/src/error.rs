// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Trace Session Manager error kinds.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TraceError {
    /// The caller does not hold the local elevated-administrator
    /// capability. Fatal to startup.
    #[error("elevated administrator privileges are required to start a trace session")]
    PermissionDenied,

    /// Session creation failed after the retry: in use, too many sessions,
    /// or resource exhaustion.
    #[error("kernel trace session unavailable: {0}")]
    SessionUnavailable(String),

    /// `stop()` did not complete within its bounded wait. Logged as a
    /// warning, not surfaced as a hard failure.
    #[error("trace session did not stop within the timeout")]
    StopTimedOut,
}
