// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Pipe discretionary access control: the owning user and the local
//! administrators group get full control, nothing else.

#![cfg(windows)]

use std::ffi::c_void;
use tokio::net::windows::named_pipe::{NamedPipeServer, ServerOptions};
use windows::core::w;
use windows::Win32::Foundation::{LocalFree, HLOCAL};
use windows::Win32::Security::Authorization::ConvertStringSecurityDescriptorToSecurityDescriptorW;
use windows::Win32::Security::{PSECURITY_DESCRIPTOR, SECURITY_ATTRIBUTES};

/// `OW` = the creating user (owner), `BA` = built-in administrators; `GA` is
/// generic-all. Revision 1 is the only SDDL revision Windows defines.
const PIPE_SDDL: windows::core::PCWSTR = w!("D:(A;;GA;;;OW)(A;;GA;;;BA)");
const SDDL_REVISION_1: u32 = 1;

/// Builds the security descriptor once per pipe instance and creates it
/// with that descriptor attached, so every client connection is subject to
/// the same ACL regardless of which instance accepted it.
pub(crate) fn create_pipe(options: &ServerOptions, name: &str) -> std::io::Result<NamedPipeServer> {
    // SAFETY: `descriptor` is populated by `ConvertStringSecurityDescriptorToSecurityDescriptorW`
    // from a fixed, valid SDDL string and freed with `LocalFree` on every path.
    unsafe {
        let mut descriptor = PSECURITY_DESCRIPTOR::default();
        ConvertStringSecurityDescriptorToSecurityDescriptorW(
            PIPE_SDDL,
            SDDL_REVISION_1,
            &mut descriptor,
            None,
        )
        .map_err(|e| std::io::Error::other(e.to_string()))?;

        let mut attrs = SECURITY_ATTRIBUTES {
            nLength: std::mem::size_of::<SECURITY_ATTRIBUTES>() as u32,
            lpSecurityDescriptor: descriptor.0,
            bInheritHandle: false.into(),
        };

        let result =
            options.create_with_security_attributes_raw(name, &mut attrs as *mut _ as *mut c_void);
        let _ = LocalFree(HLOCAL(descriptor.0 as isize));
        result
    }
}
