// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Best-effort OS process metadata lookup for `list_detailed`. Kept behind
//! a trait abstracting OS process access so tests can fake it.

/// Process metadata surfaced for a live watch target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessInfo {
    pub process_name: String,
    pub image_path: String,
}

/// Looks up live process metadata by pid. Returns `None` when the process
/// is gone or inaccessible; the caller renders that as `[Terminated]` /
/// `[Access Denied]`.
pub trait ProcessInspector: Send + Sync {
    fn inspect(&self, pid: u32) -> Option<ProcessInfo>;
}

/// An inspector that never finds anything — used in unit tests and as a
/// placeholder until a platform inspector is wired in.
pub struct NoopProcessInspector;

impl ProcessInspector for NoopProcessInspector {
    fn inspect(&self, _pid: u32) -> Option<ProcessInfo> {
        None
    }
}

#[cfg(windows)]
pub struct WindowsProcessInspector;

#[cfg(windows)]
impl ProcessInspector for WindowsProcessInspector {
    fn inspect(&self, pid: u32) -> Option<ProcessInfo> {
        use windows::Win32::Foundation::CloseHandle;
        use windows::Win32::System::ProcessStatus::K32GetModuleFileNameExW;
        use windows::Win32::System::Threading::{
            OpenProcess, PROCESS_QUERY_LIMITED_INFORMATION, PROCESS_VM_READ,
        };

        // SAFETY: `OpenProcess` and friends are Win32 calls with no Rust
        // safety invariants beyond checking their return values, which we do.
        unsafe {
            let handle = OpenProcess(PROCESS_QUERY_LIMITED_INFORMATION | PROCESS_VM_READ, false, pid)
                .ok()?;
            let mut buf = [0u16; 1024];
            let len = K32GetModuleFileNameExW(Some(handle), None, &mut buf);
            let _ = CloseHandle(handle);
            if len == 0 {
                return None;
            }
            let image_path = String::from_utf16_lossy(&buf[..len as usize]);
            let process_name = image_path
                .rsplit(['\\', '/'])
                .next()
                .unwrap_or(&image_path)
                .to_string();
            Some(ProcessInfo { process_name, image_path })
        }
    }
}
