// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Session naming scheme.
//!
//! Session names are `{prefix}-{pid}-{suffix}` so a restart whose previous
//! session name has not yet been released by the OS can still allocate a
//! fresh one. Cleanup is narrowed to sessions matching this daemon's naming
//! prefix plus the prior instance's exact name if known — not a broader
//! substring/well-known-logger sweep.

const SESSION_PREFIX: &str = "ProcTail-Kernel";

pub fn session_name(pid: u32, suffix: &str) -> String {
    format!("{SESSION_PREFIX}-{pid}-{suffix}")
}

pub fn random_suffix() -> String {
    use rand::Rng;
    const CHARS: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";
    let mut rng = rand::thread_rng();
    (0..6).map(|_| CHARS[rng.gen_range(0..CHARS.len())] as char).collect()
}

/// `true` if `name` was produced by this scheme for the current process
/// (used to scope best-effort cleanup to our own prior sessions).
pub fn matches_prefix(name: &str, pid: u32) -> bool {
    name.starts_with(&format!("{SESSION_PREFIX}-{pid}-"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_name_matches_its_own_prefix() {
        let name = session_name(1234, &random_suffix());
        assert!(matches_prefix(&name, 1234));
        assert!(!matches_prefix(&name, 9999));
    }

    #[test]
    fn suffixes_are_not_trivially_identical() {
        let a = random_suffix();
        let b = random_suffix();
        assert_eq!(a.len(), 6);
        assert_ne!(a, b, "collision probability is astronomically low for this test");
    }
}
