// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! File-path extraction and filtering.

use crate::pattern::any_match;
use proctail_core::Payload;

/// Payload keys tried in order to find a file path.
const PATH_KEYS: &[&str] = &["FileName", "OpenPath", "FilePath", "Name", "FileKey"];

/// Path fragments that mark a path as a test artifact, exempting it from
/// the exclude-pattern blocklist (resolved in DESIGN.md to keep the escape
/// hatch). Matched case-
/// insensitively as a substring of the normalized path.
const TEST_ARTIFACT_MARKERS: &[&str] = &["proctailtest", "test_artifacts", "\\tests\\fixtures\\"];

/// Outcome of extracting a file path from a raw event's payload.
pub enum PathLookup {
    /// A path was found at one of the known keys.
    Found(String),
    /// No path key was present at all.
    Absent,
}

pub fn extract_path(payload: &Payload) -> PathLookup {
    for key in PATH_KEYS {
        if let Some(value) = payload.get(*key).and_then(|v| v.as_str()) {
            return PathLookup::Found(value.to_string());
        }
    }
    PathLookup::Absent
}

fn is_test_artifact(path: &str) -> bool {
    let lower = path.replace('/', "\\").to_lowercase();
    TEST_ARTIFACT_MARKERS.iter().any(|m| lower.contains(m))
}

/// `true` if `path` should be dropped per the include-extension and
/// exclude-pattern configuration.
pub fn path_is_excluded(
    path: &str,
    include_extensions: Option<&[String]>,
    exclude_patterns: &[String],
) -> bool {
    if let Some(allowed) = include_extensions {
        let ext = path.rsplit('.').next().unwrap_or("").to_lowercase();
        let allowed_has_ext =
            allowed.iter().any(|e| e.trim_start_matches('.').to_lowercase() == ext);
        if !allowed_has_ext {
            return true;
        }
    }
    if any_match(exclude_patterns, path) && !is_test_artifact(path) {
        return true;
    }
    false
}
