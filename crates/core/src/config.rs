// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon configuration.
//!
//! Read once at daemon startup. Source precedence: `--config <path>` CLI
//! flag, then `PROCTAIL_CONFIG_DIR`, then a fixed default location.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {0}: {1}")]
    Read(PathBuf, #[source] std::io::Error),
    #[error("failed to parse config file {0}: {1}")]
    Parse(PathBuf, #[source] toml::de::Error),
}

/// Daemon configuration, with every field defaulted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub pipe_name: String,
    pub max_concurrent_connections: usize,
    pub response_timeout_seconds: u64,
    pub buffer_size: usize,
    pub enabled_providers: Vec<String>,
    pub enabled_event_names: Vec<String>,
    pub exclude_system_processes: bool,
    pub minimum_process_id: u32,
    pub excluded_process_names: Vec<String>,
    /// Unset (`None`) means allow-all.
    pub include_file_extensions: Option<Vec<String>>,
    pub exclude_file_patterns: Vec<String>,
    pub max_events_per_tag: usize,
    pub event_retention_hours: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            pipe_name: "ProcTail".to_string(),
            max_concurrent_connections: 20,
            response_timeout_seconds: 60,
            buffer_size: 64 * 1024,
            enabled_providers: vec![
                "Microsoft-Windows-Kernel-File".to_string(),
                "Microsoft-Windows-Kernel-Process".to_string(),
            ],
            enabled_event_names: vec![
                "FileIO/Create".to_string(),
                "FileIO/Write".to_string(),
                "FileIO/Delete".to_string(),
                "FileIO/Rename".to_string(),
                "FileIO/SetInfo".to_string(),
                "FileIO/Close".to_string(),
                "Process/Start".to_string(),
                "Process/End".to_string(),
            ],
            exclude_system_processes: true,
            minimum_process_id: 100,
            excluded_process_names: vec!["System".to_string(), "Idle".to_string()],
            include_file_extensions: None,
            exclude_file_patterns: vec![
                "*\\Temp\\*".to_string(),
                "*\\$Recycle.Bin\\*".to_string(),
            ],
            max_events_per_tag: 10_000,
            event_retention_hours: 24,
        }
    }
}

impl Config {
    /// Load configuration, falling back to `Config::default()` at every
    /// step where a source is absent. Never fails on a missing file; only
    /// fails when a file exists but cannot be read or parsed.
    pub fn load(explicit_path: Option<&Path>) -> Result<Self, ConfigError> {
        let candidate = explicit_path.map(PathBuf::from).or_else(Self::env_config_path);

        let Some(path) = candidate else {
            return Ok(Self::default());
        };
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents =
            std::fs::read_to_string(&path).map_err(|e| ConfigError::Read(path.clone(), e))?;
        toml::from_str(&contents).map_err(|e| ConfigError::Parse(path, e))
    }

    fn env_config_path() -> Option<PathBuf> {
        std::env::var_os("PROCTAIL_CONFIG_DIR").map(|dir| PathBuf::from(dir).join("config.toml"))
    }

    pub fn response_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.response_timeout_seconds)
    }

    pub fn event_retention(&self) -> chrono::Duration {
        chrono::Duration::hours(self.event_retention_hours as i64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_matches_spec_defaults() {
        let c = Config::default();
        assert_eq!(c.pipe_name, "ProcTail");
        assert_eq!(c.max_concurrent_connections, 20);
        assert_eq!(c.response_timeout_seconds, 60);
        assert_eq!(c.max_events_per_tag, 10_000);
        assert_eq!(c.event_retention_hours, 24);
        assert!(c.include_file_extensions.is_none());
    }

    #[test]
    fn load_with_missing_explicit_path_falls_back_to_default() {
        let cfg = Config::load(Some(Path::new("/nonexistent/config.toml"))).unwrap();
        assert_eq!(cfg, Config::default());
    }

    #[test]
    fn load_parses_overrides_from_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "max_events_per_tag = 3\npipe_name = \"Custom\"\n").unwrap();
        let cfg = Config::load(Some(&path)).unwrap();
        assert_eq!(cfg.max_events_per_tag, 3);
        assert_eq!(cfg.pipe_name, "Custom");
        // Unspecified keys still take the default.
        assert_eq!(cfg.response_timeout_seconds, 60);
    }
}
