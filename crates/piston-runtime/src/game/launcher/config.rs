//! Launch supervisor configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_LAUNCHER_NAME: &str = "PistonRuntime";
pub const DEFAULT_LAUNCHER_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Encoding used when output can't be identified
pub const DEFAULT_FALLBACK_ENCODING: &str = "utf-8";

pub const DEFAULT_READ_BUFFER_SIZE: usize = 8 * 1024;
pub const DEFAULT_EVENT_CAPACITY: usize = 1024;
pub const DEFAULT_OUTPUT_DRAIN_TIMEOUT_MS: u64 = 2_000;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SupervisorConfig {
    /// `${launcher_name}` and `-Dminecraft.launcher.brand`
    pub launcher_name: String,
    /// `${launcher_version}` and `-Dminecraft.launcher.version`
    pub launcher_version: String,
    /// WHATWG label, e.g. "utf-8", "gbk", "windows-1252"
    pub fallback_encoding: String,
    /// Authorities whose `--server` host gets rewritten to loopback
    pub dev_authorities: Vec<String>,
    /// Chunk size for stdout/stderr reads
    pub read_buffer_size: usize,
    /// Per-launch event channel capacity
    pub event_capacity: usize,
    /// How long to keep reading output after the process exited. Children
    /// that inherited the pipes can hold them open indefinitely.
    pub output_drain_timeout_ms: u64,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            launcher_name: DEFAULT_LAUNCHER_NAME.to_string(),
            launcher_version: DEFAULT_LAUNCHER_VERSION.to_string(),
            fallback_encoding: DEFAULT_FALLBACK_ENCODING.to_string(),
            dev_authorities: vec!["localhost".to_string(), "127.0.0.1".to_string()],
            read_buffer_size: DEFAULT_READ_BUFFER_SIZE,
            event_capacity: DEFAULT_EVENT_CAPACITY,
            output_drain_timeout_ms: DEFAULT_OUTPUT_DRAIN_TIMEOUT_MS,
        }
    }
}

impl SupervisorConfig {
    pub fn output_drain_timeout(&self) -> Duration {
        Duration::from_millis(self.output_drain_timeout_ms)
    }

    /// Whether `authority` is one of the configured development servers.
    /// Matches on the host part, so "http://localhost:25566" counts.
    pub fn is_dev_authority(&self, authority: &str) -> bool {
        let host = authority
            .trim()
            .trim_start_matches("https://")
            .trim_start_matches("http://")
            .split(['/', ':'])
            .next()
            .unwrap_or_default();
        self.dev_authorities
            .iter()
            .any(|d| d.eq_ignore_ascii_case(authority.trim()) || d.eq_ignore_ascii_case(host))
    }
}
