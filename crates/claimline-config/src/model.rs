// SPDX-FileCopyrightText: 2026 Claimline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the claimline service.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Top-level claimline configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable overrides.
/// All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ClaimlineConfig {
    /// Logging settings.
    #[serde(default)]
    pub log: LogConfig,

    /// Storage backend settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Queue engine settings.
    #[serde(default)]
    pub queue: QueueConfig,

    /// Background sweep settings.
    #[serde(default)]
    pub sweep: SweepConfig,

    /// HTTP gateway settings.
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Prometheus metrics settings.
    #[serde(default)]
    pub metrics: MetricsConfig,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct LogConfig {
    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Storage backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Enable WAL (Write-Ahead Logging) mode for SQLite.
    #[serde(default = "default_wal_mode")]
    pub wal_mode: bool,

    /// How long SQLite waits on a locked database file before failing.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            wal_mode: default_wal_mode(),
            busy_timeout_ms: default_busy_timeout_ms(),
        }
    }
}

impl StorageConfig {
    /// Storage settings for an on-disk database at `path` with defaults elsewhere.
    pub fn at_path(path: impl Into<String>) -> Self {
        Self {
            database_path: path.into(),
            ..Self::default()
        }
    }
}

fn default_database_path() -> String {
    dirs::data_dir()
        .map(|p| p.join("claimline").join("claimline.db"))
        .unwrap_or_else(|| std::path::PathBuf::from("claimline.db"))
        .to_string_lossy()
        .into_owned()
}

fn default_wal_mode() -> bool {
    true
}

fn default_busy_timeout_ms() -> u64 {
    5000
}

/// Queue engine and query configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct QueueConfig {
    /// Maximum time a mutation waits for its item's lock before reporting a conflict.
    #[serde(default = "default_lock_timeout_ms")]
    pub lock_timeout_ms: u64,

    /// Age after which a pending head-of-queue claim is considered stale.
    #[serde(default = "default_stale_head_after_secs")]
    pub stale_head_after_secs: u64,

    /// Age after which pending claims expire. `None` disables time-based expiry.
    #[serde(default)]
    pub pending_expiry_secs: Option<u64>,

    /// Page size for per-user claim listings when the caller gives none.
    #[serde(default = "default_claims_limit")]
    pub default_claims_limit: usize,

    /// Upper bound for per-user claim listings.
    #[serde(default = "default_max_claims_limit")]
    pub max_claims_limit: usize,

    /// Capacity of the notification hand-off buffer.
    #[serde(default = "default_notification_buffer")]
    pub notification_buffer: usize,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            lock_timeout_ms: default_lock_timeout_ms(),
            stale_head_after_secs: default_stale_head_after_secs(),
            pending_expiry_secs: None,
            default_claims_limit: default_claims_limit(),
            max_claims_limit: default_max_claims_limit(),
            notification_buffer: default_notification_buffer(),
        }
    }
}

impl QueueConfig {
    pub fn lock_timeout(&self) -> Duration {
        Duration::from_millis(self.lock_timeout_ms)
    }

    pub fn stale_head_after(&self) -> Duration {
        Duration::from_secs(self.stale_head_after_secs)
    }

    pub fn pending_expiry(&self) -> Option<Duration> {
        self.pending_expiry_secs.map(Duration::from_secs)
    }
}

fn default_lock_timeout_ms() -> u64 {
    5000
}

fn default_stale_head_after_secs() -> u64 {
    24 * 60 * 60
}

fn default_claims_limit() -> usize {
    50
}

fn default_max_claims_limit() -> usize {
    500
}

fn default_notification_buffer() -> usize {
    1024
}

/// Periodic expiry/reminder sweep configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SweepConfig {
    /// Run the sweep inside `claimline serve`.
    #[serde(default = "default_sweep_enabled")]
    pub enabled: bool,

    /// Seconds between sweep ticks.
    #[serde(default = "default_sweep_interval_secs")]
    pub interval_secs: u64,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            enabled: default_sweep_enabled(),
            interval_secs: default_sweep_interval_secs(),
        }
    }
}

impl SweepConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

fn default_sweep_enabled() -> bool {
    true
}

fn default_sweep_interval_secs() -> u64 {
    300
}

/// HTTP gateway configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct GatewayConfig {
    /// Serve the HTTP API inside `claimline serve`.
    #[serde(default = "default_gateway_enabled")]
    pub enabled: bool,

    /// Host address to bind.
    #[serde(default = "default_gateway_host")]
    pub host: String,

    /// Port to bind.
    #[serde(default = "default_gateway_port")]
    pub port: u16,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            enabled: default_gateway_enabled(),
            host: default_gateway_host(),
            port: default_gateway_port(),
        }
    }
}

fn default_gateway_enabled() -> bool {
    true
}

fn default_gateway_host() -> String {
    "127.0.0.1".to_string()
}

fn default_gateway_port() -> u16 {
    3180
}

/// Prometheus metrics configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct MetricsConfig {
    /// Install the Prometheus recorder and expose `/metrics`.
    #[serde(default)]
    pub enabled: bool,
}
