//! Configuration schema definitions.
//!
//! All types derive Serde traits for deserialization from a TOML file and
//! every field has a default, so an empty file is a valid configuration.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::shipper::Level;

/// Root configuration for the server.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Listener and static asset settings.
    pub server: ServerConfig,

    /// Log sink and shipper settings.
    pub sink: SinkConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Local diagnostics settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0:5000").
    pub bind_address: String,

    /// HTML file served at `/test`.
    pub static_file: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:5000".to_string(),
            static_file: "static/test.html".to_string(),
        }
    }
}

/// Log sink configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SinkConfig {
    /// Push endpoint of the log sink.
    pub push_url: String,

    /// Labels attached to every shipped line.
    pub labels: BTreeMap<String, String>,

    /// Maximum time an event waits before a flush, in milliseconds.
    pub batch_wait_ms: u64,

    /// Buffered events that force a flush.
    pub batch_max_entries: usize,

    /// Hard bound on buffered events during sink outages.
    pub max_buffered_entries: usize,

    /// Minimum level shipped to the sink.
    pub send_level: Level,

    /// Minimum level also printed locally.
    pub print_level: Level,

    /// Longer lines are truncated.
    pub max_line_bytes: usize,

    /// Per-push HTTP timeout in seconds.
    pub request_timeout_secs: u64,

    /// Push attempts per batch, including the first.
    pub max_attempts: u32,

    /// Base delay for exponential backoff in milliseconds.
    pub retry_base_delay_ms: u64,

    /// Maximum delay for exponential backoff in milliseconds.
    pub retry_max_delay_ms: u64,

    /// Upper bound on the final drain at shutdown, in seconds.
    pub shutdown_timeout_secs: u64,
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self {
            push_url: "http://localhost:3100/loki/api/v1/push".to_string(),
            labels: BTreeMap::from([("app".to_string(), "crud-server".to_string())]),
            batch_wait_ms: 5_000,
            batch_max_entries: 10_000,
            max_buffered_entries: 50_000,
            send_level: Level::Info,
            print_level: Level::Error,
            max_line_bytes: 64 * 1024,
            request_timeout_secs: 10,
            max_attempts: 3,
            retry_base_delay_ms: 250,
            retry_max_delay_ms: 5_000,
            shutdown_timeout_secs: 10,
        }
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 30 }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Tracing filter directive (e.g. "info" or "loki_crud_server=debug").
    pub log_level: String,

    /// Emit process logs as JSON lines.
    pub json_logs: bool,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "loki_crud_server=info,tower_http=info".to_string(),
            json_logs: false,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
