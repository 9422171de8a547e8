//! Configuration schema definitions.
//!
//! All types derive Serde traits for deserialization from TOML files, and
//! every field has a default so an empty file is a valid configuration.

use serde::{Deserialize, Serialize};

/// Root configuration for the conn-stream layer.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct LayerConfig {
    /// Conn-stream table sizing.
    pub table: TableConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Conn-stream table configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TableConfig {
    /// Slots reserved up front.
    pub initial_capacity: usize,

    /// Maximum live conn-streams (0 = unbounded).
    pub max_conn_streams: usize,
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            initial_capacity: 64,
            max_conn_streams: 0,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log output format (pretty, json).
    pub log_format: String,

    /// Record conn-stream counters through the `metrics` facade.
    pub metrics_enabled: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: "pretty".to_string(),
            metrics_enabled: true,
        }
    }
}
