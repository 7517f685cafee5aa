use serde::{Deserialize, Serialize};

/// Root configuration container.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub service: ServiceConfig,
    #[serde(default)]
    pub editor: EditorConfig,
}

/// Where and how to reach the validation service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Base URL of the service (e.g., "http://127.0.0.1:5000").
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Total request timeout in seconds (default: 10).
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u32,
    /// Connection timeout in seconds (default: 3).
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_seconds: u32,
}

/// Editing behaviour of the interactive front end.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EditorConfig {
    /// Dialect sent with each request (e.g., "mysql", "postgres").
    #[serde(default = "default_dialect")]
    pub dialect: String,
    /// Quiet period after the last edit before validating, in milliseconds.
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
}

fn default_base_url() -> String {
    "http://127.0.0.1:5000".to_string()
}

fn default_timeout() -> u32 {
    10
}

fn default_connect_timeout() -> u32 {
    3
}

fn default_dialect() -> String {
    "mysql".to_string()
}

fn default_debounce_ms() -> u64 {
    500
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_seconds: default_timeout(),
            connect_timeout_seconds: default_connect_timeout(),
        }
    }
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            dialect: default_dialect(),
            debounce_ms: default_debounce_ms(),
        }
    }
}
