// Configuration types module
// Defines all configuration-related data structures

use serde::{Deserialize, Serialize};

use super::size::ByteSize;

/// Main configuration structure
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub body: BodyConfig,
    pub logging: LoggingConfig,
    pub performance: PerformanceConfig,
    pub http: HttpConfig,
    pub function: FunctionConfig,
}

/// Server configuration
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// Body parsing configuration, selected once at startup
#[derive(Debug, Deserialize, Clone)]
pub struct BodyConfig {
    /// Hand every body to the function as untouched bytes
    pub raw: bool,
    pub raw_limit: ByteSize,
    pub json_limit: ByteSize,
    pub text_limit: ByteSize,
    pub form_limit: ByteSize,
}

impl BodyConfig {
    /// Parsing mode derived from the `raw` toggle
    pub const fn mode(&self) -> BodyMode {
        if self.raw {
            BodyMode::Raw
        } else {
            BodyMode::Structured
        }
    }

    /// Largest limit that applies in the current mode
    pub fn max_limit(&self) -> u64 {
        match self.mode() {
            BodyMode::Raw => self.raw_limit.as_u64(),
            BodyMode::Structured => self
                .json_limit
                .max(self.text_limit)
                .max(self.form_limit)
                .as_u64(),
        }
    }
}

/// How request bodies are presented to the function
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BodyMode {
    /// Any content type, bytes passed through as-is
    Raw,
    /// Text, JSON and form bodies are parsed; others are skipped
    Structured,
}

/// Logging configuration
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LoggingConfig {
    pub level: String,
    pub access_log: bool,
    /// Access log format (combined, common, json, or custom pattern)
    #[serde(default = "default_access_log_format")]
    pub access_log_format: String,
    /// Access log file path (optional, stdout if not set)
    #[serde(default)]
    pub access_log_file: Option<String>,
    /// Error log file path (optional, stderr if not set)
    #[serde(default)]
    pub error_log_file: Option<String>,
}

#[allow(clippy::missing_const_for_fn)]
fn default_access_log_format() -> String {
    "combined".to_string()
}

/// Performance configuration
#[derive(Debug, Deserialize, Clone)]
pub struct PerformanceConfig {
    pub keep_alive: bool,
    /// Upper bound for serving one connection, in seconds
    pub connection_timeout: u64,
}

/// HTTP configuration
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct HttpConfig {
    /// Content type for text replies and error bodies
    pub default_content_type: String,
    pub server_name: String,
}

/// Function metadata
#[derive(Debug, Deserialize, Clone)]
pub struct FunctionConfig {
    /// Name printed in the startup banner
    pub name: String,
}
