// Configuration module entry point
// Loads process configuration once at startup and holds the shared app state

mod size;
mod state;
mod types;

use std::net::SocketAddr;

use config::builder::DefaultState;
use config::ConfigBuilder;
use hyper::header::HeaderValue;

use crate::error::ConfigError;

// Re-export public types
pub use size::{parse_size, ByteSize};
pub use state::AppState;
pub use types::{
    BodyConfig, BodyMode, Config, FunctionConfig, HttpConfig, LoggingConfig, PerformanceConfig,
    ServerConfig,
};

/// Default config file name (without extension)
pub const DEFAULT_CONFIG_PATH: &str = "config";

const LOG_LEVELS: [&str; 4] = ["debug", "info", "warn", "error"];

impl Config {
    /// Load configuration using the path given on the command line, if any
    ///
    /// Accepts `--config <path>` or a bare first argument.
    pub fn load() -> Result<Self, ConfigError> {
        let args: Vec<String> = std::env::args().skip(1).collect();
        let path = match args.as_slice() {
            [flag, path, ..] if flag == "--config" => path.as_str(),
            [path, ..] if !path.starts_with('-') => path.as_str(),
            _ => DEFAULT_CONFIG_PATH,
        };
        Self::load_from(path)
    }

    /// Load configuration from specified file path (without extension)
    ///
    /// Precedence, lowest first: built-in defaults, the config file,
    /// `FN_`-prefixed environment variables (`FN_SERVER__PORT`), then the
    /// legacy function-template variables (`http_port`, `RAW_BODY`,
    /// `MAX_RAW_SIZE`, `MAX_JSON_SIZE`).
    pub fn load_from(config_path: &str) -> Result<Self, ConfigError> {
        let raw_body = std::env::var("RAW_BODY").ok().map(|v| v == "true");

        let settings = with_defaults()?
            .add_source(config::File::with_name(config_path).required(false))
            .add_source(
                config::Environment::with_prefix("FN")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .set_override_option("server.port", std::env::var("http_port").ok())?
            .set_override_option("body.raw", raw_body)?
            .set_override_option("body.raw_limit", std::env::var("MAX_RAW_SIZE").ok())?
            .set_override_option("body.json_limit", std::env::var("MAX_JSON_SIZE").ok())?
            .build()?;

        let cfg: Self = settings.try_deserialize()?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Built-in defaults only, ignoring files and environment
    pub fn defaults() -> Result<Self, ConfigError> {
        let cfg: Self = with_defaults()?.build()?.try_deserialize()?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn get_socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        let addr = format!("{}:{}", self.server.host, self.server.port);
        addr.parse().map_err(|_| ConfigError::InvalidAddress(addr))
    }

    /// Reject values that would only fail later, per request
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.get_socket_addr()?;

        if !LOG_LEVELS.contains(&self.logging.level.as_str()) {
            return Err(ConfigError::InvalidValue {
                key: "logging.level",
                reason: format!(
                    "'{}' is not one of {}",
                    self.logging.level,
                    LOG_LEVELS.join(", ")
                ),
            });
        }

        if self.logging.access_log_format.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "logging.access_log_format",
                reason: "must not be empty".to_string(),
            });
        }

        if HeaderValue::from_str(&self.http.default_content_type).is_err() {
            return Err(ConfigError::InvalidValue {
                key: "http.default_content_type",
                reason: "not a valid header value".to_string(),
            });
        }

        if HeaderValue::from_str(&self.http.server_name).is_err() {
            return Err(ConfigError::InvalidValue {
                key: "http.server_name",
                reason: "not a valid header value".to_string(),
            });
        }

        if self.performance.connection_timeout == 0 {
            return Err(ConfigError::InvalidValue {
                key: "performance.connection_timeout",
                reason: "must be greater than zero".to_string(),
            });
        }

        Ok(())
    }
}

fn with_defaults() -> Result<ConfigBuilder<DefaultState>, config::ConfigError> {
    config::Config::builder()
        .set_default("server.host", "0.0.0.0")?
        .set_default("server.port", 5555)?
        .set_default("body.raw", false)?
        .set_default("body.raw_limit", "100kb")?
        .set_default("body.json_limit", "100kb")?
        .set_default("body.text_limit", "100kb")?
        .set_default("body.form_limit", "100kb")?
        .set_default("logging.level", "info")?
        .set_default("logging.access_log", true)?
        .set_default("logging.access_log_format", "combined")?
        .set_default("performance.keep_alive", true)?
        .set_default("performance.connection_timeout", 300)?
        .set_default("http.default_content_type", "text/html; charset=utf-8")?
        .set_default("http.server_name", "fn-adapter")?
        .set_default("function.name", "function")
}
