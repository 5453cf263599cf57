//! Error types for the boundary layers (configuration and body parsing).
//!
//! Handler failures never show up here: they are reported through the
//! invocation context and always end up as an HTTP response.

use hyper::StatusCode;
use thiserror::Error;

/// Errors raised while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Underlying config source error (file, environment, deserialization).
    #[error("config error: {0}")]
    Source(#[from] config::ConfigError),

    /// A size limit that is neither a byte count nor a `kb`/`mb`/`gb` value.
    #[error("invalid size '{0}': expected a byte count or a value like 100kb")]
    InvalidSize(String),

    /// Host/port pair that does not form a socket address.
    #[error("invalid listen address '{0}'")]
    InvalidAddress(String),

    /// Any other rejected value.
    #[error("invalid value for {key}: {reason}")]
    InvalidValue { key: &'static str, reason: String },
}

/// Errors raised while turning a request body into an event body.
#[derive(Debug, Error)]
pub enum BodyError {
    /// Body exceeds the limit configured for its content type.
    #[error("request body exceeds limit of {limit} bytes")]
    TooLarge { limit: u64 },

    /// JSON body did not parse.
    #[error("invalid JSON body: {0}")]
    InvalidJson(#[from] serde_json::Error),

    /// `text/*` body is not valid UTF-8.
    #[error("text body is not valid UTF-8")]
    InvalidText,

    /// The connection failed while the body was being read.
    #[error("failed to read request body: {0}")]
    Read(String),
}

impl BodyError {
    /// Status code of the boundary response for this error.
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::TooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            Self::InvalidJson(_) | Self::InvalidText | Self::Read(_) => StatusCode::BAD_REQUEST,
        }
    }
}
