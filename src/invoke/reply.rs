//! Reply and failure values produced by functions.
//!
//! A [`Reply`] is tagged once, when it is built, with the encoding it needs on
//! the wire: sequences and structured values are sent as JSON text, everything
//! else is sent as-is.

use std::fmt;

use hyper::body::Bytes;
use serde::Serialize;
use serde_json::{Map, Value};

/// Successful outcome of an invocation
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    /// Array-like value, sent as JSON
    Sequence(Vec<Value>),
    /// Keyed value, sent as JSON
    Structured(Map<String, Value>),
    /// Text sent verbatim, never quoted
    Text(String),
    /// Bytes sent verbatim
    Binary(Bytes),
    /// No body
    Empty,
}

impl Reply {
    /// Serialize any value and tag it by its JSON shape
    pub fn json<T: Serialize>(value: &T) -> Result<Self, serde_json::Error> {
        serde_json::to_value(value).map(Self::from)
    }

    /// True for replies whose body is JSON text
    pub const fn is_json(&self) -> bool {
        matches!(self, Self::Sequence(_) | Self::Structured(_))
    }

    /// Encode the reply into the exact bytes written to the client
    pub fn into_bytes(self) -> Result<Bytes, serde_json::Error> {
        match self {
            Self::Sequence(items) => serde_json::to_vec(&items).map(Bytes::from),
            Self::Structured(map) => serde_json::to_vec(&map).map(Bytes::from),
            Self::Text(text) => Ok(Bytes::from(text)),
            Self::Binary(bytes) => Ok(bytes),
            Self::Empty => Ok(Bytes::new()),
        }
    }
}

impl From<Value> for Reply {
    fn from(value: Value) -> Self {
        match value {
            Value::Array(items) => Self::Sequence(items),
            Value::Object(map) => Self::Structured(map),
            Value::String(text) => Self::Text(text),
            Value::Null => Self::Empty,
            other @ (Value::Bool(_) | Value::Number(_)) => Self::Text(other.to_string()),
        }
    }
}

impl From<Vec<Value>> for Reply {
    fn from(items: Vec<Value>) -> Self {
        Self::Sequence(items)
    }
}

impl From<Map<String, Value>> for Reply {
    fn from(map: Map<String, Value>) -> Self {
        Self::Structured(map)
    }
}

impl From<String> for Reply {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<&str> for Reply {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<Bytes> for Reply {
    fn from(bytes: Bytes) -> Self {
        Self::Binary(bytes)
    }
}

impl From<Vec<u8>> for Reply {
    fn from(bytes: Vec<u8>) -> Self {
        Self::Binary(Bytes::from(bytes))
    }
}

impl From<()> for Reply {
    fn from((): ()) -> Self {
        Self::Empty
    }
}

/// Failed outcome of an invocation
///
/// Carries only the textual form of the error, which becomes the response
/// body. Any `std::error::Error` converts into it, so `?` works in functions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Failure {
    message: String,
}

impl Failure {
    pub fn msg(message: impl fmt::Display) -> Self {
        Self {
            message: message.to_string(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl<E> From<E> for Failure
where
    E: std::error::Error,
{
    fn from(err: E) -> Self {
        Self::msg(err)
    }
}
