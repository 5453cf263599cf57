//! Byte size values for body limits
//!
//! Accepts plain byte counts (`102400`) or human-readable values with a
//! `b`, `kb`, `mb` or `gb` suffix (`100kb`, `1MB`). Units are 1024-based.

use serde::Deserialize;
use std::fmt;

use crate::error::ConfigError;

/// Size in bytes, deserialized from either an integer or a size string
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Deserialize)]
#[serde(try_from = "SizeValue")]
pub struct ByteSize(pub u64);

impl ByteSize {
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ByteSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} bytes", self.0)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum SizeValue {
    Bytes(u64),
    Text(String),
}

impl TryFrom<SizeValue> for ByteSize {
    type Error = ConfigError;

    fn try_from(value: SizeValue) -> Result<Self, Self::Error> {
        match value {
            SizeValue::Bytes(n) => Ok(Self(n)),
            SizeValue::Text(s) => parse_size(&s).map(Self),
        }
    }
}

/// Parse a size string into bytes
pub fn parse_size(input: &str) -> Result<u64, ConfigError> {
    let s = input.trim().to_ascii_lowercase();
    let split = s.find(|c: char| !c.is_ascii_digit()).unwrap_or(s.len());
    let (digits, unit) = s.split_at(split);
    if digits.is_empty() {
        return Err(ConfigError::InvalidSize(input.to_string()));
    }

    let multiplier: u64 = match unit.trim() {
        "" | "b" => 1,
        "kb" => 1024,
        "mb" => 1024 * 1024,
        "gb" => 1024 * 1024 * 1024,
        _ => return Err(ConfigError::InvalidSize(input.to_string())),
    };

    digits
        .parse::<u64>()
        .ok()
        .and_then(|n| n.checked_mul(multiplier))
        .ok_or_else(|| ConfigError::InvalidSize(input.to_string()))
}
