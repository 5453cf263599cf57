//! Request body negotiation
//!
//! Turns the inbound body into an event [`Body`] according to the mode chosen
//! at startup. Requests without a content type are treated as JSON.

use http_body_util::{BodyExt, LengthLimitError, Limited};
use hyper::body::Bytes;
use hyper::header::{HeaderValue, CONTENT_LENGTH, CONTENT_TYPE};
use hyper::HeaderMap;

use crate::config::{BodyConfig, BodyMode};
use crate::error::BodyError;
use crate::invoke::{Body, Params};

/// Content type injected when a request carries none
pub const DEFAULT_REQUEST_CONTENT_TYPE: &str = "application/json";

/// Parser picked for one request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Parser {
    Raw,
    Json,
    Text,
    Form,
    /// Content type the structured mode does not parse
    Skip,
}

impl Parser {
    /// Select the parser for a content type under `mode`
    pub fn select(content_type: &str, mode: BodyMode) -> Self {
        if mode == BodyMode::Raw {
            return Self::Raw;
        }

        let essence = essence(content_type);
        if essence == "application/json" || essence.ends_with("+json") {
            Self::Json
        } else if essence.starts_with("text/") {
            Self::Text
        } else if essence == "application/x-www-form-urlencoded" {
            Self::Form
        } else {
            Self::Skip
        }
    }

    /// Size limit for this parser, `None` when the body is not read
    pub const fn limit(self, cfg: &BodyConfig) -> Option<u64> {
        match self {
            Self::Raw => Some(cfg.raw_limit.as_u64()),
            Self::Json => Some(cfg.json_limit.as_u64()),
            Self::Text => Some(cfg.text_limit.as_u64()),
            Self::Form => Some(cfg.form_limit.as_u64()),
            Self::Skip => None,
        }
    }
}

/// Media type without parameters, lowercased
fn essence(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

/// Insert the default content type when the request has none
///
/// Returns true when the header was injected.
pub fn ensure_content_type(headers: &mut HeaderMap) -> bool {
    if headers.contains_key(CONTENT_TYPE) {
        return false;
    }
    headers.insert(
        CONTENT_TYPE,
        HeaderValue::from_static(DEFAULT_REQUEST_CONTENT_TYPE),
    );
    true
}

/// Pick the parser for a request's headers
pub fn parser_for(headers: &HeaderMap, cfg: &BodyConfig) -> Parser {
    let content_type = headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or(DEFAULT_REQUEST_CONTENT_TYPE);
    Parser::select(content_type, cfg.mode())
}

/// Reject early when `Content-Length` already exceeds the limit
///
/// Missing or malformed lengths pass; the limit is enforced again while
/// reading.
pub fn check_content_length(headers: &HeaderMap, limit: u64) -> Result<(), BodyError> {
    let declared = headers
        .get(CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.trim().parse::<u64>().ok());

    match declared {
        Some(size) if size > limit => Err(BodyError::TooLarge { limit }),
        _ => Ok(()),
    }
}

/// Read and parse a request body
pub async fn read_body<B>(body: B, parser: Parser, cfg: &BodyConfig) -> Result<Body, BodyError>
where
    B: hyper::body::Body<Data = Bytes>,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let Some(limit) = parser.limit(cfg) else {
        return Ok(Body::Empty);
    };

    let bytes = collect_limited(body, limit).await?;
    if bytes.is_empty() {
        return Ok(Body::Empty);
    }

    match parser {
        Parser::Raw => Ok(Body::Raw(bytes)),
        Parser::Json => Ok(Body::Json(serde_json::from_slice(&bytes)?)),
        Parser::Text => String::from_utf8(bytes.to_vec())
            .map(Body::Text)
            .map_err(|_| BodyError::InvalidText),
        Parser::Form => Ok(Body::Form(Params::from_bytes(&bytes))),
        Parser::Skip => Ok(Body::Empty),
    }
}

async fn collect_limited<B>(body: B, limit: u64) -> Result<Bytes, BodyError>
where
    B: hyper::body::Body<Data = Bytes>,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let max = usize::try_from(limit).unwrap_or(usize::MAX);
    match Limited::new(body, max).collect().await {
        Ok(collected) => Ok(collected.to_bytes()),
        Err(e) if e.downcast_ref::<LengthLimitError>().is_some() => {
            Err(BodyError::TooLarge { limit })
        }
        Err(e) => Err(BodyError::Read(e.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ByteSize;
    use http_body_util::Full;
    use serde_json::json;

    fn body_config(raw: bool) -> BodyConfig {
        BodyConfig {
            raw,
            raw_limit: ByteSize(64),
            json_limit: ByteSize(32),
            text_limit: ByteSize(16),
            form_limit: ByteSize(32),
        }
    }

    fn full(data: &'static [u8]) -> Full<Bytes> {
        Full::new(Bytes::from_static(data))
    }

    #[test]
    fn test_select_structured() {
        let mode = BodyMode::Structured;
        assert_eq!(Parser::select("application/json", mode), Parser::Json);
        assert_eq!(
            Parser::select("Application/JSON; charset=utf-8", mode),
            Parser::Json
        );
        assert_eq!(Parser::select("application/ld+json", mode), Parser::Json);
        assert_eq!(Parser::select("text/plain", mode), Parser::Text);
        assert_eq!(Parser::select("text/csv; header=present", mode), Parser::Text);
        assert_eq!(
            Parser::select("application/x-www-form-urlencoded", mode),
            Parser::Form
        );
        assert_eq!(Parser::select("image/png", mode), Parser::Skip);
        assert_eq!(Parser::select("multipart/form-data", mode), Parser::Skip);
    }

    #[test]
    fn test_select_raw_accepts_everything() {
        assert_eq!(Parser::select("image/png", BodyMode::Raw), Parser::Raw);
        assert_eq!(Parser::select("application/json", BodyMode::Raw), Parser::Raw);
    }

    #[test]
    fn test_ensure_content_type() {
        let mut headers = HeaderMap::new();
        assert!(ensure_content_type(&mut headers));
        assert_eq!(headers.get(CONTENT_TYPE).unwrap(), "application/json");

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("text/plain"));
        assert!(!ensure_content_type(&mut headers));
        assert_eq!(headers.get(CONTENT_TYPE).unwrap(), "text/plain");
    }

    #[test]
    fn test_parser_for_missing_content_type() {
        let headers = HeaderMap::new();
        assert_eq!(parser_for(&headers, &body_config(false)), Parser::Json);
    }

    #[test]
    fn test_check_content_length() {
        let mut headers = HeaderMap::new();
        assert!(check_content_length(&headers, 10).is_ok());

        headers.insert(CONTENT_LENGTH, HeaderValue::from_static("10"));
        assert!(check_content_length(&headers, 10).is_ok());

        headers.insert(CONTENT_LENGTH, HeaderValue::from_static("11"));
        assert!(matches!(
            check_content_length(&headers, 10),
            Err(BodyError::TooLarge { limit: 10 })
        ));

        headers.insert(CONTENT_LENGTH, HeaderValue::from_static("abc"));
        assert!(check_content_length(&headers, 10).is_ok());
    }

    #[tokio::test]
    async fn test_read_json() {
        let cfg = body_config(false);
        let body = read_body(full(br#"{"a":[1,2]}"#), Parser::Json, &cfg)
            .await
            .unwrap();
        assert_eq!(body, Body::Json(json!({"a": [1, 2]})));
    }

    #[tokio::test]
    async fn test_read_invalid_json() {
        let cfg = body_config(false);
        let err = read_body(full(b"{not json"), Parser::Json, &cfg)
            .await
            .unwrap_err();
        assert!(matches!(err, BodyError::InvalidJson(_)));
    }

    #[tokio::test]
    async fn test_read_text_and_invalid_utf8() {
        let cfg = body_config(false);
        let body = read_body(full(b"hello"), Parser::Text, &cfg).await.unwrap();
        assert_eq!(body.as_text(), Some("hello"));

        let err = read_body(full(b"\xff\xfe"), Parser::Text, &cfg)
            .await
            .unwrap_err();
        assert!(matches!(err, BodyError::InvalidText));
    }

    #[tokio::test]
    async fn test_read_form() {
        let cfg = body_config(false);
        let body = read_body(full(b"name=ada&tag=a&tag=b"), Parser::Form, &cfg)
            .await
            .unwrap();
        let Body::Form(params) = body else {
            panic!("expected form body");
        };
        assert_eq!(params.get("name"), Some("ada"));
        assert_eq!(params.get_all("tag").len(), 2);
    }

    #[tokio::test]
    async fn test_read_raw_is_untouched() {
        let cfg = body_config(true);
        let body = read_body(full(b"\x00{\"a\":1}"), Parser::Raw, &cfg)
            .await
            .unwrap();
        assert_eq!(body, Body::Raw(Bytes::from_static(b"\x00{\"a\":1}")));
    }

    #[tokio::test]
    async fn test_read_over_limit() {
        let cfg = body_config(false);
        let err = read_body(full(b"this text is longer than sixteen bytes"), Parser::Text, &cfg)
            .await
            .unwrap_err();
        assert!(matches!(err, BodyError::TooLarge { limit: 16 }));
    }

    #[tokio::test]
    async fn test_empty_and_skipped_bodies() {
        let cfg = body_config(false);
        assert_eq!(
            read_body(full(b""), Parser::Json, &cfg).await.unwrap(),
            Body::Empty
        );
        assert_eq!(
            read_body(full(b"\x89PNG"), Parser::Skip, &cfg).await.unwrap(),
            Body::Empty
        );
    }
}
