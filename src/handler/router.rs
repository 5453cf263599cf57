//! Request pipeline module
//!
//! Entry point for HTTP request processing: method gate, content-type
//! defaulting, body negotiation, function invocation and access logging.
//! Every path reaches the same function.

use crate::config::AppState;
use crate::http;
use crate::invoke::{self, Event, Method};
use crate::logger::{self, AccessLogEntry};
use http_body_util::Full;
use hyper::body::{Body as _, Bytes};
use hyper::header::{REFERER, USER_AGENT};
use hyper::{Request, Response};
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

/// Main entry point for HTTP request handling
pub async fn handle_request<B>(
    req: Request<B>,
    state: Arc<AppState>,
    peer_addr: SocketAddr,
) -> Result<Response<Full<Bytes>>, Infallible>
where
    B: hyper::body::Body<Data = Bytes>,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let started = Instant::now();
    let (mut parts, body) = req.into_parts();

    let mut entry = AccessLogEntry::new(
        peer_addr.ip().to_string(),
        parts.method.to_string(),
        parts.uri.path().to_string(),
    );
    entry.query = parts.uri.query().map(ToString::to_string);
    entry.http_version = version_label(parts.version).to_string();
    entry.referer = header_string(&parts.headers, REFERER);
    entry.user_agent = header_string(&parts.headers, USER_AGENT);

    let response = match Method::try_from(&parts.method) {
        Err(()) => {
            logger::log_warning(&format!("Method not allowed: {}", parts.method));
            http::build_405_response(&Method::allow_header())
        }
        Ok(method) => {
            http::ensure_content_type(&mut parts.headers);
            let cfg = &state.config;
            let parser = http::parser_for(&parts.headers, &cfg.body);

            let parsed = match parser.limit(&cfg.body) {
                Some(limit) => match http::check_content_length(&parts.headers, limit) {
                    Ok(()) => http::read_body(body, parser, &cfg.body).await,
                    Err(e) => Err(e),
                },
                None => Ok(invoke::Body::Empty),
            };

            match parsed {
                Err(e) => {
                    logger::log_warning(&format!(
                        "Rejected {} {}: {e}",
                        parts.method,
                        parts.uri.path()
                    ));
                    http::build_body_error_response(&e)
                }
                Ok(body) => {
                    let event = Event::from_parts(&parts, method, body);
                    let report = invoke::invoke(&state.handler, event).await;
                    entry.outcome = Some(report.kind.as_str().to_string());
                    invoke::build_response(report, &cfg.http)
                }
            }
        }
    };

    if state.config.logging.access_log {
        entry.status = response.status().as_u16();
        entry.body_bytes = response
            .body()
            .size_hint()
            .exact()
            .and_then(|n| usize::try_from(n).ok())
            .unwrap_or_default();
        entry.request_time_us = u64::try_from(started.elapsed().as_micros()).unwrap_or(u64::MAX);
        logger::log_access(&entry, &state.config.logging.access_log_format);
    }

    Ok(response)
}

fn header_string(headers: &hyper::HeaderMap, name: hyper::header::HeaderName) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(ToString::to_string)
}

const fn version_label(version: hyper::Version) -> &'static str {
    match version {
        hyper::Version::HTTP_09 => "0.9",
        hyper::Version::HTTP_10 => "1.0",
        hyper::Version::HTTP_2 => "2",
        hyper::Version::HTTP_3 => "3",
        _ => "1.1",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ByteSize, Config};
    use crate::handler::{handler_fn, sync_fn, Handler};
    use crate::invoke::{Body, Context, Failure, Reply};
    use http_body_util::BodyExt;
    use hyper::header::CONTENT_TYPE;
    use hyper::StatusCode;
    use serde_json::json;

    fn state_with(handler: impl Handler, tweak: impl FnOnce(&mut Config)) -> Arc<AppState> {
        let mut config = Config::defaults().unwrap();
        config.logging.access_log = false;
        tweak(&mut config);
        Arc::new(AppState::new(config, handler))
    }

    fn peer() -> SocketAddr {
        "127.0.0.1:40000".parse().unwrap()
    }

    fn request(method: &str, uri: &str, content_type: Option<&str>, body: &'static [u8]) -> Request<Full<Bytes>> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(ct) = content_type {
            builder = builder.header(CONTENT_TYPE, ct);
        }
        builder.body(Full::new(Bytes::from_static(body))).unwrap()
    }

    async fn send(state: &Arc<AppState>, req: Request<Full<Bytes>>) -> (StatusCode, hyper::HeaderMap, Bytes) {
        let resp = handle_request(req, Arc::clone(state), peer()).await.unwrap();
        let (parts, body) = resp.into_parts();
        (parts.status, parts.headers, body.collect().await.unwrap().to_bytes())
    }

    /// Function that reports what it saw in the event
    fn inspector() -> impl Handler {
        handler_fn(|event: Event, _ctx: Context| async move {
            let body = match &event.body {
                Body::Json(v) => json!({"json": v}),
                Body::Text(t) => json!({"text": t}),
                Body::Form(p) => json!({"form": p, "nested": p.to_nested()}),
                Body::Raw(b) => json!({"raw": b.len()}),
                Body::Empty => json!("empty"),
            };
            Ok::<_, Failure>(json!({
                "method": event.method,
                "path": event.path,
                "content_type": event.header("content-type"),
                "body": body,
            }))
        })
    }

    #[tokio::test]
    async fn test_structured_value_is_json_200() {
        let state = state_with(inspector(), |_| {});
        let (status, headers, body) =
            send(&state, request("POST", "/any/path", Some("application/json"), br#"{"a":1}"#)).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(headers.get(CONTENT_TYPE).unwrap(), "application/json");
        let parsed: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(parsed["body"], json!({"json": {"a": 1}}));
        assert_eq!(parsed["path"], "/any/path");
    }

    #[tokio::test]
    async fn test_missing_content_type_parsed_as_json() {
        let state = state_with(inspector(), |_| {});
        let (status, _, body) = send(&state, request("POST", "/", None, br#"[1,2]"#)).await;

        assert_eq!(status, StatusCode::OK);
        let parsed: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(parsed["content_type"], "application/json");
        assert_eq!(parsed["body"], json!({"json": [1, 2]}));
    }

    #[tokio::test]
    async fn test_every_routed_method_reaches_function() {
        let state = state_with(inspector(), |_| {});
        for method in ["GET", "POST", "PUT", "PATCH", "DELETE", "OPTIONS"] {
            let (status, _, body) = send(&state, request(method, "/x", None, b"")).await;
            assert_eq!(status, StatusCode::OK, "method {method}");
            let parsed: serde_json::Value = serde_json::from_slice(&body).unwrap();
            assert_eq!(parsed["method"], method);
            assert_eq!(parsed["body"], "empty");
        }
    }

    #[tokio::test]
    async fn test_unrouted_method_is_405() {
        let state = state_with(inspector(), |_| {});
        let (status, headers, _) = send(&state, request("HEAD", "/", None, b"")).await;
        assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(
            headers.get("allow").unwrap(),
            "GET, POST, PUT, PATCH, DELETE, OPTIONS"
        );
    }

    #[tokio::test]
    async fn test_text_and_form_bodies() {
        let state = state_with(inspector(), |_| {});
        let (_, _, body) = send(&state, request("POST", "/", Some("text/plain"), b"hi there")).await;
        let parsed: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(parsed["body"], json!({"text": "hi there"}));

        let (_, _, body) = send(
            &state,
            request("POST", "/", Some("application/x-www-form-urlencoded"), b"a=1&a=2"),
        )
        .await;
        let parsed: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(parsed["body"]["form"], json!({"a": ["1", "2"]}));

        let (_, _, body) = send(
            &state,
            request(
                "POST",
                "/",
                Some("application/x-www-form-urlencoded"),
                b"user%5Bname%5D=ada&user%5Btags%5D%5B%5D=x&user%5Btags%5D%5B%5D=y",
            ),
        )
        .await;
        let parsed: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(
            parsed["body"]["nested"],
            json!({"user": {"name": "ada", "tags": ["x", "y"]}})
        );
    }

    #[tokio::test]
    async fn test_unparsed_content_type_gives_empty_body() {
        let state = state_with(inspector(), |_| {});
        let (status, _, body) = send(&state, request("POST", "/", Some("image/png"), b"\x89PNG")).await;
        assert_eq!(status, StatusCode::OK);
        let parsed: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(parsed["body"], "empty");
    }

    #[tokio::test]
    async fn test_raw_mode_passes_bytes() {
        let state = state_with(inspector(), |cfg| cfg.body.raw = true);
        let (_, _, body) = send(&state, request("POST", "/", Some("image/png"), b"\x89PNG")).await;
        let parsed: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(parsed["body"], json!({"raw": 4}));
    }

    #[tokio::test]
    async fn test_invalid_json_is_400() {
        let state = state_with(inspector(), |_| {});
        let (status, _, _) = send(&state, request("POST", "/", None, b"{broken")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_oversize_body_is_413() {
        let state = state_with(inspector(), |cfg| cfg.body.json_limit = ByteSize(8));
        let (status, _, _) = send(
            &state,
            request("POST", "/", None, br#"{"key":"a value well past eight bytes"}"#),
        )
        .await;
        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[tokio::test]
    async fn test_bare_string_sent_unquoted() {
        let state = state_with(sync_fn(|_event, _ctx| Ok::<_, Failure>("ok")), |_| {});
        let (status, _, body) = send(&state, request("GET", "/", None, b"")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, Bytes::from_static(b"ok"));
    }

    #[tokio::test]
    async fn test_fail_without_status_is_500_with_text() {
        let state = state_with(
            handler_fn(|_event, ctx: Context| async move {
                ctx.fail("something broke");
                Ok::<_, Failure>(Reply::Empty)
            }),
            |_| {},
        );
        let (status, _, body) = send(&state, request("GET", "/", None, b"")).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, Bytes::from_static(b"something broke"));
    }

    #[tokio::test]
    async fn test_status_404_survives_fail() {
        let state = state_with(
            handler_fn(|_event, ctx: Context| async move {
                ctx.set_status(StatusCode::NOT_FOUND).fail("no such thing");
                Ok::<_, Failure>(Reply::Empty)
            }),
            |_| {},
        );
        let (status, _, body) = send(&state, request("GET", "/", None, b"")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, Bytes::from_static(b"no such thing"));
    }

    #[tokio::test]
    async fn test_succeed_then_return_keeps_first() {
        let state = state_with(
            handler_fn(|_event, ctx: Context| async move {
                ctx.succeed(json!({"v": 1}));
                Ok::<_, Failure>(json!({"w": 2}))
            }),
            |_| {},
        );
        let (_, _, body) = send(&state, request("GET", "/", None, b"")).await;
        assert_eq!(body, Bytes::from_static(br#"{"v":1}"#));
    }

    #[tokio::test]
    async fn test_panicking_function_yields_500() {
        let state = state_with(
            sync_fn(|_event, _ctx| -> Result<Reply, Failure> { panic!("kaboom") }),
            |_| {},
        );
        let (status, _, body) = send(&state, request("GET", "/", None, b"")).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(String::from_utf8_lossy(&body).contains("kaboom"));
    }

    #[tokio::test]
    async fn test_context_headers_applied() {
        let state = state_with(
            handler_fn(|_event, ctx: Context| async move {
                let mut headers = hyper::HeaderMap::new();
                headers.insert("x-function", hyper::header::HeaderValue::from_static("yes"));
                headers.insert(CONTENT_TYPE, hyper::header::HeaderValue::from_static("text/plain"));
                ctx.set_headers(headers).set_status(StatusCode::ACCEPTED);
                Ok::<_, Failure>("queued")
            }),
            |_| {},
        );
        let (status, headers, body) = send(&state, request("POST", "/", None, b"")).await;
        assert_eq!(status, StatusCode::ACCEPTED);
        assert_eq!(headers.get("x-function").unwrap(), "yes");
        assert_eq!(headers.get(CONTENT_TYPE).unwrap(), "text/plain");
        assert_eq!(body, Bytes::from_static(b"queued"));
    }

    #[test]
    fn test_version_label() {
        assert_eq!(version_label(hyper::Version::HTTP_11), "1.1");
        assert_eq!(version_label(hyper::Version::HTTP_10), "1.0");
        assert_eq!(version_label(hyper::Version::HTTP_2), "2");
    }
}
