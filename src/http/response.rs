//! HTTP response building module
//!
//! Builders for the responses produced at the boundary, before any function
//! runs.

use http_body_util::Full;
use hyper::body::Bytes;
use hyper::Response;

use crate::error::BodyError;

/// Build 405 Method Not Allowed response
pub fn build_405_response(allow: &str) -> Response<Full<Bytes>> {
    Response::builder()
        .status(405)
        .header("Content-Type", "text/plain")
        .header("Allow", allow)
        .body(Full::new(Bytes::from("405 Method Not Allowed")))
        .unwrap_or_else(|e| {
            log_build_error("405", &e);
            Response::new(Full::new(Bytes::from("405 Method Not Allowed")))
        })
}

/// Build 413 Payload Too Large response
pub fn build_413_response() -> Response<Full<Bytes>> {
    Response::builder()
        .status(413)
        .header("Content-Type", "text/plain")
        .body(Full::new(Bytes::from("413 Payload Too Large")))
        .unwrap_or_else(|e| {
            log_build_error("413", &e);
            Response::new(Full::new(Bytes::from("413 Payload Too Large")))
        })
}

/// Build 400 Bad Request response with a reason
pub fn build_400_response(reason: &str) -> Response<Full<Bytes>> {
    Response::builder()
        .status(400)
        .header("Content-Type", "text/plain")
        .body(Full::new(Bytes::from(format!("400 Bad Request: {reason}"))))
        .unwrap_or_else(|e| {
            log_build_error("400", &e);
            Response::new(Full::new(Bytes::from("400 Bad Request")))
        })
}

/// Map a body parsing error to its boundary response
pub fn build_body_error_response(err: &BodyError) -> Response<Full<Bytes>> {
    match err {
        BodyError::TooLarge { .. } => build_413_response(),
        other => build_400_response(&other.to_string()),
    }
}

/// Log response build error
fn log_build_error(status: &str, error: &hyper::http::Error) {
    crate::logger::log_error(&format!("Failed to build {status} response: {error}"));
}

#[cfg(test)]
mod tests {
    use super::*;
    use hyper::StatusCode;

    #[test]
    fn test_405_lists_allowed_methods() {
        let resp = build_405_response("GET, POST");
        assert_eq!(resp.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(resp.headers().get("allow").unwrap(), "GET, POST");
    }

    #[test]
    fn test_body_error_responses() {
        let resp = build_body_error_response(&BodyError::TooLarge { limit: 1 });
        assert_eq!(resp.status(), StatusCode::PAYLOAD_TOO_LARGE);

        let resp = build_body_error_response(&BodyError::InvalidText);
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(resp.headers().get("content-type").unwrap(), "text/plain");
    }
}
