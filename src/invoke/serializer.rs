//! Turns the first report of an invocation into the HTTP response.

use http_body_util::Full;
use hyper::body::Bytes;
use hyper::header::{HeaderValue, CONTENT_LENGTH, CONTENT_TYPE, SERVER};
use hyper::{Response, StatusCode};

use super::context::Report;
use super::reply::Reply;
use crate::config::HttpConfig;
use crate::logger;

const JSON_CONTENT_TYPE: &str = "application/json";
const BINARY_CONTENT_TYPE: &str = "application/octet-stream";

/// Build the response for a report
///
/// Status and headers come from the context snapshot in the report. A
/// content type is only added when the function did not set one.
pub fn build_response(report: Report, http: &HttpConfig) -> Response<Full<Bytes>> {
    let Report {
        outcome,
        status,
        mut headers,
        ..
    } = report;

    let (body, content_type) = match outcome {
        Err(failure) => (
            Bytes::from(failure.message().to_string()),
            Some(http.default_content_type.as_str()),
        ),
        Ok(reply) => {
            let content_type = content_type_for(&reply, http);
            match reply.into_bytes() {
                Ok(body) => (body, content_type),
                Err(e) => {
                    logger::log_error(&format!("Failed to encode function result: {e}"));
                    return encode_failure_response(http);
                }
            }
        }
    };

    if let Some(ct) = content_type {
        if !headers.contains_key(CONTENT_TYPE) {
            if let Ok(value) = HeaderValue::from_str(ct) {
                headers.insert(CONTENT_TYPE, value);
            }
        }
    }
    if !headers.contains_key(SERVER) {
        if let Ok(value) = HeaderValue::from_str(&http.server_name) {
            headers.insert(SERVER, value);
        }
    }
    if allows_body(status) {
        headers.insert(CONTENT_LENGTH, HeaderValue::from(body.len()));
    } else {
        headers.remove(CONTENT_LENGTH);
    }

    let mut response = Response::new(Full::new(body));
    *response.status_mut() = status;
    *response.headers_mut() = headers;
    response
}

fn content_type_for<'a>(reply: &Reply, http: &'a HttpConfig) -> Option<&'a str> {
    match reply {
        Reply::Sequence(_) | Reply::Structured(_) => Some(JSON_CONTENT_TYPE),
        Reply::Text(_) => Some(http.default_content_type.as_str()),
        Reply::Binary(_) => Some(BINARY_CONTENT_TYPE),
        Reply::Empty => None,
    }
}

fn allows_body(status: StatusCode) -> bool {
    !(status.is_informational()
        || status == StatusCode::NO_CONTENT
        || status == StatusCode::NOT_MODIFIED)
}

fn encode_failure_response(http: &HttpConfig) -> Response<Full<Bytes>> {
    Response::builder()
        .status(StatusCode::INTERNAL_SERVER_ERROR)
        .header(CONTENT_TYPE, http.default_content_type.as_str())
        .body(Full::new(Bytes::from("Failed to encode function result")))
        .unwrap_or_else(|_| Response::new(Full::new(Bytes::from("Error"))))
}
