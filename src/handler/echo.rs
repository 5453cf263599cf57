//! Default function shipped with the binary
//!
//! Echoes the request back as JSON. Deployments replace it with their own
//! handler when building `AppState`.

use hyper::header::{HeaderValue, CONTENT_TYPE};
use hyper::{HeaderMap, StatusCode};
use serde_json::{json, Value};

use crate::invoke::{Body, Context, Event, Failure, Reply};

/// Echo the event back to the caller
pub async fn echo(event: Event, ctx: Context) -> Result<Reply, Failure> {
    let body = match &event.body {
        Body::Json(value) => value.clone(),
        Body::Text(text) => Value::String(text.clone()),
        Body::Form(params) => params.to_nested(),
        Body::Raw(bytes) => json!({ "bytes": bytes.len() }),
        Body::Empty => Value::Null,
    };

    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    ctx.set_status(StatusCode::OK).set_headers(headers);

    ctx.succeed(json!({
        "method": event.method,
        "path": event.path,
        "query": event.query,
        "content-type": event.header("content-type"),
        "body": body,
    }));
    Ok(Reply::Empty)
}
