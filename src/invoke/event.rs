//! Function event: the immutable view of one inbound request.

use std::collections::HashMap;
use std::fmt;

use hyper::body::Bytes;
use hyper::http::request::Parts;
use hyper::HeaderMap;
use serde::Serialize;
use serde_json::{Map, Value};

/// Methods routed to the function
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    Get,
    Post,
    Put,
    Patch,
    Delete,
    Options,
}

impl Method {
    pub const ALL: [Self; 6] = [
        Self::Get,
        Self::Post,
        Self::Put,
        Self::Patch,
        Self::Delete,
        Self::Options,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
            Self::Options => "OPTIONS",
        }
    }

    /// Value for the `Allow` header of a 405 response
    pub fn allow_header() -> String {
        Self::ALL.map(Self::as_str).join(", ")
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&hyper::Method> for Method {
    type Error = ();

    fn try_from(method: &hyper::Method) -> Result<Self, Self::Error> {
        match *method {
            hyper::Method::GET => Ok(Self::Get),
            hyper::Method::POST => Ok(Self::Post),
            hyper::Method::PUT => Ok(Self::Put),
            hyper::Method::PATCH => Ok(Self::Patch),
            hyper::Method::DELETE => Ok(Self::Delete),
            hyper::Method::OPTIONS => Ok(Self::Options),
            _ => Err(()),
        }
    }
}

/// Name to values mapping used for query strings and form bodies
///
/// Repeated names keep every value in arrival order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Params(HashMap<String, Vec<String>>);

impl Params {
    /// Parse `application/x-www-form-urlencoded` text
    pub fn parse(input: &str) -> Self {
        Self::from_bytes(input.as_bytes())
    }

    /// Parse URL-encoded bytes; invalid UTF-8 is replaced, not rejected
    pub fn from_bytes(input: &[u8]) -> Self {
        Self::from_pairs(url::form_urlencoded::parse(input).into_owned())
    }

    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut map: HashMap<String, Vec<String>> = HashMap::new();
        for (k, v) in pairs {
            map.entry(k.into()).or_default().push(v.into());
        }
        Self(map)
    }

    /// First value for `name`
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).and_then(|v| v.first()).map(String::as_str)
    }

    /// Every value for `name`
    pub fn get_all(&self, name: &str) -> &[String] {
        self.0.get(name).map_or(&[][..], Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Vec<String>)> {
        self.0.iter()
    }

    /// Expand bracketed names into nested JSON
    ///
    /// `user[name]=ada` becomes `{"user": {"name": "ada"}}` and `tag[]=a`
    /// collects into an array. A name seen once maps to a string, a repeated
    /// name to an array. Numeric segments are kept as object keys. Names are
    /// merged in sorted order; a nested name replaces a plain value with the
    /// same root.
    pub fn to_nested(&self) -> Value {
        let mut names: Vec<&String> = self.0.keys().collect();
        names.sort();

        let mut root = Map::new();
        for name in names {
            let (head, path) = split_name(name);
            insert_nested(&mut root, head, &path, &self.0[name]);
        }
        Value::Object(root)
    }
}

/// Split `a[b][c]` into `a` and `[b, c]`; malformed names stay flat
fn split_name(name: &str) -> (&str, Vec<&str>) {
    let open = match name.find('[') {
        Some(0) | None => return (name, Vec::new()),
        Some(open) => open,
    };

    let mut segments = Vec::new();
    let mut rest = &name[open..];
    while let Some(inner) = rest.strip_prefix('[') {
        let Some(close) = inner.find(']') else {
            return (name, Vec::new());
        };
        segments.push(&inner[..close]);
        rest = &inner[close + 1..];
    }
    if !rest.is_empty() {
        return (name, Vec::new());
    }
    (&name[..open], segments)
}

fn insert_nested(map: &mut Map<String, Value>, key: &str, path: &[&str], values: &[String]) {
    match path.split_first() {
        None => {
            let leaf = match values {
                [single] => Value::String(single.clone()),
                many => many.iter().cloned().map(Value::String).collect(),
            };
            map.insert(key.to_string(), leaf);
        }
        Some((segment, [])) if segment.is_empty() => {
            let items = values.iter().cloned().map(Value::String).collect();
            map.insert(key.to_string(), Value::Array(items));
        }
        Some((segment, rest)) => {
            let slot = map
                .entry(key.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            if !slot.is_object() {
                *slot = Value::Object(Map::new());
            }
            if let Value::Object(child) = slot {
                insert_nested(child, segment, rest, values);
            }
        }
    }
}

/// Request payload as negotiated by the body parser
#[derive(Debug, Clone, PartialEq)]
pub enum Body {
    /// Parsed JSON document
    Json(Value),
    /// `text/*` payload
    Text(String),
    /// URL-encoded form fields
    Form(Params),
    /// Untouched bytes (raw mode)
    Raw(Bytes),
    /// No body, or a content type the structured parser skips
    Empty,
}

impl Body {
    pub const fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }

    pub const fn as_json(&self) -> Option<&Value> {
        match self {
            Self::Json(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }
}

/// Snapshot of one request handed to the function
#[derive(Debug, Clone)]
pub struct Event {
    pub body: Body,
    pub headers: HeaderMap,
    pub method: Method,
    pub query: Params,
    pub path: String,
}

impl Event {
    /// Project request parts and an already parsed body into an event
    pub fn from_parts(parts: &Parts, method: Method, body: Body) -> Self {
        Self {
            body,
            headers: parts.headers.clone(),
            method,
            query: parts.uri.query().map(Params::parse).unwrap_or_default(),
            path: parts.uri.path().to_string(),
        }
    }

    /// Header value as a string, if present and visible ASCII
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}
