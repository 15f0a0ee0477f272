//! Response value type and wire serialization.
//!
//! # Responsibilities
//! - Represent a status, caller headers and body
//! - Serialize to HTTP/1.1 bytes with the mandatory headers injected
//! - Read serialized responses back (used by tests and the CLI client)
//!
//! # Design Decisions
//! - `Content-Length`, `Connection: close` and the CORS headers are injected at
//!   build time and override any caller header with the same name
//! - JSON bodies go through `serde_json::Value`, whose objects are sorted maps,
//!   so identical content always serializes to identical bytes
//! - Caller headers are emitted in sorted order for the same reason

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::{json, Value};

pub const CORS_ALLOW_ORIGIN: (&str, &str) = ("Access-Control-Allow-Origin", "*");
pub const CORS_ALLOW_METHODS: (&str, &str) = (
    "Access-Control-Allow-Methods",
    "GET, POST, PUT, DELETE, OPTIONS",
);
pub const CORS_ALLOW_HEADERS: (&str, &str) =
    ("Access-Control-Allow-Headers", "Content-Type, Authorization");

/// Status codes the server emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusCode {
    Ok,
    Created,
    NoContent,
    BadRequest,
    Forbidden,
    NotFound,
    TooManyRequests,
    InternalServerError,
}

impl StatusCode {
    pub fn as_u16(&self) -> u16 {
        match self {
            StatusCode::Ok => 200,
            StatusCode::Created => 201,
            StatusCode::NoContent => 204,
            StatusCode::BadRequest => 400,
            StatusCode::Forbidden => 403,
            StatusCode::NotFound => 404,
            StatusCode::TooManyRequests => 429,
            StatusCode::InternalServerError => 500,
        }
    }

    pub fn reason(&self) -> &'static str {
        match self {
            StatusCode::Ok => "OK",
            StatusCode::Created => "Created",
            StatusCode::NoContent => "No Content",
            StatusCode::BadRequest => "Bad Request",
            StatusCode::Forbidden => "Forbidden",
            StatusCode::NotFound => "Not Found",
            StatusCode::TooManyRequests => "Too Many Requests",
            StatusCode::InternalServerError => "Internal Server Error",
        }
    }

    pub fn is_success(&self) -> bool {
        self.as_u16() < 300
    }
}

impl std::fmt::Display for StatusCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.as_u16(), self.reason())
    }
}

/// An HTTP response ready to be written to a connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    status: StatusCode,
    headers: BTreeMap<String, String>,
    body: Vec<u8>,
}

impl Response {
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            headers: BTreeMap::new(),
            body: Vec::new(),
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    /// JSON response. Serialization failures become a 500 carrying the
    /// serializer's message.
    pub fn json<T: Serialize + ?Sized>(status: StatusCode, payload: &T) -> Self {
        let encoded = serde_json::to_value(payload).and_then(|v| serde_json::to_vec(&v));
        match encoded {
            Ok(body) => Self::new(status)
                .with_header("Content-Type", "application/json")
                .with_body(body),
            Err(e) => {
                tracing::error!(error = %e, "Failed to serialize response body");
                Self::error(StatusCode::InternalServerError, &e.to_string())
            }
        }
    }

    /// `{"status":"ok", ...fields}`. `fields` must serialize to an object;
    /// anything else is nested under `"data"`.
    pub fn ok<T: Serialize + ?Sized>(status: StatusCode, fields: &T) -> Self {
        match serde_json::to_value(fields) {
            Ok(Value::Object(mut map)) => {
                map.insert("status".into(), Value::String("ok".into()));
                Self::json(status, &Value::Object(map))
            }
            Ok(Value::Null) => Self::json(status, &json!({ "status": "ok" })),
            Ok(other) => Self::json(status, &json!({ "status": "ok", "data": other })),
            Err(e) => {
                tracing::error!(error = %e, "Failed to serialize response body");
                Self::error(StatusCode::InternalServerError, &e.to_string())
            }
        }
    }

    /// `{"status":"error","error":message}`
    pub fn error(status: StatusCode, message: &str) -> Self {
        let body = json!({ "status": "error", "error": message }).to_string();
        Self::new(status)
            .with_header("Content-Type", "application/json")
            .with_body(body)
    }

    /// CORS preflight answer: 204, no body.
    pub fn preflight() -> Self {
        Self::new(StatusCode::NoContent)
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn headers(&self) -> &BTreeMap<String, String> {
        &self.headers
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Serialize to wire bytes.
    pub fn to_bytes(&self) -> Vec<u8> {
        build(self.status, &self.headers, &self.body)
    }
}

/// Names of the headers [`build`] always writes.
pub fn injected_header_names() -> [&'static str; 5] {
    [
        "Content-Length",
        "Connection",
        CORS_ALLOW_ORIGIN.0,
        CORS_ALLOW_METHODS.0,
        CORS_ALLOW_HEADERS.0,
    ]
}

/// Serialize a status, headers and body into HTTP/1.1 bytes.
pub fn build(status: StatusCode, headers: &BTreeMap<String, String>, body: &[u8]) -> Vec<u8> {
    let injected = injected_header_names();
    let content_length = body.len().to_string();

    let mut head = format!("HTTP/1.1 {} {}\r\n", status.as_u16(), status.reason());
    for (name, value) in headers {
        if injected.iter().any(|i| i.eq_ignore_ascii_case(name)) {
            continue;
        }
        head.push_str(&format!("{}: {}\r\n", name, value));
    }
    for (name, value) in [
        ("Content-Length", content_length.as_str()),
        ("Connection", "close"),
        CORS_ALLOW_ORIGIN,
        CORS_ALLOW_METHODS,
        CORS_ALLOW_HEADERS,
    ] {
        head.push_str(&format!("{}: {}\r\n", name, value));
    }
    head.push_str("\r\n");

    let mut out = head.into_bytes();
    out.extend_from_slice(body);
    out
}

/// A response read back from wire bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedResponse {
    pub status: u16,
    pub reason: String,
    /// Lower-cased names.
    pub headers: BTreeMap<String, String>,
    pub body: Vec<u8>,
}

impl ParsedResponse {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    pub fn json(&self) -> Result<Value, serde_json::Error> {
        serde_json::from_slice(&self.body)
    }
}

/// Counterpart of [`build`]: read a serialized response.
///
/// The body is cut to `Content-Length` when the header is present.
pub fn parse_response(bytes: &[u8]) -> Option<ParsedResponse> {
    let split = bytes.windows(4).position(|w| w == b"\r\n\r\n")?;
    let head = std::str::from_utf8(&bytes[..split]).ok()?;
    let mut body = bytes[split + 4..].to_vec();

    let mut lines = head.split("\r\n");
    let status_line = lines.next()?;
    let mut parts = status_line.splitn(3, ' ');
    if !parts.next()?.starts_with("HTTP/") {
        return None;
    }
    let status: u16 = parts.next()?.parse().ok()?;
    let reason = parts.next().unwrap_or_default().to_string();

    let headers: BTreeMap<String, String> = lines
        .filter_map(|line| line.split_once(": "))
        .map(|(k, v)| (k.to_ascii_lowercase(), v.to_string()))
        .collect();

    if let Some(len) = headers.get("content-length").and_then(|v| v.parse::<usize>().ok()) {
        body.truncate(len);
    }

    Some(ParsedResponse {
        status,
        reason,
        headers,
        body,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parsed(resp: &Response) -> ParsedResponse {
        parse_response(&resp.to_bytes()).unwrap()
    }

    #[test]
    fn injects_mandatory_headers() {
        let resp = parsed(&Response::new(StatusCode::Ok).with_body("hello"));
        assert_eq!(resp.status, 200);
        assert_eq!(resp.reason, "OK");
        assert_eq!(resp.header("content-length"), Some("5"));
        assert_eq!(resp.header("connection"), Some("close"));
        assert_eq!(resp.header("access-control-allow-origin"), Some("*"));
        assert_eq!(
            resp.header("access-control-allow-methods"),
            Some("GET, POST, PUT, DELETE, OPTIONS")
        );
        assert!(resp.header("access-control-allow-headers").is_some());
    }

    #[test]
    fn injected_headers_override_caller_headers() {
        let resp = Response::new(StatusCode::Ok)
            .with_header("content-length", "999")
            .with_header("Connection", "keep-alive")
            .with_header("Access-Control-Allow-Origin", "https://evil.example")
            .with_body("abc");
        let raw = String::from_utf8(resp.to_bytes()).unwrap();

        assert_eq!(raw.matches("Content-Length").count() + raw.matches("content-length").count(), 1);
        assert!(raw.contains("Content-Length: 3\r\n"));
        assert!(!raw.contains("keep-alive"));
        assert!(!raw.contains("evil.example"));
    }

    #[test]
    fn round_trip_preserves_status_headers_and_body() {
        let resp = Response::new(StatusCode::Created)
            .with_header("Content-Type", "application/json")
            .with_header("X-Request-Id", "abc-123")
            .with_body(r#"{"a":1}"#);
        let back = parsed(&resp);

        assert_eq!(back.status, 201);
        assert_eq!(back.header("content-type"), Some("application/json"));
        assert_eq!(back.header("x-request-id"), Some("abc-123"));
        assert_eq!(back.body, resp.body());
    }

    #[test]
    fn json_keys_are_sorted() {
        #[derive(Serialize)]
        struct Unsorted {
            zeta: u8,
            alpha: u8,
        }
        let a = Response::ok(StatusCode::Ok, &Unsorted { zeta: 1, alpha: 2 });
        let b = Response::ok(StatusCode::Ok, &json!({ "alpha": 2, "zeta": 1 }));
        assert_eq!(a.to_bytes(), b.to_bytes());
        assert_eq!(a.body(), br#"{"alpha":2,"status":"ok","zeta":1}"#);
    }

    #[test]
    fn error_body_shape() {
        let resp = Response::error(StatusCode::Forbidden, "Automation API is disabled");
        assert_eq!(
            resp.body(),
            br#"{"error":"Automation API is disabled","status":"error"}"#
        );
        let back = parsed(&resp);
        assert_eq!(back.status, 403);
        assert_eq!(back.header("content-length"), Some(resp.body().len().to_string().as_str()));
    }

    #[test]
    fn preflight_has_no_body_but_cors_headers() {
        let back = parsed(&Response::preflight());
        assert_eq!(back.status, 204);
        assert!(back.body.is_empty());
        assert_eq!(back.header("content-length"), Some("0"));
        assert_eq!(back.header("access-control-allow-origin"), Some("*"));
    }

    #[test]
    fn unserializable_payload_is_internal_error() {
        use std::collections::HashMap;
        // Non-string map keys cannot become JSON object keys.
        let mut bad: HashMap<(u8, u8), u8> = HashMap::new();
        bad.insert((1, 2), 3);
        let resp = Response::json(StatusCode::Ok, &bad);
        assert_eq!(resp.status(), StatusCode::InternalServerError);
        assert_eq!(parsed(&resp).json().unwrap()["status"], "error");
    }

    #[test]
    fn parse_response_rejects_garbage() {
        assert!(parse_response(b"not a response").is_none());
        assert!(parse_response(b"SMTP 200 OK\r\n\r\n").is_none());
    }
}
