//! Request parsing.
//!
//! # Responsibilities
//! - Decide when enough bytes have arrived to form a request ([`frame`])
//! - Turn a complete byte buffer into a [`Request`] ([`parse`])
//!
//! # Design Decisions
//! - Framing is length-aware: the head ends at the first blank line and the
//!   body is exactly `Content-Length` bytes; the connection keeps reading
//!   until both are present or the size cap is hit
//! - Without `Content-Length` the body is every byte received alongside the
//!   head, in both [`frame`] and [`parse`]
//! - Parsing itself is pure and synchronous
//! - Malformed query pairs and header lines are dropped, not fatal

use std::collections::HashMap;

use thiserror::Error;

use crate::http::request::{Method, Request};

const LINE_END: &str = "\r\n";
const HEAD_END: &[u8] = b"\r\n\r\n";

/// Reasons a request could not be parsed. All map to 400.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("Request is not valid UTF-8")]
    InvalidEncoding,
    #[error("Malformed request line")]
    InvalidRequestLine,
    #[error("Unsupported method: {0}")]
    UnsupportedMethod(String),
    #[error("Invalid Content-Length header")]
    InvalidContentLength,
    #[error("Request body truncated: expected {expected} bytes, received {received}")]
    TruncatedBody { expected: usize, received: usize },
    #[error("Request exceeds {limit} bytes")]
    TooLarge { limit: usize },
    #[error("Empty request")]
    Empty,
}

/// Result of inspecting a partially received buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Frame {
    /// Need more bytes.
    Incomplete,
    /// The first `n` bytes form a complete request.
    Complete(usize),
}

/// Check whether `buf` holds a complete request, given the size cap.
pub fn frame(buf: &[u8], limit: usize) -> Result<Frame, ParseError> {
    let head_len = match find_head_end(buf) {
        Some(pos) => pos + HEAD_END.len(),
        None if buf.len() >= limit => return Err(ParseError::TooLarge { limit }),
        None => return Ok(Frame::Incomplete),
    };

    let head = std::str::from_utf8(&buf[..head_len]).map_err(|_| ParseError::InvalidEncoding)?;
    let total = match content_length(head.split(LINE_END).skip(1))? {
        Some(body_len) => head_len
            .checked_add(body_len)
            .filter(|total| *total <= limit)
            .ok_or(ParseError::TooLarge { limit })?,
        // Without a declared length the body is whatever already arrived.
        None if buf.len() > limit => return Err(ParseError::TooLarge { limit }),
        None => buf.len(),
    };

    if buf.len() >= total {
        Ok(Frame::Complete(total))
    } else {
        Ok(Frame::Incomplete)
    }
}

/// Parse a complete request buffer.
pub fn parse(bytes: &[u8]) -> Result<Request, ParseError> {
    if bytes.is_empty() {
        return Err(ParseError::Empty);
    }
    let text = std::str::from_utf8(bytes).map_err(|_| ParseError::InvalidEncoding)?;

    let (head, body) = match text.split_once("\r\n\r\n") {
        Some((head, body)) => (head, Some(body)),
        None => (text.trim_end_matches(LINE_END), None),
    };

    let mut lines = head.split(LINE_END);
    let (method, target) = parse_request_line(lines.next().unwrap_or_default())?;
    let (path, query) = split_target(target);

    let mut request = Request::new(method, path);
    for (name, value) in parse_query(query) {
        request = request.with_query(name, value);
    }

    let header_lines: Vec<&str> = lines.collect();
    for line in &header_lines {
        if let Some((name, value)) = line.split_once(": ") {
            request = request.with_header(name, value);
        }
    }

    let declared = content_length(header_lines.iter().copied())?;
    if let Some(body) = body {
        let body = match declared {
            Some(expected) if body.len() < expected => {
                return Err(ParseError::TruncatedBody {
                    expected,
                    received: body.len(),
                });
            }
            Some(expected) => body.get(..expected).ok_or(ParseError::InvalidContentLength)?,
            None => body,
        };
        request = request.with_body(body);
    } else if let Some(expected) = declared.filter(|n| *n > 0) {
        return Err(ParseError::TruncatedBody {
            expected,
            received: 0,
        });
    }

    Ok(request)
}

fn find_head_end(buf: &[u8]) -> Option<usize> {
    buf.windows(HEAD_END.len()).position(|w| w == HEAD_END)
}

fn content_length<'a>(lines: impl Iterator<Item = &'a str>) -> Result<Option<usize>, ParseError> {
    let mut found = None;
    for line in lines {
        if let Some((name, value)) = line.split_once(':') {
            if name.trim().eq_ignore_ascii_case("content-length") {
                let n = value
                    .trim()
                    .parse::<usize>()
                    .map_err(|_| ParseError::InvalidContentLength)?;
                found = Some(n);
            }
        }
    }
    Ok(found)
}

/// `METHOD SP PATH-AND-QUERY [SP VERSION]`
fn parse_request_line(line: &str) -> Result<(Method, &str), ParseError> {
    let parts: Vec<&str> = line.split(' ').collect();
    let (method, target) = match parts.as_slice() {
        [method, target] => (*method, *target),
        [method, target, version] if version.starts_with("HTTP/") => (*method, *target),
        _ => return Err(ParseError::InvalidRequestLine),
    };

    if !target.starts_with('/') {
        return Err(ParseError::InvalidRequestLine);
    }
    let method = method
        .parse::<Method>()
        .map_err(ParseError::UnsupportedMethod)?;
    Ok((method, target))
}

fn split_target(target: &str) -> (&str, &str) {
    target.split_once('?').unwrap_or((target, ""))
}

/// Split on `&`, then each pair on its first `=`. Pairs without `=` are dropped;
/// later duplicates win.
fn parse_query(query: &str) -> HashMap<String, String> {
    query
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .map(|(k, v)| (percent_decode(k), percent_decode(v)))
        .collect()
}

/// Percent-decode, keeping the input unchanged if it does not decode to UTF-8.
pub fn percent_decode(s: &str) -> String {
    urlencoding::decode(s)
        .map(|c| c.into_owned())
        .unwrap_or_else(|_| s.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_get_with_query_and_headers() {
        let raw = b"GET /api/papers?q=black%20holes&limit=5 HTTP/1.1\r\nHost: localhost\r\nX-Trace: a: b\r\n\r\n";
        let req = parse(raw).unwrap();
        assert_eq!(req.method(), Method::Get);
        assert_eq!(req.path(), "/api/papers");
        assert_eq!(req.query("q"), Some("black holes"));
        assert_eq!(req.query("limit"), Some("5"));
        assert_eq!(req.header("host"), Some("localhost"));
        assert_eq!(req.header("x-trace"), Some("a: b"));
        assert_eq!(req.body(), None);
    }

    #[test]
    fn request_line_without_version_is_accepted() {
        let req = parse(b"DELETE /api/collections/x\r\n\r\n").unwrap();
        assert_eq!(req.method(), Method::Delete);
        assert_eq!(req.path(), "/api/collections/x");
    }

    #[test]
    fn malformed_request_lines_fail() {
        for raw in [
            &b"GET\r\n\r\n"[..],
            b"GET  /double-space HTTP/1.1\r\n\r\n",
            b"GET relative HTTP/1.1\r\n\r\n",
            b"GET / HTTP/1.1 extra\r\n\r\n",
            b"GET / FTP/1.0\r\n\r\n",
            b"\r\n\r\n",
        ] {
            assert_eq!(parse(raw), Err(ParseError::InvalidRequestLine), "{:?}", raw);
        }
        assert_eq!(parse(b""), Err(ParseError::Empty));
        assert_eq!(parse(&[0xff, 0xfe, 0x20]), Err(ParseError::InvalidEncoding));
    }

    #[test]
    fn unknown_method_fails() {
        assert_eq!(
            parse(b"PATCH /api/papers HTTP/1.1\r\n\r\n"),
            Err(ParseError::UnsupportedMethod("PATCH".into()))
        );
    }

    #[test]
    fn query_pairs_without_equals_are_dropped_and_last_wins() {
        let req = parse(b"GET /x?flag&a=1&a=2&b=%3D%26 HTTP/1.1\r\n\r\n").unwrap();
        assert_eq!(req.query("flag"), None);
        assert_eq!(req.query("a"), Some("2"));
        assert_eq!(req.query("b"), Some("=&"));
        assert_eq!(req.query_params().len(), 2);
    }

    #[test]
    fn duplicate_headers_last_wins_and_bad_lines_dropped() {
        let req = parse(b"GET / HTTP/1.1\r\nX-A: 1\r\nnonsense\r\nx-a: 2\r\n\r\n").unwrap();
        assert_eq!(req.header("x-a"), Some("2"));
        assert_eq!(req.headers().len(), 1);
    }

    #[test]
    fn body_keeps_line_terminators() {
        let body = "line one\r\n\r\nline two";
        let raw = format!(
            "POST /api/papers HTTP/1.1\r\nContent-Length: {}\r\n\r\n{}",
            body.len(),
            body
        );
        let req = parse(raw.as_bytes()).unwrap();
        assert_eq!(req.body(), Some(body));
    }

    #[test]
    fn body_without_content_length_is_taken_whole() {
        let req = parse(b"PUT /x HTTP/1.1\r\n\r\n{\"a\":1}").unwrap();
        assert_eq!(req.body(), Some("{\"a\":1}"));
    }

    #[test]
    fn truncated_body_fails() {
        let raw = b"POST /x HTTP/1.1\r\nContent-Length: 10\r\n\r\nabc";
        assert_eq!(
            parse(raw),
            Err(ParseError::TruncatedBody {
                expected: 10,
                received: 3
            })
        );
    }

    #[test]
    fn invalid_content_length_fails() {
        let raw = b"POST /x HTTP/1.1\r\nContent-Length: ten\r\n\r\nabc";
        assert_eq!(parse(raw), Err(ParseError::InvalidContentLength));
    }

    #[test]
    fn frame_waits_for_head_and_body() {
        let limit = 1024;
        assert_eq!(frame(b"GET / HTTP/1.1\r\nHost: x\r\n", limit), Ok(Frame::Incomplete));

        let head = b"POST /x HTTP/1.1\r\nContent-Length: 4\r\n\r\n";
        assert_eq!(frame(head, limit), Ok(Frame::Incomplete));

        let mut full = head.to_vec();
        full.extend_from_slice(b"abcd");
        assert_eq!(frame(&full, limit), Ok(Frame::Complete(full.len())));

        full.extend_from_slice(b"trailing");
        assert_eq!(frame(&full, limit), Ok(Frame::Complete(full.len() - 8)));
    }

    #[test]
    fn frame_enforces_limit() {
        let head = b"POST /x HTTP/1.1\r\nContent-Length: 5000\r\n\r\n";
        assert_eq!(frame(head, 1024), Err(ParseError::TooLarge { limit: 1024 }));

        let no_terminator = vec![b'a'; 64];
        assert_eq!(frame(&no_terminator, 64), Err(ParseError::TooLarge { limit: 64 }));
    }

    #[test]
    fn huge_content_length_is_too_large() {
        let raw = b"POST /x HTTP/1.1\r\nContent-Length: 18446744073709551615\r\n\r\n";
        assert_eq!(frame(raw, 65536), Err(ParseError::TooLarge { limit: 65536 }));

        let raw = format!("POST /x HTTP/1.1\r\nContent-Length: {}\r\n\r\nabc", usize::MAX);
        assert_eq!(
            parse(raw.as_bytes()),
            Err(ParseError::TruncatedBody {
                expected: usize::MAX,
                received: 3
            })
        );
    }

    #[test]
    fn frame_without_content_length_keeps_buffered_body() {
        let raw = b"POST /api/collections HTTP/1.1\r\nHost: x\r\n\r\n{\"name\":\"Reading\"}";
        assert_eq!(frame(raw, 1024), Ok(Frame::Complete(raw.len())));
        assert_eq!(parse(raw).unwrap().body(), Some("{\"name\":\"Reading\"}"));

        let head_only = b"GET / HTTP/1.1\r\n\r\n";
        assert_eq!(frame(head_only, 1024), Ok(Frame::Complete(head_only.len())));
        assert_eq!(frame(raw, 40), Err(ParseError::TooLarge { limit: 40 }));
    }
}
