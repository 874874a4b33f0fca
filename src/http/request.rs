//! The request captured by the one-shot server.

use bytes::Bytes;
use hyper::header::HOST;
use hyper::http::request::Parts;
use std::borrow::Cow;

/// Same cap hyper applies to a request head.
const MAX_HEADERS: usize = 100;

/// A raw HTTP request, captured verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedRequest {
    /// HTTP method, e.g. `POST`.
    pub method: String,
    /// Request-target as received, query string included.
    pub target: String,
    /// Protocol version, e.g. `HTTP/1.1`.
    pub version: String,
    /// Headers as `(name, value)` pairs.
    pub headers: Vec<(String, String)>,
    /// Raw body bytes.
    pub body: Bytes,
}

impl CapturedRequest {
    /// Build a capture from the raw bytes of a request head.
    ///
    /// Headers keep their wire order and spelling. Returns `None` if the head
    /// is not a complete HTTP/1.x request head.
    pub fn from_raw_head(raw: &[u8], body: Bytes) -> Option<Self> {
        let mut slots = [httparse::EMPTY_HEADER; MAX_HEADERS];
        let mut req = httparse::Request::new(&mut slots);
        match req.parse(raw) {
            Ok(httparse::Status::Complete(_)) => {}
            _ => return None,
        }

        let headers = req
            .headers
            .iter()
            .map(|h| (h.name.to_string(), String::from_utf8_lossy(h.value).into_owned()))
            .collect();

        Some(Self {
            method: req.method?.to_string(),
            target: req.path?.to_string(),
            version: format!("HTTP/1.{}", req.version?),
            headers,
            body,
        })
    }

    /// Build a capture from hyper's parsed request head.
    ///
    /// hyper's header map groups repeated names together, so headers come
    /// out grouped by name in first-seen order, with Title-Case names.
    pub fn from_parts(parts: &Parts, body: Bytes) -> Self {
        let headers = parts
            .headers
            .iter()
            .map(|(name, value)| {
                let value = match value.to_str() {
                    Ok(v) => v.to_string(),
                    Err(_) => String::from_utf8_lossy(value.as_bytes()).into_owned(),
                };
                (title_case(name.as_str()), value)
            })
            .collect();

        Self {
            method: parts.method.to_string(),
            target: parts.uri.to_string(),
            version: format!("{:?}", parts.version),
            headers,
            body,
        }
    }

    /// Value of the first `Host` header, or an empty string.
    pub fn host(&self) -> &str {
        self.headers
            .iter()
            .find(|(name, _)| is_host(name))
            .map(|(_, value)| value.as_str())
            .unwrap_or("")
    }

    /// Get the first value of a header, case-insensitively.
    pub fn get_header(&self, key: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(key))
            .map(|(_, value)| value.as_str())
    }

    /// `METHOD target VERSION`
    pub fn request_line(&self) -> String {
        format!("{} {} {}", self.method, self.target, self.version)
    }

    /// The body as UTF-8; invalid sequences become U+FFFD.
    pub fn body_text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }

    /// The entries written to the capture log, in order: request line,
    /// `Host`, remaining headers, a blank separator, then the body.
    pub fn log_entries(&self) -> Vec<String> {
        let mut entries = Vec::with_capacity(self.headers.len() + 4);
        entries.push(self.request_line());
        entries.push(format!("Host: {}", self.host()));
        entries.extend(
            self.headers
                .iter()
                .filter(|(name, _)| !is_host(name))
                .map(|(name, value)| format!("{}: {}", name, value)),
        );
        entries.push(String::new());
        entries.push(self.body_text().into_owned());
        entries
    }
}

fn is_host(name: &str) -> bool {
    name.eq_ignore_ascii_case(HOST.as_str())
}

/// `content-type` -> `Content-Type`
fn title_case(name: &str) -> String {
    name.split('-')
        .map(|segment| {
            let mut chars = segment.chars();
            match chars.next() {
                Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join("-")
}
