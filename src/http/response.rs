//! Fixed plain-text responses sent by the capture server.

use bytes::Bytes;
use http_body_util::Full;
use hyper::header::{HeaderValue, CONNECTION, CONTENT_LENGTH, CONTENT_TYPE};
use hyper::{Response, StatusCode};

const TEXT_PLAIN_UTF8: &str = "text/plain; charset=utf-8";

/// The reply to a captured request: `200 OK` with body `OK`.
pub fn capture_ok() -> Response<Full<Bytes>> {
    plain(StatusCode::OK, "OK")
}

/// A plain-text response that closes the connection.
pub fn plain(status: StatusCode, message: impl Into<Bytes>) -> Response<Full<Bytes>> {
    let body: Bytes = message.into();
    let len = body.len();

    let mut response = Response::new(Full::new(body));
    *response.status_mut() = status;

    let headers = response.headers_mut();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static(TEXT_PLAIN_UTF8));
    headers.insert(CONTENT_LENGTH, HeaderValue::from(len));
    headers.insert(CONNECTION, HeaderValue::from_static("close"));
    response
}
