//! Integration tests for the capture server and the alert client.

use bytes::Bytes;
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, StatusCode};
use hyper_util::rt::TokioIo;
use poc_capture::http::plain;
use poc_capture::prelude::*;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

/// Build a captured request without going over the wire.
fn captured(headers: &[(&str, &str)], body: &'static [u8]) -> CapturedRequest {
    let mut builder = Request::builder().method("POST").uri("/v2/alerts");
    for (name, value) in headers {
        builder = builder.header(*name, *value);
    }
    let (parts, ()) = builder.body(()).unwrap().into_parts();
    CapturedRequest::from_parts(&parts, Bytes::from_static(body))
}

/// Bind a capture server on an ephemeral port that logs to `log`.
async fn spawn_capture(
    config: CaptureConfig,
    log: CaptureLog,
) -> (SocketAddr, JoinHandle<Result<CapturedRequest, CaptureError>>) {
    let server = CaptureServer::bind_with_log(config.port(0), log).await.unwrap();
    let addr = server.local_addr().unwrap();
    (addr, tokio::spawn(server.serve_one()))
}

/// Write raw bytes and read until the server closes the connection.
async fn raw_exchange(addr: SocketAddr, request: &[u8]) -> String {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream.write_all(request).await.unwrap();
    let mut buf = Vec::new();
    let _ = stream.read_to_end(&mut buf).await;
    String::from_utf8_lossy(&buf).into_owned()
}

/// A server that answers exactly one request with `status`.
async fn spawn_status_stub(status: StatusCode, body: &'static str) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let service = service_fn(move |_req: Request<Incoming>| async move {
            Ok::<_, hyper::Error>(plain(status, body))
        });
        let _ = http1::Builder::new()
            .serve_connection(TokioIo::new(stream), service)
            .await;
    });
    addr
}

/// A sink that takes `delay` per entry and remembers what it was given.
struct SlowSink {
    delay: Duration,
    entries: Arc<Mutex<Vec<String>>>,
}

#[async_trait::async_trait]
impl CaptureSink for SlowSink {
    async fn write_entry(&mut self, entry: &str) -> std::io::Result<()> {
        tokio::time::sleep(self.delay).await;
        self.entries.lock().unwrap().push(entry.to_string());
        Ok(())
    }
}

fn client_for(addr: SocketAddr) -> AlertClient {
    AlertClient::new(AlertConfig::new().api_url(format!("http://{}", addr)))
}

#[tokio::test]
async fn test_log_entries_put_host_first() {
    let request = captured(
        &[
            ("content-type", "text/plain"),
            ("host", "example.test:8081"),
            ("x-trace-id", "abc"),
        ],
        b"hello",
    );

    assert_eq!(
        request.log_entries(),
        vec![
            "POST /v2/alerts HTTP/1.1".to_string(),
            "Host: example.test:8081".to_string(),
            "Content-Type: text/plain".to_string(),
            "X-Trace-Id: abc".to_string(),
            String::new(),
            "hello".to_string(),
        ]
    );
}

#[tokio::test]
async fn test_log_entries_without_host() {
    let request = captured(&[("accept", "*/*")], b"");

    assert_eq!(request.host(), "");
    let entries = request.log_entries();
    assert_eq!(entries[1], "Host: ");
    assert_eq!(entries[2], "Accept: */*");
    assert_eq!(entries[3], "");
    assert_eq!(entries[4], "");
}

#[tokio::test]
async fn test_invalid_utf8_body_uses_replacement_characters() {
    let request = captured(&[("host", "h")], b"\xffok\xfe");

    assert_eq!(request.body_text(), "\u{FFFD}ok\u{FFFD}");
    assert_eq!(request.log_entries().last().unwrap(), "\u{FFFD}ok\u{FFFD}");
}

#[tokio::test]
async fn test_stream_sink_writes_each_entry_as_a_line() {
    let mock = tokio_test::io::Builder::new()
        .write(b"POST /v2/alerts HTTP/1.1\n")
        .write(b"Host: example.test\n")
        .write(b"Authorization: GenieKey k\n")
        .write(b"\n")
        .write(b"{\"a\":1}\n")
        .build();

    let mut log = CaptureLog::new().with_sink(StreamSink::new(mock));
    let request = captured(
        &[("host", "example.test"), ("authorization", "GenieKey k")],
        br#"{"a":1}"#,
    );

    log.record(&request).await.unwrap();
}

#[tokio::test]
async fn test_file_sink_appends_one_newline_per_entry() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("capture.txt");
    tokio::fs::write(&path, "existing\n").await.unwrap();

    let mut sink = FileSink::new(&path);
    sink.write_entry("first").await.unwrap();
    sink.write_entry("second\n").await.unwrap();
    sink.write_entry("").await.unwrap();

    let contents = tokio::fs::read_to_string(&path).await.unwrap();
    assert_eq!(contents, "existing\nfirst\nsecond\n\n");
}

#[tokio::test]
async fn test_capture_log_from_config() {
    let log = CaptureLog::from_config(&CaptureConfig::new());
    assert_eq!(log.len(), 1);

    let log = CaptureLog::from_config(&CaptureConfig::new().outfile("capture.txt"));
    assert_eq!(log.len(), 2);
}

#[tokio::test]
async fn test_capture_config_defaults() {
    let config = CaptureConfig::new();
    assert_eq!(config.bind_addr(), "127.0.0.1:8081");
    assert!(config.outfile.is_none());

    let config = CaptureConfig::new().port(9000).outfile("");
    assert_eq!(config.bind_addr(), "127.0.0.1:9000");
    assert!(config.outfile.is_none());
}

#[tokio::test]
async fn test_bind_rejects_invalid_address() {
    let result = CaptureServer::bind_with_log(CaptureConfig::new().host("not an ip"), CaptureLog::new()).await;
    assert!(matches!(result, Err(CaptureError::InvalidAddress(_))));
}

#[tokio::test]
async fn test_alert_is_captured_and_server_shuts_down() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("capture.txt");
    let (addr, server) = spawn_capture(
        CaptureConfig::new(),
        CaptureLog::new().with_sink(FileSink::new(&path)),
    )
    .await;

    let response = client_for(addr).send(&AlertPayload::demo()).await.unwrap();
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body, "OK");

    let request = tokio::time::timeout(Duration::from_secs(5), server)
        .await
        .expect("server did not stop after one request")
        .unwrap()
        .unwrap();

    assert_eq!(request.method, "POST");
    assert_eq!(request.target, "/v2/alerts");
    assert_eq!(request.version, "HTTP/1.1");
    assert_eq!(request.host(), addr.to_string());
    assert_eq!(request.get_header("Authorization"), Some("GenieKey TEST_API_KEY"));
    assert_eq!(request.get_header("Content-Type"), Some("application/json"));

    // Header names are sent and captured Title-Case.
    let names: Vec<&str> = request.headers.iter().map(|(name, _)| name.as_str()).collect();
    assert!(names.contains(&"Authorization"));
    assert!(names.contains(&"Content-Type"));
    assert!(names.contains(&"User-Agent"));

    let payload: AlertPayload = serde_json::from_slice(&request.body).unwrap();
    assert_eq!(payload, AlertPayload::demo());

    let json = String::from_utf8(AlertPayload::demo().to_json().unwrap()).unwrap();
    let contents = tokio::fs::read_to_string(&path).await.unwrap();
    assert!(contents.starts_with(&format!("POST /v2/alerts HTTP/1.1\nHost: {}\n", addr)));
    assert!(contents.contains("Authorization: GenieKey TEST_API_KEY\n"));
    assert!(contents.contains("Content-Type: application/json\n"));
    assert!(contents.ends_with(&format!("\n\n{}\n", json)));

    // Listener is gone once the capture is done.
    assert!(TcpStream::connect(addr).await.is_err());
}

#[tokio::test]
async fn test_ok_response_headers() {
    let (addr, server) = spawn_capture(CaptureConfig::new(), CaptureLog::new()).await;

    let response = raw_exchange(
        addr,
        b"POST /hook?x=1 HTTP/1.1\r\nHost: local\r\nContent-Length: 5\r\n\r\nhello",
    )
    .await;

    assert!(response.starts_with("HTTP/1.1 200 OK\r\n"));
    assert!(response.contains("Content-Type: text/plain; charset=utf-8\r\n"));
    assert!(response.contains("Content-Length: 2\r\n"));
    assert!(response.contains("Connection: close\r\n"));
    assert!(response.ends_with("\r\n\r\nOK"));

    let request = server.await.unwrap().unwrap();
    assert_eq!(request.target, "/hook?x=1");
    assert_eq!(request.body_text(), "hello");
}

#[tokio::test]
async fn test_invalid_utf8_body_is_captured() {
    let (addr, server) = spawn_capture(CaptureConfig::new(), CaptureLog::new()).await;

    let response = raw_exchange(
        addr,
        b"POST / HTTP/1.1\r\nHost: h\r\nContent-Length: 3\r\n\r\n\xffab",
    )
    .await;
    assert!(response.starts_with("HTTP/1.1 200 OK"));

    let request = server.await.unwrap().unwrap();
    assert_eq!(request.body.as_ref(), b"\xffab");
    assert_eq!(request.body_text(), "\u{FFFD}ab");
}

#[tokio::test]
async fn test_non_post_is_rejected_and_server_keeps_listening() {
    let (addr, server) = spawn_capture(CaptureConfig::new(), CaptureLog::new()).await;

    let response = raw_exchange(addr, b"GET / HTTP/1.1\r\nHost: h\r\n\r\n").await;
    assert!(response.starts_with("HTTP/1.1 501"));
    assert!(!server.is_finished());

    client_for(addr).send(&AlertPayload::demo()).await.unwrap();
    let request = server.await.unwrap().unwrap();
    assert_eq!(request.method, "POST");
}

#[tokio::test]
async fn test_oversized_body_is_rejected() {
    let (addr, server) = spawn_capture(CaptureConfig::new().max_body_size(4), CaptureLog::new()).await;

    let response = raw_exchange(
        addr,
        b"POST / HTTP/1.1\r\nHost: h\r\nContent-Length: 10\r\n\r\n0123456789",
    )
    .await;
    assert!(response.starts_with("HTTP/1.1 413"));
    assert!(!server.is_finished());

    let response = raw_exchange(addr, b"POST / HTTP/1.1\r\nHost: h\r\nContent-Length: 2\r\n\r\nok").await;
    assert!(response.starts_with("HTTP/1.1 200 OK"));
    assert_eq!(server.await.unwrap().unwrap().body_text(), "ok");
}

#[tokio::test]
async fn test_idle_connection_times_out() {
    let (addr, server) = spawn_capture(CaptureConfig::new().request_timeout(1), CaptureLog::new()).await;

    let _idle = TcpStream::connect(addr).await.unwrap();

    // Served only after the idle connection has been dropped.
    let response = client_for(addr).send(&AlertPayload::demo()).await.unwrap();
    assert_eq!(response.status, StatusCode::OK);
    assert!(server.await.unwrap().is_ok());
}

#[tokio::test]
async fn test_alert_request_shape() {
    let client = AlertClient::default();
    let request = client.build_request(&AlertPayload::demo()).unwrap();

    assert_eq!(request.method(), hyper::Method::POST);
    assert_eq!(request.uri(), "/v2/alerts");
    let headers = request.headers();
    assert_eq!(headers["host"], "127.0.0.1:8081");
    assert_eq!(headers["authorization"], "GenieKey TEST_API_KEY");
    assert_eq!(headers["content-type"], "application/json");
}

#[tokio::test]
async fn test_alert_endpoint() {
    let client = AlertClient::new(AlertConfig::new().api_url("http://alerts.local:9000/"));
    assert_eq!(client.endpoint().unwrap(), "http://alerts.local:9000/v2/alerts");

    let client = AlertClient::new(AlertConfig::new().api_url("https://alerts.local"));
    assert!(matches!(client.endpoint(), Err(AlertError::UnsupportedScheme(s)) if s == "https"));

    let client = AlertClient::new(AlertConfig::new().api_url("alerts.local"));
    assert!(matches!(client.endpoint(), Err(AlertError::InvalidUrl { .. })));
}

#[tokio::test]
async fn test_alert_payload_json() {
    let json: serde_json::Value = serde_json::from_slice(&AlertPayload::demo().to_json().unwrap()).unwrap();
    assert_eq!(
        json,
        serde_json::json!({
            "message": "test",
            "description": "plaintext demo",
            "priority": "P4",
            "tags": ["oracle_checks", "oracle"],
        })
    );
}

#[tokio::test]
async fn test_alert_fails_on_non_success_status() {
    let addr = spawn_status_stub(StatusCode::SERVICE_UNAVAILABLE, "unavailable").await;

    let err = client_for(addr).send(&AlertPayload::demo()).await.unwrap_err();

    assert_eq!(err.status(), Some(StatusCode::SERVICE_UNAVAILABLE));
    match err {
        AlertError::Status { body, .. } => assert_eq!(body, "unavailable"),
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_alert_fails_on_redirect_status() {
    let addr = spawn_status_stub(StatusCode::FOUND, "moved").await;

    let err = client_for(addr).send(&AlertPayload::demo()).await.unwrap_err();
    assert_eq!(err.status(), Some(StatusCode::FOUND));
}

#[tokio::test]
async fn test_alert_times_out() {
    // Accepts but never answers.
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let _hold = tokio::spawn(async move {
        let (_stream, _) = listener.accept().await.unwrap();
        tokio::time::sleep(Duration::from_secs(30)).await;
    });

    let client = AlertClient::new(
        AlertConfig::new()
            .api_url(format!("http://{}", addr))
            .timeout(Duration::from_millis(200)),
    );
    let err = client.send(&AlertPayload::demo()).await.unwrap_err();
    assert!(matches!(err, AlertError::Timeout(_)));
}

#[tokio::test]
async fn test_repeated_headers_keep_wire_order() {
    let (addr, server) = spawn_capture(CaptureConfig::new(), CaptureLog::new()).await;

    let response = raw_exchange(
        addr,
        b"POST / HTTP/1.1\r\nX-A: 1\r\nHost: h\r\nX-B: 2\r\nX-A: 3\r\nContent-Length: 0\r\n\r\n",
    )
    .await;
    assert!(response.starts_with("HTTP/1.1 200 OK"));

    let request = server.await.unwrap().unwrap();
    assert_eq!(
        request.log_entries(),
        vec![
            "POST / HTTP/1.1",
            "Host: h",
            "X-A: 1",
            "X-B: 2",
            "X-A: 3",
            "Content-Length: 0",
            "",
            "",
        ]
    );
}

#[tokio::test]
async fn test_capture_write_failure_keeps_server_listening() {
    // Appending to a directory always fails.
    let dir = tempfile::tempdir().unwrap();
    let (addr, server) = spawn_capture(
        CaptureConfig::new(),
        CaptureLog::new().with_sink(FileSink::new(dir.path())),
    )
    .await;

    let request = b"POST / HTTP/1.1\r\nHost: h\r\nContent-Length: 2\r\n\r\nhi";

    let response = raw_exchange(addr, request).await;
    assert!(response.starts_with("HTTP/1.1 500"));
    assert!(!server.is_finished());

    // Still accepting: the failed write did not count as the capture.
    let response = raw_exchange(addr, request).await;
    assert!(response.starts_with("HTTP/1.1 500"));
    assert!(!server.is_finished());

    server.abort();
}

#[tokio::test]
async fn test_timeout_does_not_cut_short_a_capture_being_written() {
    let entries = Arc::new(Mutex::new(Vec::new()));
    let sink = SlowSink {
        delay: Duration::from_millis(400),
        entries: entries.clone(),
    };
    let (addr, server) = spawn_capture(
        CaptureConfig::new().request_timeout(1),
        CaptureLog::new().with_sink(sink),
    )
    .await;

    // Five entries at 400ms each outlast the one second timeout.
    let response = raw_exchange(
        addr,
        b"POST / HTTP/1.1\r\nHost: h\r\nContent-Length: 2\r\n\r\nhi",
    )
    .await;
    assert!(response.starts_with("HTTP/1.1 200 OK"));

    let request = server.await.unwrap().unwrap();
    assert_eq!(*entries.lock().unwrap(), request.log_entries());
    assert_eq!(entries.lock().unwrap().len(), 5);
}
