//! One-shot capture server implementation.

use super::head::{HeadBuffer, HeadRecorder};
use crate::capture::CaptureLog;
use crate::error::CaptureError;
use crate::http::{capture_ok, plain, CapturedRequest};
use crate::runtime::CaptureConfig;
use bytes::Bytes;
use http_body_util::{BodyExt, Full, LengthLimitError, Limited};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

/// State shared by every connection the server handles.
struct Shared {
    log: Mutex<CaptureLog>,
    captured: Mutex<Option<CapturedRequest>>,
    max_body_size: usize,
}

/// State of the connection currently being served.
struct ConnState {
    head: Arc<HeadBuffer>,
    /// Set once the capture starts being written.
    recording: AtomicBool,
}

/// Capture server.
///
/// Accepts connections one at a time and stops after the first `POST` has
/// been captured and answered.
pub struct CaptureServer {
    config: CaptureConfig,
    listener: TcpListener,
    log: CaptureLog,
}

impl CaptureServer {
    /// Bind the listener, logging to stdout and the configured output file.
    pub async fn bind(config: CaptureConfig) -> Result<Self, CaptureError> {
        let log = CaptureLog::from_config(&config);
        Self::bind_with_log(config, log).await
    }

    /// Bind the listener with a custom capture log.
    pub async fn bind_with_log(config: CaptureConfig, log: CaptureLog) -> Result<Self, CaptureError> {
        let bind_addr = config.bind_addr();
        let addr: SocketAddr = bind_addr
            .parse()
            .map_err(|_| CaptureError::InvalidAddress(bind_addr.clone()))?;
        let listener = TcpListener::bind(addr).await?;

        info!("Capture server listening on {}", listener.local_addr()?);

        Ok(Self {
            config,
            listener,
            log,
        })
    }

    /// Bind and serve a single capture.
    pub async fn run(config: CaptureConfig) -> Result<CapturedRequest, CaptureError> {
        Self::bind(config).await?.serve_one().await
    }

    /// Address the listener is bound to.
    pub fn local_addr(&self) -> Result<SocketAddr, CaptureError> {
        Ok(self.listener.local_addr()?)
    }

    /// Serve connections until one request has been captured.
    ///
    /// The listener is closed when this returns. A request whose capture
    /// could not be written is answered with `500` and does not count.
    pub async fn serve_one(self) -> Result<CapturedRequest, CaptureError> {
        let timeout = self.config.timeout();
        let shared = Arc::new(Shared {
            log: Mutex::new(self.log),
            captured: Mutex::new(None),
            max_body_size: self.config.max_body_size,
        });

        loop {
            let (stream, remote_addr) = self.listener.accept().await?;
            let (recorder, head) = HeadRecorder::new(stream);
            let state = Arc::new(ConnState {
                head,
                recording: AtomicBool::new(false),
            });

            let conn_shared = shared.clone();
            let conn_state = state.clone();
            let service = service_fn(move |req| {
                let shared = conn_shared.clone();
                let state = conn_state.clone();
                async move { handle_request(req, shared, state, remote_addr).await }
            });

            let conn = http1::Builder::new()
                .keep_alive(false)
                .title_case_headers(true)
                .serve_connection(TokioIo::new(recorder), service);
            tokio::pin!(conn);

            // The timeout bounds reading the request; a capture that has
            // started writing is never cut short.
            let served = match tokio::time::timeout(timeout, conn.as_mut()).await {
                Ok(result) => Some(result),
                Err(_) if state.recording.load(Ordering::Acquire) => Some(conn.await),
                Err(_) => None,
            };

            match served {
                Some(Ok(())) => {}
                Some(Err(err)) => warn!("Error serving connection from {}: {:?}", remote_addr, err),
                None => warn!("Connection from {} timed out after {:?}", remote_addr, timeout),
            }

            if let Some(captured) = shared.captured.lock().await.take() {
                info!("Request captured, shutting down");
                return Ok(captured);
            }
        }
    }
}

/// Handle an incoming HTTP request.
async fn handle_request(
    req: Request<Incoming>,
    shared: Arc<Shared>,
    state: Arc<ConnState>,
    remote_addr: SocketAddr,
) -> Result<Response<Full<Bytes>>, hyper::Error> {
    let (parts, body) = req.into_parts();

    debug!("Handling request: {} {} from {}", parts.method, parts.uri, remote_addr);

    if parts.method != Method::POST {
        warn!("Rejecting {} from {}", parts.method, remote_addr);
        return Ok(plain(
            StatusCode::NOT_IMPLEMENTED,
            format!("Unsupported method ('{}')", parts.method),
        ));
    }

    let body = match Limited::new(body, shared.max_body_size).collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(err) if err.downcast_ref::<LengthLimitError>().is_some() => {
            warn!("Request body from {} exceeds {} bytes", remote_addr, shared.max_body_size);
            return Ok(plain(StatusCode::PAYLOAD_TOO_LARGE, "Request body too large"));
        }
        Err(err) => {
            warn!("Failed to read request body from {}: {}", remote_addr, err);
            return Ok(plain(StatusCode::BAD_REQUEST, "Failed to read request body"));
        }
    };

    let raw = state
        .head
        .head()
        .and_then(|head| CapturedRequest::from_raw_head(&head, body.clone()));
    let captured = match raw {
        Some(captured) => captured,
        None => {
            debug!("Raw head unavailable, using parsed headers");
            CapturedRequest::from_parts(&parts, body)
        }
    };

    state.recording.store(true, Ordering::Release);
    if let Err(err) = shared.log.lock().await.record(&captured).await {
        error!("Failed to write capture from {}: {}", remote_addr, err);
        return Ok(plain(StatusCode::INTERNAL_SERVER_ERROR, "Failed to write capture"));
    }

    *shared.captured.lock().await = Some(captured);
    Ok(capture_ok())
}
