//! Alert client over a single plain HTTP/1.1 connection.

use super::AlertPayload;
use crate::error::AlertError;
use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::client::conn::http1;
use hyper::header::{ACCEPT, AUTHORIZATION, CONTENT_LENGTH, CONTENT_TYPE, HOST, USER_AGENT};
use hyper::http::uri::Authority;
use hyper::{Method, Request, StatusCode, Uri};
use hyper_util::rt::TokioIo;
use std::time::Duration;
use tokio::net::TcpStream;
use tracing::{debug, error, info};

/// Path alerts are posted to, relative to the API url.
pub const ALERTS_PATH: &str = "/v2/alerts";

const USER_AGENT_VALUE: &str = concat!("poc-capture/", env!("CARGO_PKG_VERSION"));

/// Configuration for the alert client.
#[derive(Debug, Clone)]
pub struct AlertConfig {
    /// Base url of the alert API.
    pub api_url: String,
    /// Key sent as `Authorization: GenieKey <key>`.
    pub api_key: String,
    /// Bound on the whole exchange.
    pub timeout: Duration,
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            api_url: "http://127.0.0.1:8081".to_string(),
            api_key: "TEST_API_KEY".to_string(),
            timeout: Duration::from_secs(10),
        }
    }
}

impl AlertConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn api_url(mut self, url: impl Into<String>) -> Self {
        self.api_url = url.into();
        self
    }

    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = key.into();
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// A successful reply from the alert endpoint.
#[derive(Debug, Clone)]
pub struct AlertResponse {
    pub status: StatusCode,
    pub body: String,
}

/// Sends alerts to `{api_url}/v2/alerts`.
#[derive(Debug, Clone)]
pub struct AlertClient {
    config: AlertConfig,
}

impl AlertClient {
    pub fn new(config: AlertConfig) -> Self {
        Self { config }
    }

    /// The absolute alert endpoint. Only `http` urls are accepted.
    pub fn endpoint(&self) -> Result<Uri, AlertError> {
        let url = format!("{}{}", self.config.api_url.trim_end_matches('/'), ALERTS_PATH);
        let uri: Uri = url.parse().map_err(|e: hyper::http::uri::InvalidUri| {
            AlertError::InvalidUrl {
                url: url.clone(),
                reason: e.to_string(),
            }
        })?;

        match uri.scheme_str() {
            Some("http") => {}
            Some(other) => return Err(AlertError::UnsupportedScheme(other.to_string())),
            None => {
                return Err(AlertError::InvalidUrl {
                    url,
                    reason: "missing scheme".to_string(),
                })
            }
        }
        if uri.authority().is_none() {
            return Err(AlertError::InvalidUrl {
                url,
                reason: "missing host".to_string(),
            });
        }
        Ok(uri)
    }

    /// Build the `POST` request for a payload.
    ///
    /// The request-target is origin-form; the authority goes in `Host`.
    pub fn build_request(&self, payload: &AlertPayload) -> Result<Request<Full<Bytes>>, AlertError> {
        let endpoint = self.endpoint()?;
        self.request_for(&endpoint, payload)
    }

    /// Send one alert. Any non-2xx status is an error.
    pub async fn send(&self, payload: &AlertPayload) -> Result<AlertResponse, AlertError> {
        let timeout = self.config.timeout;
        match tokio::time::timeout(timeout, self.exchange(payload)).await {
            Ok(result) => result,
            Err(_) => Err(AlertError::Timeout(timeout)),
        }
    }

    async fn exchange(&self, payload: &AlertPayload) -> Result<AlertResponse, AlertError> {
        let endpoint = self.endpoint()?;
        let authority = authority_of(&endpoint)?;
        let request = self.request_for(&endpoint, payload)?;

        let host = authority.host().trim_start_matches('[').trim_end_matches(']');
        let port = authority.port_u16().unwrap_or(80);

        debug!("Connecting to {}:{}", host, port);
        let stream = TcpStream::connect((host, port)).await?;
        let (mut sender, conn) = http1::Builder::new()
            .title_case_headers(true)
            .handshake(TokioIo::new(stream))
            .await?;

        tokio::task::spawn(async move {
            if let Err(err) = conn.await {
                error!("Alert connection failed: {:?}", err);
            }
        });

        info!("Posting alert to {}", endpoint);
        let response = sender.send_request(request).await?;
        let status = response.status();
        let body = response.into_body().collect().await?.to_bytes();
        let body = String::from_utf8_lossy(&body).into_owned();

        if !status.is_success() {
            return Err(AlertError::Status { status, body });
        }

        info!("Alert accepted with status {}", status);
        Ok(AlertResponse { status, body })
    }

    fn request_for(
        &self,
        endpoint: &Uri,
        payload: &AlertPayload,
    ) -> Result<Request<Full<Bytes>>, AlertError> {
        let authority = authority_of(endpoint)?;
        let target = endpoint
            .path_and_query()
            .map(|pq| pq.as_str())
            .unwrap_or(ALERTS_PATH);
        let body = payload.to_json()?;

        let request = Request::builder()
            .method(Method::POST)
            .uri(target)
            .header(HOST, authority.as_str())
            .header(USER_AGENT, USER_AGENT_VALUE)
            .header(ACCEPT, "*/*")
            .header(AUTHORIZATION, format!("GenieKey {}", self.config.api_key))
            .header(CONTENT_TYPE, "application/json")
            .header(CONTENT_LENGTH, body.len().to_string())
            .body(Full::new(Bytes::from(body)))?;
        Ok(request)
    }
}

impl Default for AlertClient {
    fn default() -> Self {
        Self::new(AlertConfig::default())
    }
}

fn authority_of(uri: &Uri) -> Result<Authority, AlertError> {
    uri.authority().cloned().ok_or_else(|| AlertError::InvalidUrl {
        url: uri.to_string(),
        reason: "missing host".to_string(),
    })
}
