//! Capture server configuration.

use std::path::PathBuf;
use std::time::Duration;

/// Configuration for the capture server.
#[derive(Debug, Clone)]
pub struct CaptureConfig {
    /// Host address to bind to.
    pub host: String,
    /// Port to listen on.
    pub port: u16,
    /// File that captured request text is appended to.
    pub outfile: Option<PathBuf>,
    /// Maximum request body size in bytes.
    pub max_body_size: usize,
    /// Per-connection timeout in seconds.
    pub request_timeout: u64,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8081,
            outfile: None,
            max_body_size: 10 * 1024 * 1024, // 10MB
            request_timeout: 30,
        }
    }
}

impl CaptureConfig {
    /// Create a new config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the host address.
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    /// Set the port.
    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Set the output file. An empty path disables file output.
    pub fn outfile(mut self, path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        self.outfile = if path.as_os_str().is_empty() {
            None
        } else {
            Some(path)
        };
        self
    }

    pub fn max_body_size(mut self, bytes: usize) -> Self {
        self.max_body_size = bytes;
        self
    }

    pub fn request_timeout(mut self, secs: u64) -> Self {
        self.request_timeout = secs;
        self
    }

    /// Get the bind address.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub(crate) fn timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout)
    }
}
