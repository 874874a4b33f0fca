//! Error types for the capture server and the alert client.

use thiserror::Error;

/// Errors raised while binding, serving, or recording a capture.
#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("invalid bind address '{0}'")]
    InvalidAddress(String),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised while sending an alert.
#[derive(Debug, Error)]
pub enum AlertError {
    #[error("invalid api url '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("unsupported scheme '{0}', only plain http is available")]
    UnsupportedScheme(String),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("http error: {0}")]
    Http(#[from] hyper::Error),

    #[error("failed to build request: {0}")]
    Request(#[from] hyper::http::Error),

    #[error("failed to encode payload: {0}")]
    Json(#[from] serde_json::Error),

    #[error("request timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("alert endpoint returned {status}: {body}")]
    Status {
        status: hyper::StatusCode,
        body: String,
    },
}

impl AlertError {
    /// The HTTP status carried by a [`AlertError::Status`] error.
    pub fn status(&self) -> Option<hyper::StatusCode> {
        match self {
            AlertError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}
