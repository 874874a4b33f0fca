//! # poc-capture
//!
//! Two small proof-of-concept tools built on hyper and tokio:
//!
//! * a one-shot HTTP capture server that logs the first `POST` it receives
//!   (request line, headers with `Host` first, a blank line, and the body) to
//!   stdout and optionally to a file, answers `200 OK`, and shuts down;
//! * an alert demo client that posts a fixed JSON payload to `/v2/alerts`
//!   with a static `GenieKey` authorization header.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use poc_capture::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
//!     let config = CaptureConfig::new().port(8081).outfile("capture.txt");
//!     let captured = CaptureServer::run(config).await?;
//!     println!("captured {}", captured.request_line());
//!     Ok(())
//! }
//! ```
//!
//! Point the demo at the server to see what an alert looks like on the wire:
//!
//! ```rust,no_run
//! use poc_capture::prelude::*;
//!
//! # async fn demo() -> Result<(), AlertError> {
//! let client = AlertClient::new(AlertConfig::new().api_url("http://127.0.0.1:8081"));
//! client.send(&AlertPayload::demo()).await?;
//! # Ok(())
//! # }
//! ```

pub mod alert;
pub mod capture;
pub mod error;
pub mod http;
pub mod logging;
pub mod runtime;

/// Re-export commonly used types.
pub mod prelude {
    pub use crate::alert::{AlertClient, AlertConfig, AlertPayload, AlertResponse};
    pub use crate::capture::{CaptureLog, CaptureSink, FileSink, StreamSink};
    pub use crate::error::{AlertError, CaptureError};
    pub use crate::http::CapturedRequest;
    pub use crate::runtime::{CaptureConfig, CaptureServer};
}

pub use alert::{AlertClient, AlertConfig, AlertPayload};
pub use error::{AlertError, CaptureError};
pub use http::CapturedRequest;
pub use runtime::{CaptureConfig, CaptureServer};
