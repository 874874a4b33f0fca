//! HTTP types for the capture server.

mod request;
mod response;

pub use request::CapturedRequest;
pub use response::{capture_ok, plain};
