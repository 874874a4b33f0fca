//! The one-shot capture server.

mod config;
mod head;
mod server;

pub use config::CaptureConfig;
pub use server::CaptureServer;
