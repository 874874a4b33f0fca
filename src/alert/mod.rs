//! Alert demo client: posts a plaintext alert payload to `/v2/alerts`.

mod client;
mod payload;

pub use client::{AlertClient, AlertConfig, AlertResponse, ALERTS_PATH};
pub use payload::AlertPayload;
