//! alert-demo - posts the plaintext demo alert once.
//!
//! A non-2xx reply is returned from `main` as an error.

use clap::Parser;
use poc_capture::{logging, AlertClient, AlertConfig, AlertPayload};
use std::time::Duration;

#[derive(Parser)]
#[command(name = "alert-demo")]
#[command(version)]
#[command(about = "Post a plaintext demo alert to /v2/alerts.")]
struct Args {
    /// Base url of the alert API (plain http)
    #[arg(long, env = "ALERT_API_URL", default_value = "http://127.0.0.1:8081")]
    api_url: String,

    /// API key sent as `Authorization: GenieKey <key>`
    #[arg(long, env = "ALERT_API_KEY", default_value = "TEST_API_KEY")]
    api_key: String,

    /// Request timeout in seconds
    #[arg(long, default_value_t = 10)]
    timeout: u64,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    logging::init();

    let args = Args::parse();

    let client = AlertClient::new(
        AlertConfig::new()
            .api_url(args.api_url)
            .api_key(args.api_key)
            .timeout(Duration::from_secs(args.timeout)),
    );

    client.send(&AlertPayload::demo()).await?;
    Ok(())
}
