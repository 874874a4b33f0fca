//! http-capture - one-shot HTTP capture server.
//!
//! Listens on loopback, prints the first POST it receives, answers `OK`, and
//! exits.

use clap::Parser;
use poc_capture::{logging, CaptureConfig, CaptureServer};

#[derive(Parser)]
#[command(name = "http-capture")]
#[command(version)]
#[command(about = "Minimal HTTP capture server (one-shot).")]
struct Args {
    /// Port to listen on
    #[arg(long, default_value_t = 8081)]
    port: u16,

    /// File to append captured request to
    #[arg(long, default_value = "")]
    outfile: String,

    /// Maximum accepted request body size in bytes
    #[arg(long, default_value_t = 10 * 1024 * 1024)]
    max_body_size: usize,

    /// Seconds a connection may take to deliver its request
    #[arg(long, default_value_t = 30, value_parser = clap::value_parser!(u64).range(1..))]
    request_timeout: u64,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    logging::init();

    let args = Args::parse();

    let config = CaptureConfig::new()
        .port(args.port)
        .outfile(args.outfile)
        .max_body_size(args.max_body_size)
        .request_timeout(args.request_timeout);

    if let Some(path) = &config.outfile {
        tracing::info!("Appending capture to {}", path.display());
    }

    let captured = CaptureServer::run(config).await?;
    tracing::info!(
        "Captured {} ({} body bytes)",
        captured.request_line(),
        captured.body.len()
    );
    Ok(())
}
