//! Tracing setup shared by both binaries.

use tracing_subscriber::EnvFilter;

/// Install a `fmt` subscriber filtered by `RUST_LOG` (default `info`).
/// Call once, at the top of `main`.
///
/// Diagnostics go to stderr; stdout carries only captured request text.
pub fn init() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
}
