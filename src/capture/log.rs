//! The capture log fans entries out to every configured sink.

use super::sink::{CaptureSink, FileSink, StreamSink};
use crate::http::CapturedRequest;
use crate::runtime::CaptureConfig;
use tracing::debug;

/// Ordered set of sinks that captured requests are written to.
#[derive(Default)]
pub struct CaptureLog {
    sinks: Vec<Box<dyn CaptureSink>>,
}

impl CaptureLog {
    /// Create a log with no sinks.
    pub fn new() -> Self {
        Self::default()
    }

    /// Standard output, plus the output file when one is configured.
    pub fn from_config(config: &CaptureConfig) -> Self {
        let log = Self::new().with_sink(StreamSink::stdout());
        match &config.outfile {
            Some(path) => log.with_sink(FileSink::new(path.clone())),
            None => log,
        }
    }

    /// Add a sink.
    pub fn with_sink(mut self, sink: impl CaptureSink + 'static) -> Self {
        self.sinks.push(Box::new(sink));
        self
    }

    /// Number of sinks.
    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }

    /// Write one entry to every sink, in order.
    pub async fn write_entry(&mut self, entry: &str) -> std::io::Result<()> {
        for sink in self.sinks.iter_mut() {
            sink.write_entry(entry).await?;
        }
        Ok(())
    }

    /// Write all entries of a captured request.
    pub async fn record(&mut self, request: &CapturedRequest) -> std::io::Result<()> {
        let entries = request.log_entries();
        debug!("Recording {} entries to {} sinks", entries.len(), self.sinks.len());
        for entry in &entries {
            self.write_entry(entry).await?;
        }
        Ok(())
    }
}
