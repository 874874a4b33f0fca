//! Capture sinks.

use async_trait::async_trait;
use std::path::PathBuf;
use tokio::fs::OpenOptions;
use tokio::io::{AsyncWrite, AsyncWriteExt, Stdout};

/// A destination for capture entries.
///
/// Each entry is one line of captured text without its terminator; the sink
/// decides how lines are terminated.
#[async_trait]
pub trait CaptureSink: Send {
    /// Write a single entry.
    async fn write_entry(&mut self, entry: &str) -> std::io::Result<()>;
}

/// Writes each entry followed by a newline to an async writer, flushing
/// after every entry.
pub struct StreamSink<W> {
    writer: W,
}

impl<W> StreamSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }
}

impl StreamSink<Stdout> {
    /// Sink writing to the process's standard output.
    pub fn stdout() -> Self {
        Self::new(tokio::io::stdout())
    }
}

#[async_trait]
impl<W> CaptureSink for StreamSink<W>
where
    W: AsyncWrite + Unpin + Send,
{
    async fn write_entry(&mut self, entry: &str) -> std::io::Result<()> {
        let line = format!("{}\n", entry);
        self.writer.write_all(line.as_bytes()).await?;
        self.writer.flush().await
    }
}

/// Appends entries to a file, opening it once per entry.
///
/// A newline is added only when the entry does not already end with one.
#[derive(Debug, Clone)]
pub struct FileSink {
    path: PathBuf,
}

impl FileSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl CaptureSink for FileSink {
    async fn write_entry(&mut self, entry: &str) -> std::io::Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;

        let mut buf = String::with_capacity(entry.len() + 1);
        buf.push_str(entry);
        if !entry.ends_with('\n') {
            buf.push('\n');
        }
        file.write_all(buf.as_bytes()).await?;
        file.flush().await
    }
}
