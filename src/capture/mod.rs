//! Capture output: where captured request text is written.

mod log;
mod sink;

pub use log::CaptureLog;
pub use sink::{CaptureSink, FileSink, StreamSink};
