//! Records the raw request head while hyper reads the connection.

use std::io;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};

/// Heads larger than this are not recorded.
const MAX_HEAD_SIZE: usize = 64 * 1024;

/// The bytes of one request head, up to and including the blank line.
#[derive(Debug, Default)]
pub(crate) struct HeadBuffer {
    bytes: Mutex<Vec<u8>>,
    complete: AtomicBool,
    overflowed: AtomicBool,
}

impl HeadBuffer {
    /// The complete head, if one was recorded.
    pub(crate) fn head(&self) -> Option<Vec<u8>> {
        if !self.complete.load(Ordering::Acquire) {
            return None;
        }
        self.bytes.lock().ok().map(|bytes| bytes.clone())
    }

    fn push(&self, data: &[u8]) {
        if self.complete.load(Ordering::Acquire) || self.overflowed.load(Ordering::Acquire) {
            return;
        }
        let Ok(mut bytes) = self.bytes.lock() else {
            return;
        };

        // Rescan from just before the new data so a split `\r\n\r\n` is found.
        let scan_from = bytes.len().saturating_sub(3);
        bytes.extend_from_slice(data);

        if let Some(pos) = bytes[scan_from..].windows(4).position(|w| w == b"\r\n\r\n") {
            bytes.truncate(scan_from + pos + 4);
            self.complete.store(true, Ordering::Release);
        } else if bytes.len() > MAX_HEAD_SIZE {
            bytes.clear();
            self.overflowed.store(true, Ordering::Release);
        }
    }
}

/// Wraps a stream and copies everything read from it into a [`HeadBuffer`]
/// until the end of the first request head.
pub(crate) struct HeadRecorder<S> {
    inner: S,
    buffer: Arc<HeadBuffer>,
}

impl<S> HeadRecorder<S> {
    pub(crate) fn new(inner: S) -> (Self, Arc<HeadBuffer>) {
        let buffer = Arc::new(HeadBuffer::default());
        (
            Self {
                inner,
                buffer: buffer.clone(),
            },
            buffer,
        )
    }
}

impl<S: AsyncRead + Unpin> AsyncRead for HeadRecorder<S> {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let before = buf.filled().len();
        let poll = Pin::new(&mut self.inner).poll_read(cx, buf);
        if let Poll::Ready(Ok(())) = poll {
            self.buffer.push(&buf.filled()[before..]);
        }
        poll
    }
}

impl<S: AsyncWrite + Unpin> AsyncWrite for HeadRecorder<S> {
    fn poll_write(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        Pin::new(&mut self.inner).poll_write(cx, buf)
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.inner).poll_flush(cx)
    }

    fn poll_shutdown(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.inner).poll_shutdown(cx)
    }

    fn poll_write_vectored(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        bufs: &[io::IoSlice<'_>],
    ) -> Poll<io::Result<usize>> {
        Pin::new(&mut self.inner).poll_write_vectored(cx, bufs)
    }

    fn is_write_vectored(&self) -> bool {
        self.inner.is_write_vectored()
    }
}
