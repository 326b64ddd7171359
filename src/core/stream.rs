//! Streaming plumbing and download options for rangefetch
//!
//! Turns HTTP responses into `AsyncRead` streams and pumps them into writers.

use std::path::PathBuf;
use std::pin::Pin;
use std::task::{Context, Poll};

use futures::TryStreamExt;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, ReadBuf};

use crate::core::error::{Error, Result};
use crate::core::progress::ProgressCallback;

/// Response body exposed as an `AsyncRead`
pub struct DownloadStream {
    inner: Box<dyn AsyncRead + Send + Unpin>,
}

impl AsyncRead for DownloadStream {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<std::io::Result<()>> {
        Pin::new(&mut self.inner).poll_read(cx, buf)
    }
}

/// Creates a DownloadStream from an HTTP response
pub fn create_http_stream(response: reqwest::Response) -> DownloadStream {
    let stream = tokio_util::io::StreamReader::new(
        response
            .bytes_stream()
            .map_err(std::io::Error::other),
    );
    DownloadStream {
        inner: Box::new(stream),
    }
}

/// Options for download operations
#[derive(Clone)]
pub struct DownloadOptions {
    /// Optional progress observer
    pub progress: Option<ProgressCallback>,

    /// Buffer size for streaming operations
    pub buffer_size: usize,

    /// Desired number of parallel range requests
    pub max_connections: u32,

    /// Directory for per-chunk scratch files; defaults to the destination's directory
    pub scratch_dir: Option<PathBuf>,
}

impl Default for DownloadOptions {
    fn default() -> Self {
        Self {
            progress: None,
            buffer_size: 64 * 1024, // 64KB
            max_connections: num_cpus::get().max(1) as u32,
            scratch_dir: None,
        }
    }
}

impl std::fmt::Debug for DownloadOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DownloadOptions")
            .field("progress", &self.progress.is_some())
            .field("buffer_size", &self.buffer_size)
            .field("max_connections", &self.max_connections)
            .field("scratch_dir", &self.scratch_dir)
            .finish()
    }
}

/// Copies `reader` into `writer`, calling `on_bytes` after every write.
///
/// Read failures are transport failures (`FetchError` without a chunk index);
/// write failures are local storage failures (`SinkError`). The writer is
/// flushed before returning.
pub(crate) async fn pump<R, W, F>(
    reader: &mut R,
    writer: &mut W,
    buffer_size: usize,
    mut on_bytes: F,
) -> Result<u64>
where
    R: AsyncRead + Unpin + ?Sized,
    W: AsyncWrite + Unpin + ?Sized,
    F: FnMut(u64),
{
    let mut buffer = vec![0u8; buffer_size.max(1)];
    let mut written = 0u64;

    loop {
        let bytes_read = reader
            .read(&mut buffer)
            .await
            .map_err(|e| Error::fetch(None, e))?;

        if bytes_read == 0 {
            break;
        }

        writer
            .write_all(&buffer[..bytes_read])
            .await
            .map_err(Error::SinkError)?;
        written += bytes_read as u64;
        on_bytes(bytes_read as u64);
    }

    writer.flush().await.map_err(Error::SinkError)?;
    Ok(written)
}
