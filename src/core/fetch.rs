//! Single byte-range retrieval
//!
//! A fetch is one isolated failure domain: it owns its sink, never retries and
//! reports every failure with the sequence index of its chunk.

use std::path::Path;
use std::sync::Arc;

use log::debug;
use reqwest::header::{CONTENT_LENGTH, RANGE};
use reqwest::{Client, Url};
use tokio::io::AsyncReadExt;

use crate::core::error::{Error, Result};
use crate::core::plan::ChunkTask;
use crate::core::progress::Reporter;
use crate::core::sink::ChunkSink;
use crate::core::stream::{create_http_stream, pump};

/// A chunk that was fully written to its sink
#[derive(Debug)]
pub struct ChunkResult {
    pub sequence_index: u32,
    pub sink: ChunkSink,
    pub bytes_written: u64,
}

/// Fetches byte ranges of one resource
pub struct ChunkFetcher {
    client: Client,
    url: Url,
    buffer_size: usize,
    reporter: Arc<Reporter>,
}

impl ChunkFetcher {
    pub(crate) fn new(client: Client, url: Url, buffer_size: usize, reporter: Arc<Reporter>) -> Self {
        Self {
            client,
            url,
            buffer_size,
            reporter,
        }
    }

    /// Allocates a sink in `scratch_dir` and fills it with the task's range
    pub async fn fetch_into_sink(&self, task: ChunkTask, scratch_dir: &Path) -> Result<ChunkResult> {
        let sink = ChunkSink::create(scratch_dir, task.sequence_index)?;
        let bytes_written = self.fetch(task, &sink).await?;
        Ok(ChunkResult {
            sequence_index: task.sequence_index,
            sink,
            bytes_written,
        })
    }

    /// Streams the task's range into `sink` and returns the number of bytes written
    pub async fn fetch(&self, task: ChunkTask, sink: &ChunkSink) -> Result<u64> {
        let index = task.sequence_index;
        let expected = task.range.len();
        let range_header = task.range.header_value();

        self.reporter.chunk_started(index);
        debug!("Chunk {index}: requesting {range_header}");

        let response = self
            .client
            .get(self.url.clone())
            .header(RANGE, &range_header)
            .send()
            .await
            .map_err(|e| Error::fetch(Some(index), e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::fetch(
                Some(index),
                format!("Range request {range_header} failed: {status}"),
            ));
        }

        // A server that ignores Range answers 200 with the whole body
        let announced = response
            .headers()
            .get(CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<u64>().ok());
        if let Some(announced) = announced {
            if announced != expected {
                return Err(Error::fetch(
                    Some(index),
                    format!("Range request {range_header} returned {announced} bytes ({status}), expected {expected}"),
                ));
            }
        }

        // One byte past the range is enough to tell an oversized body apart
        let mut body = create_http_stream(response).take(expected + 1);
        let mut writer = sink.writer()?;
        let reporter = Arc::clone(&self.reporter);
        let written = pump(&mut body, &mut writer, self.buffer_size, |n| {
            reporter.advance(Some(index), n)
        })
        .await
        .map_err(|e| e.in_chunk(index))?;

        if written > expected {
            return Err(Error::fetch(
                Some(index),
                format!("Chunk body exceeds the {expected} bytes requested by {range_header}"),
            ));
        }
        if written != expected {
            return Err(Error::fetch(
                Some(index),
                format!("Chunk body was {written} bytes, expected {expected}"),
            ));
        }

        self.reporter.chunk_finished(index);
        debug!("Chunk {index}: {written} bytes written to {}", sink.path().display());
        Ok(written)
    }
}
