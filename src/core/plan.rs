//! Chunk planning for parallel downloads
//!
//! Ranges are half-open (`[start, end)`) everywhere inside the crate and are
//! only turned into inclusive HTTP `Range` values by [`ByteRange::header_value`].

use crate::core::probe::Capabilities;

/// A contiguous span `[start, end)` of the remote resource
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    pub start: u64,
    pub end: u64,
}

impl ByteRange {
    pub fn new(start: u64, end: u64) -> Self {
        debug_assert!(start < end, "empty byte range {start}..{end}");
        Self { start, end }
    }

    /// Number of bytes in the range
    pub fn len(&self) -> u64 {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }

    /// Inclusive `Range` header value, e.g. `bytes=0-249999` for `[0, 250000)`
    pub fn header_value(&self) -> String {
        format!("bytes={}-{}", self.start, self.end - 1)
    }
}

/// One planned chunk: its position in the final file and the bytes it covers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkTask {
    pub sequence_index: u32,
    pub range: ByteRange,
}

/// How a download will be carried out
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Strategy {
    /// Stream the probe response body straight to the destination
    SingleStream,
    /// Fetch the listed ranges concurrently and merge them in order
    Chunked(Vec<ChunkTask>),
}

/// Immutable plan built once per download from the probe result
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadPlan {
    pub total_size: Option<u64>,
    pub strategy: Strategy,
}

impl DownloadPlan {
    /// Chooses the strategy: chunked only when ranges are supported and the size is known
    pub fn from_capabilities(caps: &Capabilities, desired_concurrency: u32) -> Self {
        let strategy = match caps.total_size {
            Some(total_size) if caps.supports_ranges => {
                Strategy::Chunked(plan_tasks(total_size, desired_concurrency))
            }
            _ => Strategy::SingleStream,
        };

        Self {
            total_size: caps.total_size,
            strategy,
        }
    }

    pub fn chunk_count(&self) -> usize {
        match &self.strategy {
            Strategy::SingleStream => 1,
            Strategy::Chunked(tasks) => tasks.len(),
        }
    }
}

/// Splits `[0, total_size)` into ranges of `total_size / desired_concurrency` bytes.
///
/// The remainder is not spread across chunks: the final range is clamped to
/// `total_size`, so one extra short chunk appears whenever the size is not a
/// multiple of the chunk size. A chunk size of zero (more connections than
/// bytes) collapses to a single range, and an empty file yields no ranges.
pub fn plan_chunks(total_size: u64, desired_concurrency: u32) -> Vec<ByteRange> {
    if total_size == 0 {
        return Vec::new();
    }

    let concurrency = u64::from(desired_concurrency.max(1));
    let chunk_size = total_size / concurrency;
    if chunk_size == 0 {
        return vec![ByteRange::new(0, total_size)];
    }

    let mut ranges = Vec::with_capacity(total_size.div_ceil(chunk_size) as usize);
    let mut start = 0u64;
    while start < total_size {
        let end = start.saturating_add(chunk_size).min(total_size);
        ranges.push(ByteRange::new(start, end));
        start = end;
    }
    ranges
}

/// Same as [`plan_chunks`] but tagged with sequence indices
pub fn plan_tasks(total_size: u64, desired_concurrency: u32) -> Vec<ChunkTask> {
    plan_chunks(total_size, desired_concurrency)
        .into_iter()
        .enumerate()
        .map(|(index, range)| ChunkTask {
            sequence_index: index as u32,
            range,
        })
        .collect()
}
