//! Progress reporting to a caller-supplied observer
//!
//! The library never renders anything itself. It emits [`ProgressEvent`]s to
//! the callback passed in [`DownloadOptions`](crate::DownloadOptions); the
//! callback may be invoked from any chunk task concurrently.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Stage of the download an event belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Probe finished, transfer is about to begin
    Started,
    /// A range request for one chunk is being issued
    ChunkStarted,
    /// Bytes arrived (chunk or single stream)
    Progress,
    /// One chunk has been fully written to its sink
    ChunkFinished,
    /// The destination is complete
    Finished,
}

/// A single observation passed to the progress callback
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressEvent {
    pub phase: Phase,
    /// Size of the whole resource when known
    pub total_size: Option<u64>,
    /// Sequence index of the chunk, `None` for whole-download events
    pub chunk: Option<u32>,
    /// Bytes downloaded so far across all chunks
    pub downloaded: u64,
}

/// Progress callback function type
pub type ProgressCallback = Arc<dyn Fn(&ProgressEvent) + Send + Sync>;

/// Shared per-download reporter; keeps the running byte count
pub(crate) struct Reporter {
    callback: Option<ProgressCallback>,
    total_size: Option<u64>,
    downloaded: AtomicU64,
}

impl Reporter {
    pub(crate) fn new(callback: Option<ProgressCallback>, total_size: Option<u64>) -> Arc<Self> {
        Arc::new(Self {
            callback,
            total_size,
            downloaded: AtomicU64::new(0),
        })
    }

    pub(crate) fn started(&self) {
        self.emit(Phase::Started, None);
    }

    pub(crate) fn chunk_started(&self, index: u32) {
        self.emit(Phase::ChunkStarted, Some(index));
    }

    pub(crate) fn advance(&self, chunk: Option<u32>, bytes: u64) {
        self.downloaded.fetch_add(bytes, Ordering::Relaxed);
        self.emit(Phase::Progress, chunk);
    }

    pub(crate) fn chunk_finished(&self, index: u32) {
        self.emit(Phase::ChunkFinished, Some(index));
    }

    pub(crate) fn finished(&self) {
        self.emit(Phase::Finished, None);
    }

    fn emit(&self, phase: Phase, chunk: Option<u32>) {
        if let Some(ref callback) = self.callback {
            callback(&ProgressEvent {
                phase,
                total_size: self.total_size,
                chunk,
                downloaded: self.downloaded.load(Ordering::Relaxed),
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn test_reporter_accumulates_bytes() {
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&events);
        let callback: ProgressCallback = Arc::new(move |event: &ProgressEvent| {
            sink.lock().unwrap().push(*event);
        });

        let reporter = Reporter::new(Some(callback), Some(30));
        reporter.started();
        reporter.chunk_started(1);
        reporter.advance(Some(1), 10);
        reporter.advance(Some(0), 20);
        reporter.chunk_finished(1);
        reporter.finished();

        let events = events.lock().unwrap();
        let phases: Vec<Phase> = events.iter().map(|e| e.phase).collect();
        assert_eq!(
            phases,
            vec![
                Phase::Started,
                Phase::ChunkStarted,
                Phase::Progress,
                Phase::Progress,
                Phase::ChunkFinished,
                Phase::Finished,
            ]
        );
        assert_eq!(events[2].downloaded, 10);
        assert_eq!(events[3].chunk, Some(0));
        let last = events.last().unwrap();
        assert_eq!(last.downloaded, 30);
        assert_eq!(last.total_size, Some(30));
        assert_eq!(last.chunk, None);
    }

    #[test]
    fn test_reporter_without_callback_is_silent() {
        let reporter = Reporter::new(None, None);
        reporter.advance(None, 5);
        reporter.finished();
    }
}
