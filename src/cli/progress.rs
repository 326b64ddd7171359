//! CLI-specific progress handling for rangefetch
//!
//! Renders the library's progress events as an indicatif bar.

use std::sync::Arc;

use indicatif::{ProgressBar, ProgressStyle};
use rangefetch::{Phase, ProgressCallback, ProgressEvent};

const BAR_TEMPLATE: &str = "{spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {bytes}/{total_bytes} ({percent}%) {bytes_per_sec} ETA: {eta}";
const SPINNER_TEMPLATE: &str = "{spinner:.green} [{elapsed_precise}] {bytes} {bytes_per_sec}";

fn bar_style() -> ProgressStyle {
    ProgressStyle::default_bar()
        .template(BAR_TEMPLATE)
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("#>-")
}

fn spinner_style() -> ProgressStyle {
    ProgressStyle::default_spinner()
        .template(SPINNER_TEMPLATE)
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
}

/// Progress manager for a single download
pub struct ProgressManager {
    pub pb: ProgressBar,
}

impl ProgressManager {
    /// Create a new progress manager; the length is filled in from the first event
    pub fn new(message: &str) -> Self {
        let pb = ProgressBar::no_length();
        pb.set_style(spinner_style());

        // Print initial message to stderr
        eprintln!("{}", message);

        Self { pb }
    }

    /// Callback that feeds library progress events into the bar
    pub fn observer(&self) -> ProgressCallback {
        let pb = self.pb.clone();
        Arc::new(move |event: &ProgressEvent| apply_event(&pb, event))
    }
}

fn apply_event(pb: &ProgressBar, event: &ProgressEvent) {
    if let Some(total) = event.total_size {
        if pb.length() != Some(total) {
            pb.set_length(total);
            pb.set_style(bar_style());
        }
    }

    match event.phase {
        Phase::Progress => pb.set_position(event.downloaded),
        Phase::ChunkFinished => {
            if let Some(index) = event.chunk {
                pb.set_message(format!("chunk {index} done"));
            }
        }
        Phase::Finished => {
            pb.set_position(event.downloaded);
            pb.finish_with_message("✅ Download completed!");
        }
        Phase::Started | Phase::ChunkStarted => {}
    }
}
