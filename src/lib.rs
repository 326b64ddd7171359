//! # Rangefetch
//!
//! Downloads a single file over HTTP. When the server answers the initial
//! request with `Accept-Ranges: bytes` and a `Content-Length`, the file is split
//! into byte ranges that are fetched concurrently and merged back in order;
//! otherwise the response body is streamed straight to the destination.
//!
//! ```no_run
//! # async fn example() -> rangefetch::Result<()> {
//! let report = rangefetch::get("https://example.com/data.bin", "data.bin").await?;
//! println!("{} bytes in {} chunk(s)", report.bytes_written, report.chunks);
//! # Ok(())
//! # }
//! ```

mod core;

use std::path::Path;

pub use crate::core::downloader::{ClientConfig, DownloadReport, Downloader, StrategyKind};
pub use crate::core::error::{Error, Result};
pub use crate::core::plan::{plan_chunks, ByteRange, ChunkTask, DownloadPlan, Strategy};
pub use crate::core::probe::{inspect_headers, Capabilities};
pub use crate::core::progress::{Phase, ProgressCallback, ProgressEvent};
pub use crate::core::stream::DownloadOptions;
pub use crate::core::{resolve_output_filename, resolve_url};
pub use reqwest::Url;

/// Download `url` to `file_path` with default options
pub async fn get(url: &str, file_path: impl AsRef<Path>) -> Result<DownloadReport> {
    get_with_options(url, file_path, DownloadOptions::default()).await
}

/// Download `url` to `file_path` with custom options
pub async fn get_with_options(
    url: &str,
    file_path: impl AsRef<Path>,
    options: DownloadOptions,
) -> Result<DownloadReport> {
    Downloader::new()?
        .download_to_file(url, file_path, &options)
        .await
}
