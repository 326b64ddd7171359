//! Core download functionality for rangefetch
//!
//! The [`Downloader`] probes the resource, decides between a single streamed
//! transfer and a chunked parallel transfer, and drives the chosen path to
//! completion.
//!
//! Failure guarantees differ between the two paths:
//! - chunked downloads are assembled in a scratch file and renamed into place
//!   only after every chunk arrived, so a failed download leaves no
//!   destination file behind;
//! - single-stream downloads write straight into the destination, so a failure
//!   part-way may leave a truncated file. The error is still returned.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use log::{debug, info};
use reqwest::{Client, ClientBuilder, Response, Url};
use serde::Serialize;
use tokio::io::AsyncWrite;

use crate::core::coordinator::Coordinator;
use crate::core::error::{Error, Result};
use crate::core::fetch::{ChunkFetcher, ChunkResult};
use crate::core::merge::merge_chunks;
use crate::core::plan::{ChunkTask, DownloadPlan, Strategy};
use crate::core::probe::probe;
use crate::core::progress::Reporter;
use crate::core::source::resolve_url;
use crate::core::stream::{create_http_stream, pump, DownloadOptions};

/// Transport settings for the HTTP client
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub connect_timeout: Duration,
    pub tcp_keepalive: Duration,
    pub pool_idle_timeout: Duration,
    pub user_agent: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            tcp_keepalive: Duration::from_secs(60),
            pool_idle_timeout: Duration::from_secs(90),
            user_agent: format!("rangefetch/{}", env!("RANGEFETCH_VERSION")),
        }
    }
}

impl ClientConfig {
    /// Builds the client. No overall request timeout is set: chunk bodies may
    /// legitimately take longer than any fixed limit.
    pub fn build(&self) -> Result<Client> {
        ClientBuilder::new()
            .connect_timeout(self.connect_timeout)
            .tcp_keepalive(self.tcp_keepalive)
            .pool_idle_timeout(self.pool_idle_timeout)
            .user_agent(self.user_agent.clone())
            .build()
            .map_err(|e| Error::RemoteError(format!("Failed to create HTTP client: {e}")))
    }
}

/// How a finished download was carried out
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    SingleStream,
    Chunked,
}

/// Summary of a successful download
#[derive(Debug, Clone, Serialize)]
pub struct DownloadReport {
    pub url: String,
    pub bytes_written: u64,
    pub total_size: Option<u64>,
    pub strategy: StrategyKind,
    pub chunks: usize,
    pub elapsed_ms: u64,
}

/// Download states; each is entered at most once per download
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum State {
    Probing,
    SingleStreaming,
    Planning,
    Fetching,
    Merging,
    Done,
    Failed,
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Tracks and logs state transitions of one download
struct Transitions<'a> {
    url: &'a Url,
    state: State,
}

impl<'a> Transitions<'a> {
    fn start(url: &'a Url) -> Self {
        debug!("{url}: {}", State::Probing);
        Self {
            url,
            state: State::Probing,
        }
    }

    fn enter(&mut self, next: State) {
        debug_assert!(next > self.state, "state {next} re-entered after {}", self.state);
        debug!("{}: {} -> {next}", self.url, self.state);
        self.state = next;
    }

    fn finish<T>(mut self, result: Result<T>) -> Result<T> {
        match &result {
            Ok(_) => self.enter(State::Done),
            Err(err) => {
                debug!("{}: failed in {}: {err}", self.url, self.state);
                self.enter(State::Failed);
            }
        }
        result
    }
}

/// Where the bytes end up
enum Destination<'w, W: ?Sized> {
    File(&'w Path),
    Writer(&'w mut W),
}

/// High-level downloader; cheap to clone, reusable across downloads
#[derive(Clone)]
pub struct Downloader {
    client: Client,
}

impl Downloader {
    /// Create a new downloader with default transport settings
    pub fn new() -> Result<Self> {
        Self::with_config(&ClientConfig::default())
    }

    /// Create a new downloader with custom transport settings
    pub fn with_config(config: &ClientConfig) -> Result<Self> {
        Ok(Self {
            client: config.build()?,
        })
    }

    /// Use an existing client
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    /// Download `url` into the file at `file_path`.
    ///
    /// On the chunked path the file only appears once it is complete. On the
    /// single-stream path a failed transfer may leave a partial file.
    pub async fn download_to_file(
        &self,
        url: &str,
        file_path: impl AsRef<Path>,
        options: &DownloadOptions,
    ) -> Result<DownloadReport> {
        let url = resolve_url(url)?;
        self.run::<tokio::fs::File>(url, Destination::File(file_path.as_ref()), options)
            .await
    }

    /// Download `url` into an arbitrary writer.
    ///
    /// On the chunked path the writer receives nothing unless every chunk was
    /// fetched; a failure during the final copy may still leave it partially
    /// written.
    pub async fn download_to_writer<W>(
        &self,
        url: &str,
        writer: &mut W,
        options: &DownloadOptions,
    ) -> Result<DownloadReport>
    where
        W: AsyncWrite + Unpin + Send + ?Sized,
    {
        let url = resolve_url(url)?;
        self.run(url, Destination::Writer(writer), options).await
    }

    async fn run<W>(
        &self,
        url: Url,
        destination: Destination<'_, W>,
        options: &DownloadOptions,
    ) -> Result<DownloadReport>
    where
        W: AsyncWrite + Unpin + Send + ?Sized,
    {
        let started = Instant::now();
        let mut transitions = Transitions::start(&url);
        let result = self
            .execute(&url, destination, options, &mut transitions)
            .await;
        let result = transitions.finish(result);

        result.map(|(plan, bytes_written)| DownloadReport {
            url: url.to_string(),
            bytes_written,
            total_size: plan.total_size,
            strategy: match &plan.strategy {
                Strategy::SingleStream => StrategyKind::SingleStream,
                Strategy::Chunked(_) => StrategyKind::Chunked,
            },
            chunks: plan.chunk_count(),
            elapsed_ms: started.elapsed().as_millis() as u64,
        })
    }

    async fn execute<W>(
        &self,
        url: &Url,
        destination: Destination<'_, W>,
        options: &DownloadOptions,
        transitions: &mut Transitions<'_>,
    ) -> Result<(DownloadPlan, u64)>
    where
        W: AsyncWrite + Unpin + Send + ?Sized,
    {
        let (response, caps) = probe(&self.client, url).await?;
        let plan = DownloadPlan::from_capabilities(&caps, options.max_connections);
        let reporter = Reporter::new(options.progress.clone(), plan.total_size);

        let bytes_written = match &plan.strategy {
            Strategy::SingleStream => {
                transitions.enter(State::SingleStreaming);
                info!(
                    "Single-stream download (ranges: {}, size: {:?})",
                    caps.supports_ranges, caps.total_size
                );
                reporter.started();
                self.stream_single(response, destination, options, &reporter)
                    .await?
            }
            Strategy::Chunked(tasks) => {
                transitions.enter(State::Planning);
                // Range requests replace the probe body
                drop(response);
                info!(
                    "Chunked download: {} bytes in {} chunk(s)",
                    plan.total_size.unwrap_or(0),
                    tasks.len()
                );
                reporter.started();
                self.download_chunked(url, tasks, destination, options, &reporter, transitions)
                    .await?
            }
        };

        reporter.finished();
        Ok((plan, bytes_written))
    }

    async fn stream_single<W>(
        &self,
        response: Response,
        destination: Destination<'_, W>,
        options: &DownloadOptions,
        reporter: &Arc<Reporter>,
    ) -> Result<u64>
    where
        W: AsyncWrite + Unpin + Send + ?Sized,
    {
        let mut body = create_http_stream(response);
        let on_bytes = |n| reporter.advance(None, n);

        match destination {
            Destination::File(path) => {
                let mut file = tokio::fs::File::create(path).await?;
                pump(&mut body, &mut file, options.buffer_size, on_bytes).await
            }
            Destination::Writer(writer) => {
                pump(&mut body, writer, options.buffer_size, on_bytes).await
            }
        }
    }

    async fn download_chunked<W>(
        &self,
        url: &Url,
        tasks: &[ChunkTask],
        destination: Destination<'_, W>,
        options: &DownloadOptions,
        reporter: &Arc<Reporter>,
        transitions: &mut Transitions<'_>,
    ) -> Result<u64>
    where
        W: AsyncWrite + Unpin + Send + ?Sized,
    {
        let scratch_dir = scratch_dir_for(&destination, options);

        transitions.enter(State::Fetching);
        let results = if tasks.is_empty() {
            Vec::new()
        } else {
            let fetcher = ChunkFetcher::new(
                self.client.clone(),
                url.clone(),
                options.buffer_size,
                Arc::clone(reporter),
            );
            Coordinator::new(fetcher, scratch_dir.clone())
                .run(tasks)
                .await?
        };

        transitions.enter(State::Merging);
        match destination {
            Destination::File(path) => merge_into_file(results, path).await,
            Destination::Writer(writer) => merge_chunks(results, writer).await,
        }
    }
}

/// Merges into a scratch file beside `path` and renames it into place on success
async fn merge_into_file(results: Vec<ChunkResult>, path: &Path) -> Result<u64> {
    let parent = parent_dir(path);
    let staging = tempfile::Builder::new()
        .prefix(".rangefetch-")
        .suffix(".partial")
        .tempfile_in(&parent)?;

    let mut file = tokio::fs::File::from_std(staging.as_file().try_clone()?);
    let total = merge_chunks(results, &mut file).await?;
    file.sync_all().await.map_err(Error::MergeError)?;
    drop(file);

    staging
        .persist(path)
        .map_err(|e| Error::SinkError(e.error))?;
    debug!("Renamed staging file to {}", path.display());
    Ok(total)
}

fn scratch_dir_for<W: ?Sized>(destination: &Destination<'_, W>, options: &DownloadOptions) -> PathBuf {
    if let Some(dir) = &options.scratch_dir {
        return dir.clone();
    }
    match destination {
        Destination::File(path) => parent_dir(path),
        Destination::Writer(_) => std::env::temp_dir(),
    }
}

fn parent_dir(path: &Path) -> PathBuf {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}
