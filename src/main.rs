//! # Rangefetch CLI
//!
//! Command-line interface for the rangefetch library.
//! Provides a curl-like interface for downloading one file over HTTP.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;
use log::error;
use rangefetch::{DownloadOptions, DownloadReport, Downloader};

mod cli;

use cli::{check_overwrite_permission, OverwriteBehavior};

/// Command-line interface for rangefetch
#[derive(Parser)]
#[command(name = "rangefetch")]
#[command(about = "HTTP file downloader with parallel byte-range transfers")]
#[command(long_about = "Downloads a single file over HTTP:
  rangefetch -u https://example.com/file.iso             # Save file.iso in the current directory
  rangefetch -u https://example.com/file.iso -d /tmp/    # Save /tmp/file.iso
  rangefetch -u https://example.com/file.iso -o out.iso  # Save to an explicit path
  rangefetch -u https://example.com/file.iso -o -        # Stream to stdout

Servers that answer with 'Accept-Ranges: bytes' and a Content-Length are
downloaded in parallel chunks (one per CPU by default, see --connections).

File Overwrite Behavior:
  By default, you'll be prompted if destination file exists
  --force                          # Overwrite without asking
  --no-clobber                     # Never overwrite, fail if file exists")]
#[command(version = env!("RANGEFETCH_VERSION"))]
struct Cli {
    /// URL of the file to download (http or https)
    #[arg(short, long)]
    url: String,

    /// Destination directory; the file name is taken from the URL
    #[arg(short, long, default_value = ".")]
    dest: PathBuf,

    /// Explicit output file path, or "-" for stdout (overrides --dest)
    #[arg(short, long)]
    output: Option<String>,

    /// Number of parallel range requests (defaults to the CPU count)
    #[arg(short, long)]
    connections: Option<u32>,

    /// Show what would be downloaded without downloading
    #[arg(long)]
    dry_run: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Force overwrite existing files without prompting
    #[arg(short, long, conflicts_with = "no_clobber")]
    force: bool,

    /// Never overwrite existing files (fail if destination exists)
    #[arg(long)]
    no_clobber: bool,

    /// Print a JSON download report on stdout when finished
    #[arg(long)]
    json: bool,
}

/// Output destination types
#[derive(Debug, PartialEq)]
enum OutputDestination {
    File(PathBuf),
    Stdout,
}

/// Resolve output destination from CLI arguments
fn resolve_output(url: &rangefetch::Url, dest: &std::path::Path, output: Option<&str>) -> OutputDestination {
    match output {
        Some("-") => OutputDestination::Stdout,
        Some(path) if !path.is_empty() => OutputDestination::File(PathBuf::from(path)),
        _ => OutputDestination::File(dest.join(rangefetch::resolve_output_filename(url))),
    }
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("❌ Error: {e:#}");
        eprintln!("\nDownload failed: {e:#}");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging to stderr
    let default_level = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .target(env_logger::Target::Stderr)
        .init();

    if cli.verbose {
        eprintln!("🚀 Rangefetch v{} starting...", env!("RANGEFETCH_VERSION"));
    }

    // Malformed URLs are rejected before anything touches the network
    let url = rangefetch::resolve_url(&cli.url)?;
    let output = resolve_output(&url, &cli.dest, cli.output.as_deref());

    if cli.json && output == OutputDestination::Stdout {
        bail!("--json cannot be combined with streaming to stdout");
    }

    if cli.dry_run {
        eprintln!("🔍 [DRY RUN] Would download: {url} to {output:?}");
        return Ok(());
    }

    let mut options = DownloadOptions::default();
    if let Some(connections) = cli.connections {
        if connections == 0 {
            bail!("--connections must be at least 1");
        }
        options.max_connections = connections;
    }

    let downloader = Downloader::new()?;
    eprintln!("🌐 URL: {url}");

    let report = match output {
        OutputDestination::File(file_path) => {
            let overwrite = OverwriteBehavior::from_flags(cli.force, cli.no_clobber);
            download_to_file(&downloader, url.as_str(), &file_path, overwrite, options).await?
        }
        OutputDestination::Stdout => {
            download_to_stdout(&downloader, url.as_str(), cli.verbose, &options).await?
        }
    };

    if cli.verbose {
        eprintln!(
            "📦 {} bytes via {:?} ({} chunk(s)) in {} ms",
            report.bytes_written, report.strategy, report.chunks, report.elapsed_ms
        );
    }
    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    }

    Ok(())
}

/// Download to a file with progress bar
async fn download_to_file(
    downloader: &Downloader,
    url: &str,
    file_path: &std::path::Path,
    overwrite: OverwriteBehavior,
    mut options: DownloadOptions,
) -> Result<DownloadReport> {
    check_overwrite_permission(file_path, overwrite)?;

    eprintln!("📁 Saving to: {}", file_path.display());

    let progress_manager = cli::ProgressManager::new(&format!("⬇️  Downloading {url}"));
    options.progress = Some(progress_manager.observer());

    let result = downloader.download_to_file(url, file_path, &options).await;
    if result.is_err() {
        progress_manager.pb.abandon();
    }
    let report = result.with_context(|| format!("downloading {url}"))?;

    eprintln!("\nDownload Successfully!");
    Ok(report)
}

/// Download to stdout (no progress bar)
async fn download_to_stdout(
    downloader: &Downloader,
    url: &str,
    verbose: bool,
    options: &DownloadOptions,
) -> Result<DownloadReport> {
    if verbose {
        eprintln!("📡 Streaming to stdout");
    }

    let mut stdout = tokio::io::stdout();
    let report = downloader
        .download_to_writer(url, &mut stdout, options)
        .await
        .with_context(|| format!("streaming {url}"))?;

    Ok(report)
}
