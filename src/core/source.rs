//! URL validation and output naming for rangefetch

use reqwest::Url;

use crate::core::error::{Error, Result};

/// Fallback file name when the URL path has no final segment
const DEFAULT_FILENAME: &str = "index.html";

/// Parses and validates a download URL; only absolute http(s) URLs with a host pass
pub fn resolve_url(raw: &str) -> Result<Url> {
    let url = Url::parse(raw.trim()).map_err(|e| Error::UrlError(format!("'{raw}': {e}")))?;

    match url.scheme() {
        "http" | "https" => {}
        scheme => {
            return Err(Error::UrlError(format!(
                "'{raw}': unsupported scheme '{scheme}' (expected http or https)"
            )))
        }
    }

    if url.host_str().map_or(true, str::is_empty) {
        return Err(Error::UrlError(format!("'{raw}': missing host")));
    }

    Ok(url)
}

/// Generates the output file name from the last path segment of the URL
pub fn resolve_output_filename(url: &Url) -> String {
    url.path_segments()
        .and_then(|mut segments| segments.next_back())
        .filter(|name| !name.is_empty())
        .map(|name| name.to_string())
        .unwrap_or_else(|| DEFAULT_FILENAME.to_string())
}
