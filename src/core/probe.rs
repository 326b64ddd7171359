//! Range-capability detection
//!
//! The probe is a plain GET: its headers decide the strategy, and its body is
//! reused as-is when the download falls back to a single stream.

use log::debug;
use reqwest::header::{HeaderMap, ACCEPT_RANGES, CONTENT_LENGTH};
use reqwest::{Client, Response, Url};

use crate::core::error::{Error, Result};

/// The only `Accept-Ranges` value that enables chunking
const ACCEPT_RANGES_BYTES: &str = "bytes";

/// What the server told us about the resource
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    /// From `Content-Length`; `None` when absent or unparsable
    pub total_size: Option<u64>,
    /// `Accept-Ranges: bytes` was present
    pub supports_ranges: bool,
}

/// Reads size and range support from response headers
pub fn inspect_headers(headers: &HeaderMap) -> Capabilities {
    let total_size = headers
        .get(CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok());

    let supports_ranges = headers
        .get(ACCEPT_RANGES)
        .is_some_and(|v| v.to_str().unwrap_or("") == ACCEPT_RANGES_BYTES);

    Capabilities {
        total_size,
        supports_ranges,
    }
}

/// Issues the initial GET and returns the still-open response with its capabilities
pub async fn probe(client: &Client, url: &Url) -> Result<(Response, Capabilities)> {
    let response = client.get(url.clone()).send().await?;

    let status = response.status();
    if !status.is_success() {
        return Err(Error::RemoteError(format!(
            "Failed to get file info: {status} for {url}"
        )));
    }

    let caps = inspect_headers(response.headers());
    debug!(
        "Probe {url}: status {status}, size {:?}, ranges {}",
        caps.total_size, caps.supports_ranges
    );

    Ok((response, caps))
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.insert(*name, HeaderValue::from_static(value));
        }
        map
    }

    #[test]
    fn test_inspect_ranges_and_size() {
        let caps = inspect_headers(&headers(&[
            ("content-length", "1000000"),
            ("accept-ranges", "bytes"),
        ]));
        assert_eq!(caps.total_size, Some(1_000_000));
        assert!(caps.supports_ranges);
    }

    #[test]
    fn test_inspect_missing_headers() {
        let caps = inspect_headers(&HeaderMap::new());
        assert_eq!(caps.total_size, None);
        assert!(!caps.supports_ranges);
    }

    #[test]
    fn test_inspect_other_range_units_disable_chunking() {
        for value in ["none", "Bytes", "BYTES", "bytes, items", ""] {
            let mut map = HeaderMap::new();
            map.insert(ACCEPT_RANGES, HeaderValue::from_str(value).unwrap());
            assert!(!inspect_headers(&map).supports_ranges, "value {value:?}");
        }
    }

    #[test]
    fn test_inspect_unparsable_length_is_unknown() {
        let caps = inspect_headers(&headers(&[
            ("content-length", "lots"),
            ("accept-ranges", "bytes"),
        ]));
        assert_eq!(caps.total_size, None);
        assert!(caps.supports_ranges);
    }

    #[tokio::test]
    async fn test_probe_rejects_error_status() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/missing.bin"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&mock_server)
            .await;

        let url = Url::parse(&format!("{}/missing.bin", mock_server.uri())).unwrap();
        let result = probe(&Client::new(), &url).await;

        match result {
            Err(Error::RemoteError(msg)) => assert!(msg.contains("404"), "{msg}"),
            other => panic!("Expected RemoteError, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_probe_reads_headers_and_keeps_body() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/file.bin"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("accept-ranges", "bytes")
                    .set_body_bytes(b"hello world".to_vec()),
            )
            .mount(&mock_server)
            .await;

        let url = Url::parse(&format!("{}/file.bin", mock_server.uri())).unwrap();
        let (response, caps) = probe(&Client::new(), &url).await.unwrap();

        assert!(caps.supports_ranges);
        assert_eq!(caps.total_size, Some(11));
        assert_eq!(response.bytes().await.unwrap().as_ref(), b"hello world");
    }
}
