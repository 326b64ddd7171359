//! Mock HTTP server that serves a byte payload and honours `Range` requests

use std::sync::Arc;
use std::time::Duration;

use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

const FILE_PATH: &str = "/file.bin";

/// Builder for a mock resource with optional per-range failures and delays
#[derive(Clone)]
pub(crate) struct RangeServer {
    data: Arc<Vec<u8>>,
    accept_ranges: bool,
    failing_starts: Vec<u64>,
    delays: Vec<(u64, Duration)>,
}

impl RangeServer {
    pub(crate) fn new(data: Vec<u8>) -> Self {
        Self {
            data: Arc::new(data),
            accept_ranges: true,
            failing_starts: Vec::new(),
            delays: Vec::new(),
        }
    }

    /// Deterministic payload where neighbouring chunks differ
    pub(crate) fn pattern(len: usize) -> Vec<u8> {
        (0..len).map(|i| ((i * 31 + i / 251) % 256) as u8).collect()
    }

    /// Omit `Accept-Ranges` from full responses
    pub(crate) fn without_ranges(mut self) -> Self {
        self.accept_ranges = false;
        self
    }

    /// Answer 500 to range requests starting at `start`
    pub(crate) fn failing_at(mut self, start: u64) -> Self {
        self.failing_starts.push(start);
        self
    }

    /// Hold range responses starting at `start` back for `delay`
    pub(crate) fn delayed_at(mut self, start: u64, delay: Duration) -> Self {
        self.delays.push((start, delay));
        self
    }

    pub(crate) async fn start(self) -> RunningServer {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(FILE_PATH))
            .respond_with(self)
            .mount(&server)
            .await;
        RunningServer { server }
    }

    fn parse_range(value: &str) -> Option<(u64, u64)> {
        let (start, end) = value.strip_prefix("bytes=")?.split_once('-')?;
        Some((start.parse().ok()?, end.parse().ok()?))
    }
}

impl Respond for RangeServer {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let len = self.data.len() as u64;
        let range = request
            .headers
            .get("range")
            .and_then(|v| v.to_str().ok())
            .and_then(Self::parse_range);

        match range {
            Some((start, end_inclusive)) => {
                if self.failing_starts.contains(&start) {
                    return ResponseTemplate::new(500);
                }
                let end = (end_inclusive + 1).min(len);
                let mut template = ResponseTemplate::new(206)
                    .insert_header("content-range", format!("bytes {start}-{}/{len}", end - 1).as_str())
                    .set_body_bytes(self.data[start as usize..end as usize].to_vec());
                if let Some((_, delay)) = self.delays.iter().find(|(s, _)| *s == start) {
                    template = template.set_delay(*delay);
                }
                template
            }
            None => {
                let mut template = ResponseTemplate::new(200).set_body_bytes(self.data.to_vec());
                if self.accept_ranges {
                    template = template.insert_header("accept-ranges", "bytes");
                }
                template
            }
        }
    }
}

pub(crate) struct RunningServer {
    server: MockServer,
}

impl RunningServer {
    pub(crate) fn url(&self) -> String {
        format!("{}{}", self.server.uri(), FILE_PATH)
    }

    /// `Range` header of every ranged request received, sorted
    pub(crate) async fn range_requests(&self) -> Vec<String> {
        let mut ranges: Vec<String> = self
            .requests()
            .await
            .iter()
            .filter_map(|r| r.headers.get("range"))
            .filter_map(|v| v.to_str().ok().map(str::to_string))
            .collect();
        ranges.sort();
        ranges
    }

    pub(crate) async fn get_count(&self) -> usize {
        self.requests()
            .await
            .iter()
            .filter(|r| r.method.as_str() == "GET")
            .count()
    }

    async fn requests(&self) -> Vec<Request> {
        self.server.received_requests().await.unwrap_or_default()
    }
}
