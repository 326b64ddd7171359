//! Library-level download scenarios against a local range-capable server

use std::sync::{Arc, Mutex};

use rangefetch::{plan_chunks, DownloadOptions, Downloader, Error, Phase, ProgressEvent, StrategyKind};
use tokio_test::{assert_err, assert_ok};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

/// Serves `data` and honours `Range: bytes=s-e`; ranges starting at `fail_at` get a 500
struct Ranged {
    data: Arc<Vec<u8>>,
    advertise: bool,
    fail_at: Option<u64>,
}

impl Respond for Ranged {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let range = request
            .headers
            .get("range")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("bytes="))
            .and_then(|v| v.split_once('-'))
            .and_then(|(s, e)| Some((s.parse::<u64>().ok()?, e.parse::<u64>().ok()?)));

        match range {
            Some((start, _)) if Some(start) == self.fail_at => ResponseTemplate::new(500),
            Some((start, end)) => ResponseTemplate::new(206)
                .insert_header(
                    "content-range",
                    format!("bytes {start}-{end}/{}", self.data.len()).as_str(),
                )
                .set_body_bytes(&self.data[start as usize..=end as usize]),
            None => {
                let template = ResponseTemplate::new(200).set_body_bytes(self.data.as_slice());
                if self.advertise {
                    template.insert_header("accept-ranges", "bytes")
                } else {
                    template
                }
            }
        }
    }
}

fn pattern(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
}

async fn serve(data: Vec<u8>, advertise: bool, fail_at: Option<u64>) -> (MockServer, String) {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/blob"))
        .respond_with(Ranged {
            data: Arc::new(data),
            advertise,
            fail_at,
        })
        .mount(&server)
        .await;
    let url = format!("{}/blob", server.uri());
    (server, url)
}

fn options(connections: u32) -> DownloadOptions {
    DownloadOptions {
        max_connections: connections,
        ..DownloadOptions::default()
    }
}

#[tokio::test]
async fn test_million_bytes_in_four_chunks() {
    let data = pattern(1_000_000);
    let (server, url) = serve(data.clone(), true, None).await;
    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("blob.bin");

    let events: Arc<Mutex<Vec<ProgressEvent>>> = Arc::default();
    let sink = Arc::clone(&events);
    let mut opts = options(4);
    opts.progress = Some(Arc::new(move |e: &ProgressEvent| sink.lock().unwrap().push(*e)));

    let report = assert_ok!(Downloader::new().unwrap().download_to_file(&url, &target, &opts).await);

    assert_eq!(report.strategy, StrategyKind::Chunked);
    assert_eq!(report.chunks, 4);
    assert_eq!(report.bytes_written, 1_000_000);
    assert_eq!(std::fs::read(&target).unwrap(), data);
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);

    // One probe plus four range requests
    assert_eq!(server.received_requests().await.unwrap().len(), 5);

    let events = events.lock().unwrap();
    assert_eq!(events.first().map(|e| e.phase), Some(Phase::Started));
    let last = events.last().unwrap();
    assert_eq!(last.phase, Phase::Finished);
    assert_eq!(last.downloaded, 1_000_000);
    assert_eq!(
        events.iter().filter(|e| e.phase == Phase::ChunkFinished).count(),
        4
    );
}

#[tokio::test]
async fn test_without_ranges_streams_once() {
    let data = pattern(4096);
    let (server, url) = serve(data.clone(), false, None).await;
    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("blob.bin");

    let report = assert_ok!(
        Downloader::new()
            .unwrap()
            .download_to_file(&url, &target, &options(8))
            .await
    );

    assert_eq!(report.strategy, StrategyKind::SingleStream);
    assert_eq!(std::fs::read(&target).unwrap(), data);
    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    assert!(requests[0].headers.get("range").is_none());
}

#[tokio::test]
async fn test_ten_bytes_three_ways() {
    let ranges: Vec<(u64, u64)> = plan_chunks(10, 3).iter().map(|r| (r.start, r.end)).collect();
    assert_eq!(ranges, vec![(0, 3), (3, 6), (6, 9), (9, 10)]);

    let data = b"abcdefghij".to_vec();
    let (_server, url) = serve(data.clone(), true, None).await;

    let mut out: Vec<u8> = Vec::new();
    let report = assert_ok!(
        Downloader::new()
            .unwrap()
            .download_to_writer(&url, &mut out, &options(3))
            .await
    );

    assert_eq!(out, data);
    assert_eq!(report.chunks, 4);
}

#[tokio::test]
async fn test_third_chunk_failure_aborts_download() {
    let data = pattern(1000);
    let (_server, url) = serve(data, true, Some(500)).await;
    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("blob.bin");

    let err = assert_err!(
        Downloader::new()
            .unwrap()
            .download_to_file(&url, &target, &options(4))
            .await
    );

    assert!(matches!(err, Error::FetchError { .. }), "{err}");
    assert_eq!(err.chunk(), Some(2));
    assert!(!target.exists());
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn test_malformed_url_rejected_before_network() {
    let err = assert_err!(
        Downloader::new()
            .unwrap()
            .download_to_writer("not a url", &mut Vec::<u8>::new(), &DownloadOptions::default())
            .await
    );
    assert!(matches!(err, Error::UrlError(_)));
}
