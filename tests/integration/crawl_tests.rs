//! Integration tests for the crawler
//!
//! These tests use wiremock to create mock HTTP servers and run the crawl
//! scheduler and the reqwest fetcher end-to-end.

use image_trawler::config::{parse_config, CrawlSettings, FetcherConfig};
use image_trawler::crawler::{
    extract, CrawlScheduler, FetchError, HttpFetcher, ImageFetcher, PageFetcher,
};
use image_trawler::images::{fetch_selected, ImageType};
use image_trawler::state::Severity;
use image_trawler::CrawlStatus;
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Fetcher settings with short timeouts and no automatic retries
fn fetcher_config() -> FetcherConfig {
    FetcherConfig {
        page_timeout_secs: 5,
        image_timeout_secs: 5,
        image_retries: 0,
        retry_backoff_ms: 0,
        ..FetcherConfig::default()
    }
}

fn fetcher() -> HttpFetcher {
    HttpFetcher::new(&fetcher_config()).expect("Failed to build fetcher")
}

/// Crawl settings without delays
fn settings(max_depth: u32, max_pages: u32) -> CrawlSettings {
    CrawlSettings {
        max_depth,
        max_pages,
        delay_between_requests_ms: 0,
        settle_window_ms: 0,
        ..CrawlSettings::default()
    }
}

async fn mount_page(server: &MockServer, page_path: &str, body: &str) {
    Mock::given(method("GET"))
        .and(path(page_path))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(server)
        .await;
}

/// Paths of every request the mock server received, in order
async fn requested_paths(server: &MockServer) -> Vec<String> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .map(|request| request.url.path().to_string())
        .collect()
}

#[tokio::test]
async fn test_seed_at_depth_one_is_terminal() {
    let mock_server = MockServer::start().await;
    mount_page(
        &mock_server,
        "/",
        r#"<html><body>
            <a href="/one">One</a>
            <a href="/two">Two</a>
            <a href="/three">Three</a>
            <img src="/photo.jpg" width="800" height="600">
            <img src="data:image/png;base64,iVBORw0KGgo=">
        </body></html>"#,
    )
    .await;

    let mut scheduler = CrawlScheduler::new(fetcher());
    let seed = format!("{}/", mock_server.uri());
    let status = scheduler.crawl(&seed, &settings(1, 5)).await.unwrap();

    assert_eq!(status, CrawlStatus::Completed);
    let session = scheduler.session();
    assert_eq!(session.pages_visited(), 1);
    assert_eq!(session.images().len(), 1);

    let image = &session.images().records()[0];
    assert_eq!(image.url, format!("{}/photo.jpg", mock_server.uri()));
    assert_eq!(image.filename, "photo.jpg");
    assert_eq!(image.width, Some(800));
    assert_eq!(image.height, Some(600));

    // No link on the seed page was followed
    assert_eq!(requested_paths(&mock_server).await, vec!["/"]);
}

#[tokio::test]
async fn test_self_referencing_page_does_not_loop() {
    let mock_server = MockServer::start().await;
    let body = r#"<a href="/">Home</a>"#.repeat(20);
    mount_page(&mock_server, "/", &body).await;

    let mut scheduler = CrawlScheduler::new(fetcher());
    let seed = format!("{}/", mock_server.uri());
    let status = scheduler.crawl(&seed, &settings(3, 50)).await.unwrap();

    assert_eq!(status, CrawlStatus::Completed);
    let session = scheduler.session();
    assert_eq!(session.pages_visited(), 1);
    assert!(session.frontier().len() <= 1);
    assert!(session
        .log()
        .with_severity(Severity::Warning)
        .any(|e| e.message.contains("Loop suppression")));
    assert_eq!(requested_paths(&mock_server).await.len(), 1);
}

#[tokio::test]
async fn test_external_links_excluded() {
    let mock_server = MockServer::start().await;
    let body = r#"<a href="https://other.com/x">Elsewhere</a><a href="/local">Local</a>"#;
    mount_page(&mock_server, "/", body).await;
    mount_page(&mock_server, "/local", "<p>local</p>").await;

    let seed = Url::parse(&format!("{}/", mock_server.uri())).unwrap();
    let extracted = extract(body, &seed, &settings(2, 10));
    assert_eq!(extracted.links.len(), 1);
    assert!(extracted
        .links
        .iter()
        .all(|link| link.host_str() != Some("other.com")));

    let mut scheduler = CrawlScheduler::new(fetcher());
    scheduler
        .crawl(seed.as_str(), &settings(2, 10))
        .await
        .unwrap();

    assert_eq!(scheduler.session().pages_visited(), 2);
    assert_eq!(requested_paths(&mock_server).await, vec!["/", "/local"]);
}

#[tokio::test]
async fn test_thumbnail_fallback_chain_succeeds() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/vi/abc123/mqdefault.jpg"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "image/jpeg")
                .set_body_bytes(vec![0xFF, 0xD8, 0xFF]),
        )
        .mount(&mock_server)
        .await;

    let fetcher = fetcher().with_thumbnail_hosts(["127.0.0.1"]);
    let url = Url::parse(&format!("{}/vi/abc123/hqdefault.jpg", mock_server.uri())).unwrap();

    let image = fetcher.fetch_image_bytes(&url).await.unwrap();

    assert_eq!(image.url.path(), "/vi/abc123/mqdefault.jpg");
    assert_eq!(image.content_type, "image/jpeg");
    assert_eq!(image.bytes, vec![0xFF, 0xD8, 0xFF]);
    assert_eq!(
        requested_paths(&mock_server).await,
        vec![
            "/vi/abc123/hqdefault.jpg",
            "/vi/abc123/maxresdefault.jpg",
            "/vi/abc123/mqdefault.jpg",
        ]
    );
}

#[tokio::test]
async fn test_thumbnail_fallback_chain_exhausted() {
    let mock_server = MockServer::start().await;

    let fetcher = fetcher().with_thumbnail_hosts(["127.0.0.1"]);
    let url = Url::parse(&format!("{}/vi/abc123/hqdefault.jpg", mock_server.uri())).unwrap();

    let result = fetcher.fetch_image_bytes(&url).await;

    assert!(matches!(result, Err(FetchError::Status { status: 404, .. })));
    assert_eq!(
        requested_paths(&mock_server).await,
        vec![
            "/vi/abc123/hqdefault.jpg",
            "/vi/abc123/maxresdefault.jpg",
            "/vi/abc123/mqdefault.jpg",
            "/vi/abc123/sddefault.jpg",
            "/vi/abc123/default.jpg",
        ]
    );
}

#[tokio::test]
async fn test_shared_image_registered_once() {
    let mock_server = MockServer::start().await;
    mount_page(
        &mock_server,
        "/",
        r#"<img src="/a.png"><a href="/second">Second</a>"#,
    )
    .await;
    mount_page(&mock_server, "/second", r#"<img src="/a.png"><img src="/b.gif">"#).await;

    let mut scheduler = CrawlScheduler::new(fetcher());
    let seed = format!("{}/", mock_server.uri());
    scheduler.crawl(&seed, &settings(2, 10)).await.unwrap();

    let images = scheduler.session().images();
    assert_eq!(images.len(), 2);

    let shared = format!("{}/a.png", mock_server.uri());
    assert_eq!(
        images.records().iter().filter(|r| r.url == shared).count(),
        1
    );
    assert_eq!(images.get(&shared).unwrap().source_url, seed);
}

#[tokio::test]
async fn test_failed_page_counts_as_visited() {
    let mock_server = MockServer::start().await;
    mount_page(
        &mock_server,
        "/",
        r#"<a href="/missing">Missing</a><a href="/present">Present</a>"#,
    )
    .await;
    mount_page(&mock_server, "/present", "<p>here</p>").await;

    let mut scheduler = CrawlScheduler::new(fetcher());
    let seed = format!("{}/", mock_server.uri());
    let status = scheduler.crawl(&seed, &settings(2, 10)).await.unwrap();

    assert_eq!(status, CrawlStatus::Completed);
    let session = scheduler.session();
    assert_eq!(session.pages_visited(), 3);
    assert_eq!(session.pages_failed(), 1);
    assert!(session
        .log()
        .with_severity(Severity::Error)
        .any(|e| e.message.contains("HTTP 404")));
}

#[tokio::test]
async fn test_page_fetch_follows_redirects() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/old"))
        .respond_with(
            ResponseTemplate::new(301)
                .insert_header("location", format!("{}/new", mock_server.uri()).as_str()),
        )
        .mount(&mock_server)
        .await;
    mount_page(&mock_server, "/new", "<p>moved</p>").await;

    let url = Url::parse(&format!("{}/old", mock_server.uri())).unwrap();
    let response = fetcher().fetch_page(&url).await.unwrap();

    assert_eq!(response.status, 200);
    assert_eq!(response.final_url.path(), "/new");
    assert!(response.body.contains("moved"));
}

#[tokio::test]
async fn test_image_fetch_retries_server_errors() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/flaky.png"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&mock_server)
        .await;

    let config = FetcherConfig {
        image_retries: 2,
        ..fetcher_config()
    };
    let fetcher = HttpFetcher::new(&config).unwrap();
    let url = Url::parse(&format!("{}/flaky.png", mock_server.uri())).unwrap();

    let result = fetcher.fetch_image_bytes(&url).await;

    assert!(matches!(result, Err(FetchError::Status { status: 500, .. })));
    assert_eq!(requested_paths(&mock_server).await.len(), 3);
}

#[tokio::test]
async fn test_svg_served_as_text() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/logo.svg"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<svg></svg>"))
        .mount(&mock_server)
        .await;

    let url = Url::parse(&format!("{}/logo.svg", mock_server.uri())).unwrap();
    let image = fetcher().fetch_image_bytes(&url).await.unwrap();

    assert_eq!(image.content_type, "image/svg+xml");
    assert_eq!(image.bytes, b"<svg></svg>".to_vec());
}

#[tokio::test]
async fn test_fetch_selected_after_crawl() {
    let mock_server = MockServer::start().await;
    mount_page(
        &mock_server,
        "/",
        r#"<img src="/ok.png"><img src="/gone.png"><img src="/skipped.png">"#,
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/ok.png"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "image/png")
                .set_body_bytes(vec![0x89, 0x50, 0x4E, 0x47]),
        )
        .mount(&mock_server)
        .await;

    let fetcher = fetcher();
    let mut scheduler = CrawlScheduler::new(fetcher.clone());
    let seed = format!("{}/", mock_server.uri());
    let crawl_settings = CrawlSettings {
        max_image_retries: 1,
        ..settings(1, 5)
    };
    scheduler.crawl(&seed, &crawl_settings).await.unwrap();

    let skipped = format!("{}/skipped.png", mock_server.uri());
    scheduler.images_mut().set_selected(&skipped, false).unwrap();

    let report = fetch_selected(&fetcher, scheduler.images_mut(), 2).await;

    assert_eq!(report.fetched.len(), 1);
    assert_eq!(report.fetched[0].content_type, "image/png");
    assert_eq!(report.retries, 1);

    let gone = format!("{}/gone.png", mock_server.uri());
    assert_eq!(report.failed, vec![gone.clone()]);

    let record = scheduler.session().images().get(&gone).unwrap();
    assert!(record.load_failed);
    assert_eq!(record.retry_count, 1);

    let paths = requested_paths(&mock_server).await;
    assert!(!paths.contains(&"/skipped.png".to_string()));
    assert_eq!(paths.iter().filter(|p| *p == "/gone.png").count(), 2);
}

#[tokio::test]
async fn test_crawl_from_config() {
    let mock_server = MockServer::start().await;
    mount_page(&mock_server, "/", r#"<img src="/hero.webp"><a href="/next">Next</a>"#).await;
    mount_page(&mock_server, "/next", r#"<img src="/icon.svg">"#).await;

    let toml = format!(
        r#"
seed = "{}/"

[crawler]
max-depth = 2
max-pages = 10
include-external-domains = false
delay-between-requests-ms = 0
include-svg-images = false
max-image-retries = 0
settle-window-ms = 0

[fetcher]
page-timeout-secs = 5
"#,
        mock_server.uri()
    );
    let config = parse_config(&toml).unwrap();

    let session = image_trawler::crawler::crawl(&config).await.unwrap();

    assert_eq!(session.status(), CrawlStatus::Completed);
    assert_eq!(session.pages_visited(), 2);
    assert_eq!(session.images().len(), 1);
    assert_eq!(session.images().records()[0].image_type, ImageType::Webp);
}
