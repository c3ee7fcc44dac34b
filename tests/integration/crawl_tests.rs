//! Integration tests for the crawler
//!
//! These tests use wiremock to create mock HTTP servers and test
//! the full crawl cycle end-to-end.

use async_trait::async_trait;
use polite_crawler::config::{Config, CrawlerConfig, StorageConfig, UserAgentConfig};
use polite_crawler::crawler::{crawl, CrawlOrchestrator, HttpFetcher, PoliteScheduler, Sleeper, StopSignal};
use polite_crawler::robots::PolicyCache;
use polite_crawler::storage::{open_storage, SqliteStorage, Storage};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Records politeness delays instead of sleeping
#[derive(Default)]
struct RecordingSleeper {
    delays: Mutex<Vec<Duration>>,
}

impl RecordingSleeper {
    fn delays(&self) -> Vec<Duration> {
        self.delays.lock().unwrap().clone()
    }
}

#[async_trait]
impl Sleeper for RecordingSleeper {
    async fn sleep(&self, delay: Duration) {
        self.delays.lock().unwrap().push(delay);
    }
}

fn create_test_config(db_path: &str, seeds: Vec<String>) -> Config {
    Config {
        seeds,
        crawler: CrawlerConfig {
            min_crawl_delay: 0,
            max_crawl_delay: 0,
            batch_size: 2,
            max_pages: None,
            max_robots_crawl_delay: 60,
        },
        user_agent: UserAgentConfig {
            crawler_name: "TestBot".to_string(),
            crawler_version: "1.0.0".to_string(),
            contact_url: "https://example.com/contact".to_string(),
            contact_email: "test@example.com".to_string(),
        },
        storage: StorageConfig {
            database_path: db_path.to_string(),
            page_table: "crawled_pages".to_string(),
            pending_table: "pending_urls".to_string(),
        },
    }
}

/// Builds an orchestrator talking HTTP, with delays recorded instead of slept
fn create_orchestrator(
    dir: &TempDir,
    sleeper: Arc<RecordingSleeper>,
    max_pages: Option<u64>,
) -> CrawlOrchestrator<SqliteStorage> {
    let db_path = dir.path().join("crawl.db");
    let config = create_test_config(&db_path.to_string_lossy(), Vec::new());

    let storage = open_storage(&config.storage).expect("Failed to open storage");
    let fetcher = Arc::new(HttpFetcher::new(&config.user_agent).expect("Failed to build client"));
    let policies = Arc::new(PolicyCache::new(fetcher.clone()));
    let crawler = CrawlerConfig {
        min_crawl_delay: 1,
        max_crawl_delay: 4,
        ..config.crawler
    };
    let scheduler = PoliteScheduler::with_seed(&crawler, sleeper, 5);

    CrawlOrchestrator::new(storage, policies, fetcher, scheduler, 2, max_pages)
}

async fn mount_robots(server: &MockServer, body: &str) {
    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(server)
        .await;
}

async fn mount_page(server: &MockServer, page: &str, html: String) {
    Mock::given(method("GET"))
        .and(path(page))
        .respond_with(ResponseTemplate::new(200).set_body_raw(html, "text/html"))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_single_iteration_respects_robots() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_robots(&server, "User-agent: *\nDisallow: /private").await;
    mount_page(
        &server,
        "/",
        r#"<html><head><title>Home</title>
           <meta name="description" content="The home page"></head>
           <body><a href="/private/page">Secret</a><a href="https://other.com/">Other</a></body></html>"#
            .to_string(),
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/private/page"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let sleeper = Arc::new(RecordingSleeper::default());
    let mut crawler = create_orchestrator(&dir, sleeper.clone(), Some(1));

    let home = format!("{}/", base);
    crawler.seed(&[home.clone()]).unwrap();
    let stats = crawler.run().await.unwrap();

    assert_eq!(stats.processed, 1);
    assert_eq!(stats.crawled, 1);

    let storage = crawler.storage();
    let record = storage.get_crawled_page(&home).unwrap().unwrap();
    assert_eq!(record.title, "Home");
    assert_eq!(record.description, "The home page");
    assert_eq!(record.rank, 0.0);

    assert!(storage.is_pending("https://other.com/").unwrap());
    assert!(!storage
        .is_pending(&format!("{}/private/page", base))
        .unwrap());
    assert_eq!(storage.count_pending_urls().unwrap(), 1);

    let delays = sleeper.delays();
    assert_eq!(delays.len(), 1);
    assert!(delays[0] >= Duration::from_secs(1) && delays[0] < Duration::from_secs(4));

    let host = url::Url::parse(&base).unwrap();
    let authority = polite_crawler::url::extract_authority(&host).unwrap();
    assert_eq!(crawler.scheduler().request_count(&authority), 1);
}

#[tokio::test]
async fn test_missing_robots_blocks_host() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200).set_body_raw("<html></html>", "text/html"))
        .expect(0)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let sleeper = Arc::new(RecordingSleeper::default());
    let mut crawler = create_orchestrator(&dir, sleeper.clone(), None);

    crawler
        .seed(&[format!("{}/", server.uri()), format!("{}/other", server.uri())])
        .unwrap();
    let stats = crawler.run().await.unwrap();

    assert_eq!(stats.skipped, 2);
    assert_eq!(stats.crawled, 0);
    assert!(sleeper.delays().is_empty());
    assert_eq!(crawler.storage().count_crawled_pages().unwrap(), 0);
}

#[tokio::test]
async fn test_malformed_robots_blocks_host() {
    let server = MockServer::start().await;

    mount_robots(&server, "User-agent: *\nCrawl-delay: soon\nAllow: /").await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200).set_body_raw("<html></html>", "text/html"))
        .expect(0)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let mut crawler = create_orchestrator(&dir, Arc::new(RecordingSleeper::default()), None);

    crawler.seed(&[format!("{}/", server.uri())]).unwrap();
    let stats = crawler.run().await.unwrap();

    assert_eq!(stats.skipped, 1);
}

#[tokio::test]
async fn test_full_crawl_single_host() {
    let server = MockServer::start().await;
    let base = server.uri();

    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(ResponseTemplate::new(200).set_body_string("User-agent: *\nAllow: /"))
        .expect(1)
        .mount(&server)
        .await;
    mount_page(
        &server,
        "/",
        format!(
            r#"<html><head><title>Home</title></head><body>
               <a href="{}/page1">Page 1</a>
               <a href="/page2#top">Page 2</a>
               <a href="/page2">Page 2 again</a>
               </body></html>"#,
            base
        ),
    )
    .await;
    mount_page(
        &server,
        "/page1",
        r#"<html><head><title>Page 1</title></head><body><a href="/">Home</a></body></html>"#
            .to_string(),
    )
    .await;
    mount_page(
        &server,
        "/page2",
        r#"<html><head><title>Page 2</title></head><body>Content 2</body></html>"#.to_string(),
    )
    .await;

    let dir = tempfile::tempdir().unwrap();
    let sleeper = Arc::new(RecordingSleeper::default());
    let mut crawler = create_orchestrator(&dir, sleeper.clone(), None);

    crawler.seed(&[format!("{}/", base)]).unwrap();
    let stats = crawler.run().await.unwrap();

    assert_eq!(stats.crawled, 3);
    assert_eq!(stats.failed, 0);
    assert_eq!(sleeper.delays().len(), 3);

    let storage = crawler.storage();
    assert_eq!(storage.count_crawled_pages().unwrap(), 3);
    assert_eq!(storage.count_pending_urls().unwrap(), 0);
    assert_eq!(
        storage
            .get_crawled_page(&format!("{}/page2", base))
            .unwrap()
            .unwrap()
            .title,
        "Page 2"
    );
}

#[tokio::test]
async fn test_crawl_delay_lengthens_wait() {
    let server = MockServer::start().await;

    mount_robots(&server, "User-agent: *\nCrawl-delay: 9").await;
    mount_page(&server, "/", "<html><title>Slow</title></html>".to_string()).await;

    let dir = tempfile::tempdir().unwrap();
    let sleeper = Arc::new(RecordingSleeper::default());
    let mut crawler = create_orchestrator(&dir, sleeper.clone(), None);

    crawler.seed(&[format!("{}/", server.uri())]).unwrap();
    crawler.run().await.unwrap();

    assert_eq!(sleeper.delays(), vec![Duration::from_secs(9)]);
}

#[tokio::test]
async fn test_non_html_page_is_not_stored() {
    let server = MockServer::start().await;

    mount_robots(&server, "User-agent: *\nDisallow:").await;
    Mock::given(method("GET"))
        .and(path("/report.pdf"))
        .respond_with(ResponseTemplate::new(200).set_body_raw("%PDF-1.4", "application/pdf"))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let mut crawler = create_orchestrator(&dir, Arc::new(RecordingSleeper::default()), None);

    crawler
        .seed(&[format!("{}/report.pdf", server.uri())])
        .unwrap();
    let stats = crawler.run().await.unwrap();

    assert_eq!(stats.failed, 1);
    assert_eq!(crawler.storage().count_crawled_pages().unwrap(), 0);
}

#[tokio::test]
async fn test_crawl_entry_point_with_config() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_robots(&server, "User-agent: *\nDisallow: /nope").await;
    mount_page(
        &server,
        "/",
        r#"<html><head><title>Start</title></head><body><a href="/nope">No</a><a href="/yes">Yes</a></body></html>"#
            .to_string(),
    )
    .await;
    mount_page(
        &server,
        "/yes",
        "<html><head><title>Yes</title></head></html>".to_string(),
    )
    .await;

    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("crawl.db");
    let config = create_test_config(&db_path.to_string_lossy(), vec![format!("{}/", base)]);

    let stats = crawl(&config, StopSignal::new()).await.unwrap();

    assert_eq!(stats.crawled, 2);
    assert_eq!(stats.links_queued, 1);

    let storage = open_storage(&config.storage).unwrap();
    assert_eq!(storage.count_crawled_pages().unwrap(), 2);
    assert!(storage
        .get_crawled_page(&format!("{}/nope", base))
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn test_stopped_crawl_leaves_frontier_intact() {
    let dir = tempfile::tempdir().unwrap();
    let mut crawler = create_orchestrator(&dir, Arc::new(RecordingSleeper::default()), None);

    crawler
        .seed(&[
            "https://example.com/a".to_string(),
            "https://example.com/b".to_string(),
        ])
        .unwrap();

    let stop = StopSignal::new();
    stop.stop();
    let mut crawler = crawler.with_stop_signal(stop);
    let stats = crawler.run().await.unwrap();

    assert_eq!(stats.processed, 0);
    assert_eq!(crawler.storage().count_pending_urls().unwrap(), 2);
}

#[tokio::test]
async fn test_malformed_line_in_other_group_does_not_block_host() {
    let server = MockServer::start().await;

    mount_robots(
        &server,
        "User-agent: googlebot\nDisallow /x\n\nUser-agent: *\nDisallow: /private",
    )
    .await;
    mount_page(&server, "/public", "<html><title>Public</title></html>".to_string()).await;

    let dir = tempfile::tempdir().unwrap();
    let mut crawler = create_orchestrator(&dir, Arc::new(RecordingSleeper::default()), None);

    crawler
        .seed(&[format!("{}/public", server.uri())])
        .unwrap();
    let stats = crawler.run().await.unwrap();

    assert_eq!(stats.crawled, 1);
    assert_eq!(stats.skipped, 0);
}

#[tokio::test]
async fn test_trap_crawl_delay_is_capped() {
    let server = MockServer::start().await;

    mount_robots(&server, "User-agent: *\nCrawl-delay: 4000000000").await;
    mount_page(&server, "/", "<html><title>Trap</title></html>".to_string()).await;

    let dir = tempfile::tempdir().unwrap();
    let sleeper = Arc::new(RecordingSleeper::default());
    let mut crawler = create_orchestrator(&dir, sleeper.clone(), None);

    crawler.seed(&[format!("{}/", server.uri())]).unwrap();
    let stats = crawler.run().await.unwrap();

    assert_eq!(stats.crawled, 1);
    assert_eq!(sleeper.delays(), vec![Duration::from_secs(60)]);
}
