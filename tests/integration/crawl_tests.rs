//! Integration tests for the crawler
//!
//! These tests use wiremock to create mock HTTP servers and run the full
//! crawl cycle end-to-end against on-disk stores.

use driftnet::config::{Config, CrawlerConfig, FetchConfig, StorageConfig};
use driftnet::crawler::Coordinator;
use driftnet::storage::{FrontierStore, PageStore, SqliteFrontierStore, SqlitePageStore};
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a test configuration with stores inside `dir`
fn create_test_config(dir: &TempDir, workers: usize, budget: u32, seeds: Vec<String>) -> Config {
    Config {
        crawler: CrawlerConfig {
            workers,
            fetch_budget: budget,
            initial_seeds: 1,
            flush_interval: 2,
            min_flush_batch: 1,
            iteration_delay_ms: 0,
        },
        fetch: FetchConfig {
            user_agent: "TestBot/1.0".to_string(),
            timeout_secs: 5,
            connect_timeout_secs: 2,
            max_redirects: 5,
        },
        storage: StorageConfig {
            frontier_path: dir.path().join("url.db").to_string_lossy().into_owned(),
            pages_path: dir.path().join("pages.db").to_string_lossy().into_owned(),
        },
        seeds,
    }
}

fn open_stores(dir: &TempDir) -> (SqliteFrontierStore, SqlitePageStore) {
    (
        SqliteFrontierStore::open(&dir.path().join("url.db")).expect("Failed to open frontier"),
        SqlitePageStore::open(&dir.path().join("pages.db")).expect("Failed to open pages"),
    )
}

fn html(body: String) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(body, "text/html")
}

#[tokio::test]
async fn test_full_crawl_follows_domain_roots() {
    let home = MockServer::start().await;
    let other = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html(format!(
            r#"<html><head>
                <title>Home</title>
                <meta name="description" content="The home page">
                <meta name="keywords" content="alpha, beta">
            </head><body>
                <h1>Welcome</h1>
                <img src="/logo.png" alt="Logo">
                <a href="/about">About</a>
                <a href="{}/elsewhere">Elsewhere</a>
            </body></html>"#,
            other.uri()
        )))
        .expect(1)
        .mount(&home)
        .await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html(
            r#"<html><head><title>Other</title></head><body>Content</body></html>"#.to_string(),
        ))
        .expect(1)
        .mount(&other)
        .await;

    let dir = TempDir::new().expect("Failed to create temp dir");
    let config = create_test_config(&dir, 1, 10, vec![home.uri()]);

    let report = Coordinator::new(config)
        .expect("Failed to create coordinator")
        .run()
        .await
        .expect("Crawl failed");

    assert_eq!(report.records_produced(), 2);

    let (frontier, pages) = open_stores(&dir);

    assert!(frontier.is_discovered(&home.uri()).unwrap());
    assert!(frontier.is_discovered(&other.uri()).unwrap());

    // Child URLs land in the frontier but are never fetched in this run
    let about = frontier
        .get_record(&format!("{}/about", home.uri()))
        .unwrap()
        .expect("child URL should be in the frontier");
    assert!(!about.discovered);
    assert!(!about.claimed);

    let records = pages.all_pages().unwrap();
    assert_eq!(pages.count_pages().unwrap(), 2);

    let home_record = records
        .iter()
        .find(|r| r.url == home.uri())
        .expect("home page record");
    assert_eq!(home_record.title, "Home");
    assert_eq!(home_record.description, "The home page");
    assert_eq!(home_record.keywords, vec!["alpha", "beta"]);
    assert!(home_record.headers.contains("Welcome"));
    assert!(home_record.image_captions.contains("Logo"));
    assert!(home_record
        .child_urls
        .contains(&format!("{}/elsewhere", other.uri())));
}

#[tokio::test]
async fn test_non_success_status_suppresses_retry() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().expect("Failed to create temp dir");
    let config = create_test_config(&dir, 1, 1, vec![server.uri()]);

    let report = Coordinator::new(config)
        .expect("Failed to create coordinator")
        .run()
        .await
        .expect("Crawl failed");

    assert_eq!(report.iterations(), 1);
    assert_eq!(report.failures(), 1);

    let (frontier, pages) = open_stores(&dir);
    let record = frontier.get_record(&server.uri()).unwrap().unwrap();
    assert!(record.discovered);
    assert!(!record.retry_allowed);
    assert_eq!(pages.count_pages().unwrap(), 0);
}

#[tokio::test]
async fn test_workers_converging_on_same_root() {
    let first = MockServer::start().await;
    let second = MockServer::start().await;
    let shared = MockServer::start().await;

    for server in [&first, &second] {
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(html(format!(
                r#"<a href="{}/shared">shared</a>"#,
                shared.uri()
            )))
            .mount(server)
            .await;
    }
    Mock::given(method("GET"))
        .respond_with(html("<title>Shared</title>".to_string()))
        .mount(&shared)
        .await;

    let dir = TempDir::new().expect("Failed to create temp dir");
    let config = create_test_config(&dir, 2, 5, vec![first.uri(), second.uri()]);

    let report = Coordinator::new(config)
        .expect("Failed to create coordinator")
        .run()
        .await
        .expect("Crawl failed");

    // Each worker claimed exactly one of the two seeds
    assert_eq!(report.workers.len(), 2);
    assert!(report.workers.iter().all(|w| w.seeds == 1));

    // The shared root was only ever reached by following links
    let (frontier, pages) = open_stores(&dir);
    let shared_root = frontier
        .get_record(&shared.uri())
        .unwrap()
        .expect("shared root should be recorded once");
    assert!(shared_root.discovered);
    assert!(frontier
        .is_discovered(&format!("{}/", shared.uri()))
        .unwrap());

    let shared_page = frontier
        .get_record(&format!("{}/shared", shared.uri()))
        .unwrap()
        .expect("shared child URL should be recorded");
    assert!(!shared_page.discovered);

    let shared_records = pages
        .all_pages()
        .unwrap()
        .into_iter()
        .filter(|r| r.url == shared.uri())
        .count();
    assert!(shared_records >= 1);
}

#[tokio::test]
async fn test_redirect_marks_final_root_visited() {
    let origin = MockServer::start().await;
    let target = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(301)
                .insert_header("location", format!("{}/landing", target.uri()).as_str()),
        )
        .mount(&origin)
        .await;
    Mock::given(method("GET"))
        .and(path("/landing"))
        .respond_with(html(r#"<a href="/">home</a>"#.to_string()))
        .expect(1)
        .mount(&target)
        .await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html(String::new()))
        .expect(0)
        .mount(&target)
        .await;

    let dir = TempDir::new().expect("Failed to create temp dir");
    let config = create_test_config(&dir, 1, 5, vec![origin.uri()]);

    let report = Coordinator::new(config)
        .expect("Failed to create coordinator")
        .run()
        .await
        .expect("Crawl failed");

    assert_eq!(report.iterations(), 1);

    let (frontier, pages) = open_stores(&dir);
    let records = pages.all_pages().unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].url, origin.uri());

    let landing = format!("{}/landing", target.uri());
    assert!(frontier.get_record(&landing).unwrap().is_some());
    assert!(!frontier.is_discovered(&target.uri()).unwrap());
}

#[tokio::test]
async fn test_second_run_resumes_from_persisted_frontier() {
    let home = MockServer::start().await;
    let next = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(html(format!(r#"<a href="{}/">next</a>"#, next.uri())))
        .mount(&home)
        .await;
    Mock::given(method("GET"))
        .respond_with(html("<title>Next</title>".to_string()))
        .mount(&next)
        .await;

    let dir = TempDir::new().expect("Failed to create temp dir");

    // A budget of one stops the first run before the queued root is fetched
    let first_run = create_test_config(&dir, 1, 1, vec![home.uri()]);
    Coordinator::new(first_run)
        .expect("Failed to create coordinator")
        .run()
        .await
        .expect("First crawl failed");

    assert!(next.received_requests().await.unwrap().is_empty());

    let second_run = create_test_config(&dir, 1, 5, vec![]);
    let report = Coordinator::new(second_run)
        .expect("Failed to create coordinator")
        .run()
        .await
        .expect("Second crawl failed");

    assert_eq!(report.bootstrapped, 0);
    assert!(!next.received_requests().await.unwrap().is_empty());

    let (frontier, _) = open_stores(&dir);
    assert!(frontier.get_record(&home.uri()).unwrap().unwrap().claimed);
}

#[tokio::test]
async fn test_second_run_does_not_refetch_crawled_pages() {
    let home = MockServer::start().await;
    let next = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html(format!(r#"<a href="{}/">next</a>"#, next.uri())))
        .expect(1)
        .mount(&home)
        .await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html("<title>Next</title>".to_string()))
        .expect(1)
        .mount(&next)
        .await;

    let dir = TempDir::new().expect("Failed to create temp dir");

    let first_run = create_test_config(&dir, 1, 5, vec![home.uri()]);
    let report = Coordinator::new(first_run)
        .expect("Failed to create coordinator")
        .run()
        .await
        .expect("First crawl failed");
    assert_eq!(report.records_produced(), 2);

    // Every URL fetched above, final URLs included, is already discovered
    let second_run = create_test_config(&dir, 1, 5, vec![home.uri()]);
    let report = Coordinator::new(second_run)
        .expect("Failed to create coordinator")
        .run()
        .await
        .expect("Second crawl failed");

    assert_eq!(report.iterations(), 0);
    assert_eq!(report.records_produced(), 0);

    let (frontier, pages) = open_stores(&dir);
    assert_eq!(pages.count_pages().unwrap(), 2);
    assert_eq!(frontier.stats().unwrap().available, 0);
}
