//! Integration tests for the crawler
//!
//! These tests use wiremock to create mock HTTP servers and test
//! the full crawl cycle end-to-end.

use craft_spider::config::{parse_config, resolve_projects, Config, Project};
use craft_spider::crawler::{run_crawl, Coordinator, RunOptions, Spider};
use craft_spider::output::CrawlSummary;
use craft_spider::storage::{open_store, FrontierState, FrontierStore};
use std::fs;
use std::path::Path;
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Upper bound on any single crawl in these tests
const RUN_TIMEOUT: Duration = Duration::from_secs(30);

/// Creates a test configuration with one project per `(name, homepage, max_pages, threads)`
fn create_test_config(root: &Path, projects: &[(&str, &str, usize, usize)]) -> Config {
    let mut toml = format!(
        r#"
[output]
root-dir = "{}"
min-file-size = 0

[fetcher]
timeout-secs = 5
max-attempts = 3
base-delay-ms = 10

[indexer]
enabled = false

[scheduler]
dequeue-timeout-ms = 100
monitor-interval-ms = 50
"#,
        root.display()
    );

    for (name, homepage, max_pages, threads) in projects {
        toml.push_str(&format!(
            r#"
[[project]]
name = "{}"
homepage = "{}"
max-pages = {}
threads = {}
"#,
            name, homepage, max_pages, threads
        ));
    }

    parse_config(&toml).expect("test config should parse")
}

fn page(body: &str, links: &[&str]) -> String {
    let anchors: String = links
        .iter()
        .map(|l| format!(r#"<a href="{}">{}</a>"#, l, l))
        .collect();
    format!(
        "<html><head><title>{}</title></head><body><p>{}</p>{}</body></html>",
        body, body, anchors
    )
}

async fn mount_page(server: &MockServer, at: &str, body: &str, links: &[&str]) {
    Mock::given(method("GET"))
        .and(path(at))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(page(body, links))
                .insert_header("content-type", "text/html; charset=utf-8"),
        )
        .mount(server)
        .await;
}

fn single_project(config: &Config) -> Project {
    resolve_projects(config).unwrap().remove(0)
}

async fn crawl_project(config: &Config) -> CrawlSummary {
    let spider = Spider::from_config(single_project(config), config).unwrap();
    let coordinator = Coordinator::new(spider, &config.scheduler);
    tokio::time::timeout(RUN_TIMEOUT, coordinator.run())
        .await
        .expect("crawl should terminate")
        .expect("crawl should succeed")
}

fn downloads(project: &Project) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(project.downloads_dir())
        .map(|entries| {
            entries
                .filter_map(|e| e.ok())
                .map(|e| e.file_name().to_string_lossy().into_owned())
                .collect()
        })
        .unwrap_or_default();
    names.sort();
    names
}

fn frontier(project: &Project) -> FrontierState {
    open_store(project).load().unwrap()
}

#[tokio::test]
async fn test_single_page_budget() {
    let server = MockServer::start().await;
    mount_page(&server, "/", "Home", &["/a", "/b"]).await;

    let root = TempDir::new().unwrap();
    let homepage = format!("{}/", server.uri());
    let config = create_test_config(root.path(), &[("single", homepage.as_str(), 1, 2)]);
    let project = single_project(&config);

    let summary = crawl_project(&config).await;

    assert_eq!(summary.crawled_count, 1);
    assert!(summary.budget_reached());

    let state = frontier(&project);
    assert_eq!(state.crawled().len(), 1);
    assert!(state.is_crawled(&homepage));
    assert!(state.queued().is_empty());

    let files = downloads(&project);
    assert_eq!(files.len(), 2, "expected one original and one processed file: {:?}", files);
    assert!(files.iter().any(|f| f.ends_with("_org.txt")));
    assert!(files.iter().any(|f| f.ends_with("_e.txt")));
}

#[tokio::test]
async fn test_crawl_stays_inside_domain() {
    let server = MockServer::start().await;
    let base = server.uri();
    let port = url::Url::parse(&base).unwrap().port().unwrap();
    let other_host = format!("http://localhost:{}/elsewhere", port);

    mount_page(&server, "/", "Home", &["/page1", "/page2", other_host.as_str()]).await;
    mount_page(&server, "/page1", "Page one", &["/page2", "/"]).await;
    mount_page(&server, "/page2", "Page two", &["/page1#frag"]).await;
    Mock::given(method("GET"))
        .and(path("/elsewhere"))
        .respond_with(ResponseTemplate::new(200).set_body_string("nope"))
        .expect(0)
        .mount(&server)
        .await;

    let root = TempDir::new().unwrap();
    let homepage = format!("{}/", base);
    let config = create_test_config(root.path(), &[("site", homepage.as_str(), 50, 3)]);
    let project = single_project(&config);

    let summary = crawl_project(&config).await;

    assert!(summary.exhausted);
    assert_eq!(summary.crawled_count, 3);
    assert_eq!(summary.pages_succeeded, 3);

    let state = frontier(&project);
    assert!(state.queued().is_empty());
    assert!(state.is_disjoint());
    for crawled in state.crawled() {
        assert!(crawled.starts_with(&base), "crawled outside domain: {}", crawled);
    }
    assert!(state.is_crawled(&format!("{}/page1", base)));
    assert!(state.is_crawled(&format!("{}/page2", base)));
}

#[tokio::test]
async fn test_budget_bounds_concurrent_overshoot() {
    let server = MockServer::start().await;
    let links: Vec<String> = (1..=20).map(|i| format!("/p{}", i)).collect();
    let link_refs: Vec<&str> = links.iter().map(String::as_str).collect();
    mount_page(&server, "/", "Home", &link_refs).await;
    for link in &links {
        mount_page(&server, link, "Leaf", &[]).await;
    }

    let max_pages = 5;
    let threads = 3;
    let root = TempDir::new().unwrap();
    let homepage = format!("{}/", server.uri());
    let config = create_test_config(
        root.path(),
        &[("budget", homepage.as_str(), max_pages, threads)],
    );
    let project = single_project(&config);

    let summary = crawl_project(&config).await;

    assert!(summary.crawled_count >= max_pages);
    assert!(summary.crawled_count <= max_pages + threads - 1);

    let state = frontier(&project);
    assert!(state.queued().is_empty());
    assert_eq!(state.crawled().len(), summary.crawled_count);
}

#[tokio::test]
async fn test_blocked_homepage_terminates() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(403))
        .expect(1)
        .mount(&server)
        .await;

    let root = TempDir::new().unwrap();
    let homepage = format!("{}/", server.uri());
    let config = create_test_config(root.path(), &[("blocked", homepage.as_str(), 10, 2)]);
    let project = single_project(&config);

    let summary = crawl_project(&config).await;

    assert_eq!(summary.crawled_count, 0);
    assert_eq!(summary.pages_blocked, 1);
    assert!(summary.exhausted);

    let log = fs::read_to_string(project.blocked_log()).unwrap();
    assert_eq!(log.lines().count(), 1);
    assert!(log.contains(&format!("|{}|403", homepage)));

    let state = frontier(&project);
    assert!(state.crawled().is_empty());
    assert!(downloads(&project).is_empty());
}

#[tokio::test]
async fn test_transient_failures_persist_one_page() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(2)
        .with_priority(1)
        .mount(&server)
        .await;
    mount_page(&server, "/", "Recovered", &[]).await;

    let root = TempDir::new().unwrap();
    let homepage = format!("{}/", server.uri());
    let config = create_test_config(root.path(), &[("flaky", homepage.as_str(), 10, 1)]);
    let project = single_project(&config);

    let summary = crawl_project(&config).await;

    assert_eq!(summary.crawled_count, 1);
    assert_eq!(summary.pages_failed, 0);
    assert_eq!(
        downloads(&project)
            .iter()
            .filter(|f| f.ends_with("_org.txt"))
            .count(),
        1
    );
    assert!(!project.error_log().exists());
}

#[tokio::test]
async fn test_resume_from_hand_edited_frontier() {
    let server = MockServer::start().await;
    let base = server.uri();
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200).set_body_string(page("Home", &[])))
        .expect(0)
        .mount(&server)
        .await;
    mount_page(&server, "/todo", "Todo", &["/"]).await;

    let root = TempDir::new().unwrap();
    let homepage = format!("{}/", base);
    let config = create_test_config(root.path(), &[("resume", homepage.as_str(), 10, 1)]);
    let project = single_project(&config);

    fs::create_dir_all(&project.dir).unwrap();
    fs::write(project.crawled_file(), format!("{}/\n", base)).unwrap();
    fs::write(project.queue_file(), format!("{}/todo\n\n", base)).unwrap();

    let summary = crawl_project(&config).await;

    assert_eq!(summary.pages_succeeded, 1);
    let state = frontier(&project);
    assert!(state.is_crawled(&format!("{}/todo", base)));
    assert!(state.queued().is_empty());
}

#[tokio::test]
async fn test_fresh_run_reseeds() {
    let server = MockServer::start().await;
    mount_page(&server, "/", "Home", &[]).await;

    let root = TempDir::new().unwrap();
    let homepage = format!("{}/", server.uri());
    let config = create_test_config(root.path(), &[("fresh", homepage.as_str(), 10, 1)]);
    let project = single_project(&config);

    fs::create_dir_all(&project.dir).unwrap();
    fs::write(project.crawled_file(), format!("{}\n", homepage)).unwrap();
    fs::write(project.queue_file(), "").unwrap();

    let options = RunOptions {
        fresh: true,
        projects: vec![],
    };
    let report = tokio::time::timeout(RUN_TIMEOUT, run_crawl(&config, &options))
        .await
        .unwrap()
        .unwrap();

    assert!(report.failures.is_empty());
    assert_eq!(report.summaries[0].pages_succeeded, 1);
    assert!(frontier(&project).is_crawled(&homepage));
}

#[tokio::test]
async fn test_projects_run_independently() {
    let good = MockServer::start().await;
    mount_page(&good, "/", "Good", &["/next"]).await;
    mount_page(&good, "/next", "Next", &[]).await;

    let bad = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&bad)
        .await;

    let root = TempDir::new().unwrap();
    let good_home = format!("{}/", good.uri());
    let bad_home = format!("{}/", bad.uri());
    let config = create_test_config(
        root.path(),
        &[
            ("good", good_home.as_str(), 10, 2),
            ("bad", bad_home.as_str(), 10, 2),
        ],
    );

    let report = tokio::time::timeout(RUN_TIMEOUT, run_crawl(&config, &RunOptions::default()))
        .await
        .unwrap()
        .unwrap();

    assert!(report.failures.is_empty());
    assert_eq!(report.summaries.len(), 2);

    let bad_summary = report.summaries.iter().find(|s| s.project == "bad").unwrap();
    assert_eq!(bad_summary.crawled_count, 0);
    assert_eq!(bad_summary.pages_failed, 1);

    let good_summary = report.summaries.iter().find(|s| s.project == "good").unwrap();
    assert_eq!(good_summary.crawled_count, 2);
}

#[tokio::test]
async fn test_reset_failure_does_not_stop_other_projects() {
    let good = MockServer::start().await;
    mount_page(&good, "/", "Good", &["/next"]).await;
    mount_page(&good, "/next", "Next", &[]).await;

    let broken = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string(page("Broken", &[])))
        .expect(0)
        .mount(&broken)
        .await;

    let root = TempDir::new().unwrap();
    let good_home = format!("{}/", good.uri());
    let broken_home = format!("{}/", broken.uri());
    let config = create_test_config(
        root.path(),
        &[
            ("good", good_home.as_str(), 10, 2),
            ("broken", broken_home.as_str(), 10, 1),
        ],
    );

    // A directory where the queue file should be cannot be removed
    let broken_project = resolve_projects(&config)
        .unwrap()
        .into_iter()
        .find(|p| p.name == "broken")
        .unwrap();
    fs::create_dir_all(broken_project.queue_file()).unwrap();
    fs::write(broken_project.queue_file().join("keep"), "x").unwrap();

    let options = RunOptions {
        fresh: true,
        projects: vec![],
    };
    let report = tokio::time::timeout(RUN_TIMEOUT, run_crawl(&config, &options))
        .await
        .unwrap()
        .unwrap();

    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].0, "broken");

    assert_eq!(report.summaries.len(), 1);
    assert_eq!(report.summaries[0].project, "good");
    assert_eq!(report.summaries[0].crawled_count, 2);
}
