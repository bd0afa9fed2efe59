//! End-to-end runner behavior against a local fixture site: incremental
//! sync skips stored articles, the stop threshold ends the run early, and
//! cancellation and storage outages are reported.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use ca_core::{
    Article, ArticleStore, Error, Result, SourceName, Upserted,
};
use ca_scrapers::{CancelFlag, FetchConfig, RunLimits, RunnerConfig, SourceRunner};
use ca_storage::MemoryStore;
use chrono::Utc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

/// Serves a fixed path-to-HTML map on a local port; unknown paths get 404.
async fn spawn_site(pages: HashMap<String, String>) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let pages = Arc::new(pages);
    tokio::spawn(async move {
        loop {
            let Ok((mut socket, _)) = listener.accept().await else {
                break;
            };
            let pages = pages.clone();
            tokio::spawn(async move {
                let mut buf = [0u8; 4096];
                let n = socket.read(&mut buf).await.unwrap_or(0);
                let request = String::from_utf8_lossy(&buf[..n]).to_string();
                let path = request
                    .split_whitespace()
                    .nth(1)
                    .unwrap_or("/")
                    .to_string();
                let response = match pages.get(&path) {
                    Some(body) => format!(
                        "HTTP/1.1 200 OK\r\ncontent-type: text/html\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
                        body.len(),
                        body
                    ),
                    None => {
                        "HTTP/1.1 404 Not Found\r\ncontent-length: 0\r\nconnection: close\r\n\r\n"
                            .to_string()
                    }
                };
                let _ = socket.write_all(response.as_bytes()).await;
            });
        }
    });
    format!("http://{}", addr)
}

fn detail_page(title: &str) -> String {
    format!(
        r#"<html><body><article>
            <h1>{title}</h1>
            <p>Published on May 2, 2025 in current affairs.</p>
            <h2>Background</h2>
            <p>A reasonably long paragraph describing the background of the story.</p>
        </article></body></html>"#
    )
}

fn fixture_site() -> HashMap<String, String> {
    let index = r#"<html><body>
        <article class="post"><h2><a href="/first-story/">First Story Title</a></h2></article>
        <article class="post"><h2><a href="/second-story/">Second Story Title</a></h2></article>
        <article class="post"><h2><a href="/third-story/">Third Story Title</a></h2></article>
    </body></html>"#;
    let mut pages = HashMap::new();
    pages.insert("/".to_string(), index.to_string());
    pages.insert("/first-story/".to_string(), detail_page("First Story Title"));
    pages.insert("/second-story/".to_string(), detail_page("Second Story Title"));
    pages.insert("/third-story/".to_string(), detail_page("Third Story Title"));
    pages
}

fn test_config(stop_threshold: usize) -> RunnerConfig {
    RunnerConfig {
        limits: RunLimits {
            max_pages: 1,
            max_days: 1,
            max_articles: 100,
        },
        politeness_delay: Duration::ZERO,
        page_delay: Duration::ZERO,
        stop_threshold,
        fetch: FetchConfig {
            max_retries: 1,
            backoff_base: Duration::ZERO,
            request_timeout: Duration::from_secs(5),
        },
    }
}

fn seed_article(url: &str) -> Article {
    Article {
        url: url.to_string(),
        title: "Third Story Title".to_string(),
        intro: "Seeded earlier".to_string(),
        image_url: None,
        published_date_raw: "N/A".to_string(),
        published_date: None,
        importance_rating: None,
        source: SourceName::GkToday,
        sections: Vec::new(),
        scraped_at: Utc::now(),
    }
}

#[tokio::test]
async fn test_incremental_run_skips_known_and_stops_at_threshold() {
    let base = spawn_site(fixture_site()).await;
    let store = Arc::new(MemoryStore::new());
    store
        .upsert(&seed_article(&format!("{base}/third-story/")))
        .await
        .unwrap();

    let mut spec = ca_scrapers::sources::gktoday::spec();
    spec.base_url = base.clone();

    let runner = SourceRunner::with_spec(spec, store.clone(), test_config(1)).unwrap();
    let report = runner.run(CancelFlag::new()).await;

    assert!(report.success, "errors: {:?}", report.errors);
    assert_eq!(report.articles_scraped, 2);
    assert_eq!(report.articles_skipped, 1);
    assert_eq!(store.len().await, 3);

    let stored = store.get(&format!("{base}/first-story/")).await.unwrap();
    assert_eq!(stored.title, "First Story Title");
    assert_eq!(stored.published_date_raw, "May 2, 2025");
    assert!(stored.sections.iter().any(|s| s.heading == "Background"));
}

#[tokio::test]
async fn test_rerun_scrapes_nothing_new() {
    let base = spawn_site(fixture_site()).await;
    let store = Arc::new(MemoryStore::new());

    let mut spec = ca_scrapers::sources::gktoday::spec();
    spec.base_url = base.clone();

    let runner = SourceRunner::with_spec(spec.clone(), store.clone(), test_config(5)).unwrap();
    let first = runner.run(CancelFlag::new()).await;
    assert_eq!(first.articles_scraped, 3);
    assert_eq!(store.len().await, 3);

    let runner = SourceRunner::with_spec(spec, store.clone(), test_config(5)).unwrap();
    let second = runner.run(CancelFlag::new()).await;
    assert!(second.success);
    assert_eq!(second.articles_scraped, 0);
    assert_eq!(second.articles_skipped, 3);
    assert_eq!(store.len().await, 3);
}

#[tokio::test]
async fn test_article_limit_ignores_already_known_candidates() {
    let base = spawn_site(fixture_site()).await;
    let store = Arc::new(MemoryStore::new());
    store
        .upsert(&seed_article(&format!("{base}/first-story/")))
        .await
        .unwrap();
    store
        .upsert(&seed_article(&format!("{base}/second-story/")))
        .await
        .unwrap();

    let mut spec = ca_scrapers::sources::gktoday::spec();
    spec.base_url = base.clone();

    // Full-backfill mode: early stop disabled, ceiling of 2 new articles.
    // The two known stories must not consume the ceiling before the new
    // third one is reached.
    let mut config = test_config(usize::MAX);
    config.limits.max_articles = 2;

    let runner = SourceRunner::with_spec(spec, store.clone(), config).unwrap();
    let report = runner.run(CancelFlag::new()).await;

    assert!(report.success, "errors: {:?}", report.errors);
    assert_eq!(report.articles_scraped, 1);
    assert_eq!(report.articles_skipped, 2);
    assert_eq!(store.len().await, 3);
}

#[tokio::test]
async fn test_article_limit_caps_newly_scraped() {
    let base = spawn_site(fixture_site()).await;
    let store = Arc::new(MemoryStore::new());

    let mut spec = ca_scrapers::sources::gktoday::spec();
    spec.base_url = base;

    let mut config = test_config(5);
    config.limits.max_articles = 2;

    let runner = SourceRunner::with_spec(spec, store.clone(), config).unwrap();
    let report = runner.run(CancelFlag::new()).await;

    assert_eq!(report.articles_scraped, 2);
    assert_eq!(store.len().await, 2);
}

#[tokio::test]
async fn test_dead_article_link_is_skipped_not_fatal() {
    let mut pages = fixture_site();
    pages.remove("/second-story/");
    let base = spawn_site(pages).await;
    let store = Arc::new(MemoryStore::new());

    let mut spec = ca_scrapers::sources::gktoday::spec();
    spec.base_url = base.clone();

    let runner = SourceRunner::with_spec(spec, store.clone(), test_config(5)).unwrap();
    let report = runner.run(CancelFlag::new()).await;

    assert!(report.success);
    assert_eq!(report.articles_scraped, 2);
    assert_eq!(report.articles_skipped, 1);
}

#[tokio::test]
async fn test_cancelled_run_stops_before_first_article() {
    let base = spawn_site(fixture_site()).await;
    let store = Arc::new(MemoryStore::new());

    let mut spec = ca_scrapers::sources::gktoday::spec();
    spec.base_url = base;

    let cancel = CancelFlag::new();
    cancel.cancel();

    let runner = SourceRunner::with_spec(spec, store.clone(), test_config(5)).unwrap();
    let report = runner.run(cancel).await;

    assert!(!report.success);
    assert_eq!(report.articles_scraped, 0);
    assert!(report.errors.iter().any(|e| e.contains("cancelled")));
    assert_eq!(store.len().await, 0);
}

/// Store whose health check always fails.
struct DownStore;

#[async_trait]
impl ArticleStore for DownStore {
    async fn ping(&self) -> Result<()> {
        Err(Error::Storage("connection refused".to_string()))
    }

    async fn exists(&self, _url: &str) -> Result<bool> {
        Err(Error::Storage("connection refused".to_string()))
    }

    async fn upsert(&self, _article: &Article) -> Result<Upserted> {
        Err(Error::Storage("connection refused".to_string()))
    }

    async fn latest(&self, _limit: usize) -> Result<Vec<Article>> {
        Err(Error::Storage("connection refused".to_string()))
    }
}

#[tokio::test]
async fn test_unreachable_storage_fails_fast() {
    let base = spawn_site(fixture_site()).await;
    let mut spec = ca_scrapers::sources::gktoday::spec();
    spec.base_url = base;

    let runner = SourceRunner::with_spec(spec, Arc::new(DownStore), test_config(5)).unwrap();
    let report = runner.run(CancelFlag::new()).await;

    assert!(!report.success);
    assert_eq!(report.articles_scraped, 0);
    assert!(report.errors.iter().any(|e| e.contains("Storage unreachable")));
}
