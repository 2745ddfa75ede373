//! Integration tests for the crawler
//!
//! These tests drive the coordinator end-to-end against a scripted
//! in-memory renderer standing in for the browser.

use async_trait::async_trait;
use site_auditor::config::Config;
use site_auditor::crawler::{
    Coordinator, PageRenderer, RenderError, RenderOptions, RenderedPage, RequestSink,
};
use site_auditor::state::StateStore;
use site_auditor::{AuditorError, CrawlTarget, PatternRegistry, UrlState};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

const BASE: &str = "https://shop.example.com";

#[derive(Clone, Default)]
struct ScriptedPage {
    status: u16,
    html: String,
    requests: Vec<(String, u16)>,
    /// Leading attempts that time out
    failures: u32,
    /// Render time
    delay: Option<Duration>,
}

/// Serves canned pages keyed by normalized URL; unknown URLs answer 404
#[derive(Default)]
struct ScriptedRenderer {
    pages: HashMap<String, ScriptedPage>,
    calls: Mutex<HashMap<String, u32>>,
}

impl ScriptedRenderer {
    fn page(mut self, path: &str, html: &str) -> Self {
        self.pages.insert(
            url(path),
            ScriptedPage {
                status: 200,
                html: html.to_string(),
                ..Default::default()
            },
        );
        self
    }

    fn with(mut self, path: &str, edit: impl FnOnce(&mut ScriptedPage)) -> Self {
        let page = self.pages.entry(url(path)).or_default();
        edit(page);
        self
    }

    fn calls(&self, path: &str) -> u32 {
        self.calls
            .lock()
            .unwrap()
            .get(&url(path))
            .copied()
            .unwrap_or(0)
    }

    fn total_calls(&self) -> u32 {
        self.calls.lock().unwrap().values().sum()
    }
}

#[async_trait]
impl PageRenderer for ScriptedRenderer {
    async fn render(
        &self,
        url: &str,
        _options: &RenderOptions,
        sink: RequestSink,
    ) -> Result<RenderedPage, RenderError> {
        let call = {
            let mut calls = self.calls.lock().unwrap();
            let count = calls.entry(url.to_string()).or_insert(0);
            *count += 1;
            *count
        };

        let page = match self.pages.get(url) {
            Some(page) => page.clone(),
            None => {
                return Ok(RenderedPage {
                    status: 404,
                    final_url: url.to_string(),
                    ..Default::default()
                })
            }
        };

        if let Some(delay) = page.delay {
            tokio::time::sleep(delay).await;
        }

        if call <= page.failures {
            return Err(RenderError::Timeout {
                url: url.to_string(),
            });
        }

        for (request, status) in &page.requests {
            sink.record(request.clone(), Some(*status));
        }

        Ok(RenderedPage {
            status: page.status,
            final_url: url.to_string(),
            html: page.html,
            ..Default::default()
        })
    }
}

fn url(path: &str) -> String {
    format!("{}{}", BASE, path)
}

/// A small shop:
///
/// ```text
/// /           -> /about, /products/, /contact#form, /missing, /brochure.pdf, other.com
/// /about      -> /, /team
/// /products   -> /products/widget?id=1
/// ```
fn shop() -> ScriptedRenderer {
    ScriptedRenderer::default()
        .page(
            "/",
            r#"<html><head><title>Shop</title>
                <script>(function(w,d,s,l,i){})(window,document,'script','dataLayer','GTM-ABC123');</script>
            </head><body>
                <a href="/about">About</a>
                <a href="/products/">Products</a>
                <a href="/contact#form">Contact</a>
                <a href="/missing">Old page</a>
                <a href="/brochure.pdf">Brochure</a>
                <a href="https://other.com/partner">Partner</a>
            </body></html>"#,
        )
        .with("/", |page| {
            page.requests = vec![
                ("https://www.google-analytics.com/g/collect?v=2".to_string(), 204),
                (url("/static/app.css"), 200),
            ];
        })
        .page(
            "/about",
            r#"<html><head><title>About</title></head><body>
                <a href="/">Home</a><a href="/team">Team</a>
            </body></html>"#,
        )
        .page(
            "/products",
            r#"<html><head><title>Products</title></head><body>
                <a href="/products/widget?id=1">Widget</a>
            </body></html>"#,
        )
        .page("/contact", "<html><head><title>Contact</title></head></html>")
        .page("/team", "<html><head><title>Team</title></head></html>")
        .page(
            "/products/widget?id=1",
            "<html><head><title>Widget</title></head></html>",
        )
}

fn test_config(state_dir: &TempDir) -> Config {
    let mut config = Config::for_start_url(&url("/"));
    config.crawler.rate_limit_ms = 0;
    config.crawler.retry_delay_ms = 0;
    config.crawler.max_retries = 2;
    config.crawler.max_depth = 5;
    config.output.state_dir = state_dir.path().display().to_string();
    config
}

fn coordinator(config: Config, renderer: &Arc<ScriptedRenderer>) -> Coordinator {
    Coordinator::new(
        config,
        Arc::clone(renderer) as Arc<dyn PageRenderer>,
        None,
        Arc::new(PatternRegistry::builtin().unwrap()),
    )
    .unwrap()
}

#[tokio::test]
async fn test_full_crawl_single_domain() {
    let dir = TempDir::new().unwrap();
    let renderer = Arc::new(shop());
    let mut coordinator = coordinator(test_config(&dir), &renderer);

    let report = coordinator.run(CancellationToken::new()).await.unwrap();

    let mut urls: Vec<_> = report.pages.iter().map(|p| p.url.clone()).collect();
    urls.sort();
    assert_eq!(
        urls,
        vec![
            url("/"),
            url("/about"),
            url("/contact"),
            url("/products"),
            url("/products/widget?id=1"),
            url("/team"),
        ]
    );

    // Every URL rendered exactly once
    for path in ["/", "/about", "/products", "/contact", "/team", "/missing"] {
        assert_eq!(renderer.calls(path), 1, "{} rendered more than once", path);
    }

    let frontier = coordinator.frontier();
    assert_eq!(frontier.state_of(&url("/brochure.pdf")), UrlState::Skipped);
    assert_eq!(
        frontier.state_of("https://other.com/partner"),
        UrlState::Skipped
    );
    assert_eq!(frontier.state_of(&url("/team")), UrlState::Succeeded);
    assert!(frontier.is_empty());

    assert_eq!(report.metadata.domain, "shop.example.com");
    assert_eq!(report.metadata.total_pages, 6);
    assert!(!report.metadata.resumed);
    assert_eq!(report.statistics.pages_succeeded, 6);
    assert_eq!(report.statistics.tag_counts.get("google_tag_manager"), 1);
}

#[tokio::test]
async fn test_broken_link_not_retried() {
    let dir = TempDir::new().unwrap();
    let renderer = Arc::new(shop());
    let mut coordinator = coordinator(test_config(&dir), &renderer);

    let report = coordinator.run(CancellationToken::new()).await.unwrap();

    assert_eq!(renderer.calls("/missing"), 1);
    assert_eq!(report.broken_links.len(), 1);
    assert_eq!(report.broken_links[0].url, url("/missing"));
    assert_eq!(report.broken_links[0].status, 404);
    assert_eq!(report.broken_links[0].depth, 1);
    assert_eq!(report.statistics.pages_failed, 1);
    assert_eq!(
        coordinator.frontier().state_of(&url("/missing")),
        UrlState::Failed
    );
}

#[tokio::test]
async fn test_page_budget_bounds_dispatch() {
    let dir = TempDir::new().unwrap();
    let renderer = Arc::new(shop());
    let mut config = test_config(&dir);
    config.crawler.max_pages = 3;
    let mut coordinator = coordinator(config, &renderer);

    let report = coordinator.run(CancellationToken::new()).await.unwrap();

    assert_eq!(renderer.total_calls(), 3);
    assert_eq!(coordinator.frontier().visited_count(), 3);
    assert_eq!(report.pages.len() + report.broken_links.len(), 3);
    assert!(!coordinator.frontier().is_empty());
}

#[tokio::test]
async fn test_depth_limit() {
    let dir = TempDir::new().unwrap();
    let renderer = Arc::new(shop());
    let mut config = test_config(&dir);
    config.crawler.max_depth = 1;
    let mut coordinator = coordinator(config, &renderer);

    let report = coordinator.run(CancellationToken::new()).await.unwrap();

    assert_eq!(renderer.calls("/team"), 0);
    assert_eq!(renderer.calls("/products/widget?id=1"), 0);
    assert!(report.pages.iter().all(|p| p.depth <= 1));
    assert_eq!(report.pages.len(), 4);
}

#[tokio::test]
async fn test_exclude_filter() {
    let dir = TempDir::new().unwrap();
    let renderer = Arc::new(shop());
    let mut config = test_config(&dir);
    config.filters.exclude = vec!["/products".to_string()];
    let mut coordinator = coordinator(config, &renderer);

    let report = coordinator.run(CancellationToken::new()).await.unwrap();

    assert_eq!(renderer.calls("/products"), 0);
    assert!(report.pages.iter().all(|p| !p.url.contains("/products")));
    assert_eq!(
        coordinator.frontier().state_of(&url("/products")),
        UrlState::Skipped
    );
}

#[tokio::test]
async fn test_timeout_retried_until_success() {
    let dir = TempDir::new().unwrap();
    let renderer = Arc::new(shop().with("/about", |page| page.failures = 2));
    let mut coordinator = coordinator(test_config(&dir), &renderer);

    let report = coordinator.run(CancellationToken::new()).await.unwrap();

    assert_eq!(renderer.calls("/about"), 3);
    assert!(report.pages.iter().any(|p| p.url == url("/about")));
    // /team is only linked from /about
    assert_eq!(renderer.calls("/team"), 1);
}

#[tokio::test]
async fn test_retries_exhausted_records_failure() {
    let dir = TempDir::new().unwrap();
    let renderer = Arc::new(shop().with("/about", |page| page.failures = 2));
    let mut config = test_config(&dir);
    config.crawler.max_retries = 1;
    let mut coordinator = coordinator(config, &renderer);

    let report = coordinator.run(CancellationToken::new()).await.unwrap();

    assert_eq!(renderer.calls("/about"), 2);
    assert_eq!(renderer.calls("/team"), 0);
    assert!(report.pages.iter().all(|p| p.url != url("/about")));
    assert!(report.broken_links.iter().all(|b| b.url != url("/about")));
    assert_eq!(report.statistics.pages_failed, 2);
    assert_eq!(
        coordinator.frontier().state_of(&url("/about")),
        UrlState::Failed
    );
}

#[tokio::test]
async fn test_overflow_keeps_memory_bounded() {
    let dir = TempDir::new().unwrap();
    let renderer = Arc::new(shop());
    let mut config = test_config(&dir);
    config.crawler.memory_threshold = 2;
    config.crawler.concurrent_pages = 1;
    let mut coordinator = coordinator(config, &renderer);

    let report = coordinator.run(CancellationToken::new()).await.unwrap();

    assert_eq!(report.pages.len(), 6);
    assert!(coordinator.peak_buffered() <= 2);
    assert_eq!(report.pages[0].url, url("/"));
    assert!(!dir.path().join("overflow_shop.example.com.json").exists());
}

#[tokio::test]
async fn test_tracking_requests_filtered() {
    let dir = TempDir::new().unwrap();
    let renderer = Arc::new(shop());
    let mut coordinator = coordinator(test_config(&dir), &renderer);

    let report = coordinator.run(CancellationToken::new()).await.unwrap();

    let home = report.pages.iter().find(|p| p.url == url("/")).unwrap();
    assert_eq!(home.tracking_requests.len(), 1);
    assert!(home.tracking_requests[0]
        .url
        .starts_with("https://www.google-analytics.com/"));
    assert_eq!(home.tracking_requests[0].status, Some(204));
    assert_eq!(home.internal_links, 4);
}

#[tokio::test]
async fn test_resume_continues_saved_run() {
    let dir = TempDir::new().unwrap();
    let renderer = Arc::new(shop());

    let mut config = test_config(&dir);
    config.crawler.max_pages = 3;
    let mut first = coordinator(config, &renderer);
    let first_report = first.run(CancellationToken::new()).await.unwrap();

    let state = StateStore::new(dir.path(), "shop.example.com")
        .load()
        .unwrap()
        .unwrap();
    assert_eq!(state.visited_urls, first.frontier().visited().to_vec());
    assert_eq!(state.to_visit, first.frontier().pending());
    assert_eq!(state.page_data, first_report.pages);
    assert_eq!(state.broken_links, first_report.broken_links);
    drop(first);

    let mut config = test_config(&dir);
    config.crawler.resume = true;
    let mut second = coordinator(config, &renderer);
    assert_eq!(second.frontier().visited_count(), 3);
    assert_eq!(second.frontier().pending(), state.to_visit);

    let report = second.run(CancellationToken::new()).await.unwrap();

    assert!(report.metadata.resumed);
    assert_eq!(report.pages.len(), 6);
    assert_eq!(report.broken_links.len(), 1);
    assert_eq!(report.statistics.pages_succeeded, 6);
    for path in ["/", "/about", "/products", "/contact", "/team"] {
        assert_eq!(renderer.calls(path), 1, "{} rendered more than once", path);
    }
}

#[tokio::test]
async fn test_resumed_frontier_refiltered() {
    let dir = TempDir::new().unwrap();
    let renderer = Arc::new(shop());

    let mut config = test_config(&dir);
    config.crawler.max_pages = 1;
    coordinator(config, &renderer)
        .run(CancellationToken::new())
        .await
        .unwrap();

    let mut config = test_config(&dir);
    config.crawler.resume = true;
    config.filters.exclude = vec!["/about".to_string()];
    let second = coordinator(config, &renderer);

    let pending = second.frontier().pending();
    assert!(!pending.is_empty());
    assert!(pending.iter().all(|t| t.url != url("/about")));
}

#[tokio::test]
async fn test_cancellation_saves_in_flight_as_queued() {
    let dir = TempDir::new().unwrap();
    let renderer = Arc::new(shop().with("/", |page| {
        page.delay = Some(Duration::from_secs(30));
    }));
    let mut coordinator = coordinator(test_config(&dir), &renderer);

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        trigger.cancel();
    });

    let result = coordinator.run(cancel).await;
    assert!(matches!(result, Err(AuditorError::Interrupted)));

    let state = StateStore::new(dir.path(), "shop.example.com")
        .load()
        .unwrap()
        .unwrap();
    assert!(state.visited_urls.is_empty());
    assert_eq!(state.to_visit, vec![CrawlTarget::new(url("/"), 0)]);
    assert!(state.page_data.is_empty());
}
