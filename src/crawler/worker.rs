//! Per-page processing
//!
//! A page task renders one frontier entry (with retries), runs the parser
//! and detectors over the result, and hands a [`PageOutcome`] back to the
//! coordinator. Page tasks never touch the frontier or any shared mutable
//! state.

use crate::config::Config;
use crate::crawler::parser::parse_page;
use crate::crawler::renderer::{PageRenderer, RenderError, RenderOptions, RequestSink};
use crate::detect::{
    detect_tags, detect_technologies_fallback, parse_data_layer_events, DetectedTechnology,
    TechnologyDetector,
};
use crate::patterns::PatternRegistry;
use crate::state::{BrokenLinkRecord, CrawlTarget, ObservedRequest, PageRecord};
use crate::url::{normalize_url, UrlPolicy};
use chrono::Utc;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

/// Read-only dependencies shared by every page task of a run
pub struct PageContext {
    pub renderer: Arc<dyn PageRenderer>,
    pub detector: Option<Arc<dyn TechnologyDetector>>,
    pub registry: Arc<PatternRegistry>,
    pub policy: Arc<UrlPolicy>,
    pub options: RenderOptions,
    /// Attempts after the first on timeout or transient failure
    pub max_retries: u32,
    pub retry_delay: Duration,
    /// Applied after every navigation attempt
    pub rate_limit: Duration,
    pub max_depth: u32,
    pub max_data_layer_events: usize,
    /// Where screenshots are written, when captured
    pub screenshot_dir: Option<PathBuf>,
}

impl PageContext {
    pub fn from_config(
        config: &Config,
        renderer: Arc<dyn PageRenderer>,
        detector: Option<Arc<dyn TechnologyDetector>>,
        registry: Arc<PatternRegistry>,
        policy: Arc<UrlPolicy>,
    ) -> Self {
        let browser = &config.browser;
        Self {
            renderer,
            detector,
            registry,
            policy,
            options: RenderOptions {
                timeout: Duration::from_millis(config.crawler.page_timeout_ms),
                wait_after_load: Duration::from_millis(browser.wait_after_load_ms),
                capture_data_layer: browser.capture_data_layer,
                capture_performance: browser.capture_performance,
                capture_screenshot: browser.capture_screenshots,
            },
            max_retries: config.crawler.max_retries,
            retry_delay: Duration::from_millis(config.crawler.retry_delay_ms),
            rate_limit: Duration::from_millis(config.crawler.rate_limit_ms),
            max_depth: config.crawler.max_depth,
            max_data_layer_events: config.crawler.max_data_layer_events,
            screenshot_dir: browser
                .capture_screenshots
                .then(|| PathBuf::from(&config.output.screenshot_dir)),
        }
    }
}

/// Result of processing one frontier entry
#[derive(Debug)]
pub enum PageOutcome {
    /// Rendered with a status below 400
    Success {
        record: PageRecord,
        /// Normalized links to offer to the frontier (empty at max depth)
        links: Vec<CrawlTarget>,
    },
    /// Rendered with a status of 400 or above; never retried
    Broken(BrokenLinkRecord),
    /// Every attempt failed
    Failed {
        target: CrawlTarget,
        attempts: u32,
        error: RenderError,
    },
}

impl PageOutcome {
    pub fn url(&self) -> &str {
        match self {
            Self::Success { record, .. } => &record.url,
            Self::Broken(broken) => &broken.url,
            Self::Failed { target, .. } => &target.url,
        }
    }
}

/// Renders and analyzes one page
///
/// # Flow
///
/// 1. Render, retrying transient errors up to `max_retries` times with
///    `retry_delay` between attempts; `rate_limit` is slept after every
///    attempt
/// 2. Status >= 400 → `Broken`
/// 3. Parse, detect tags, classify data layer, detect technologies, filter
///    tracking requests, save screenshot
/// 4. Collect links for the next depth when `depth < max_depth`
pub async fn process_page(ctx: Arc<PageContext>, target: CrawlTarget) -> PageOutcome {
    let max_attempts = ctx.max_retries + 1;
    let mut attempt = 0;

    let (rendered, requests) = loop {
        attempt += 1;
        let (sink, mut receiver) = RequestSink::channel();
        let result = ctx.renderer.render(&target.url, &ctx.options, sink).await;

        if !ctx.rate_limit.is_zero() {
            tokio::time::sleep(ctx.rate_limit).await;
        }

        match result {
            Ok(page) => {
                let mut requests = Vec::new();
                while let Ok(request) = receiver.try_recv() {
                    requests.push(request);
                }
                break (page, requests);
            }
            Err(e) if e.is_transient() && attempt < max_attempts => {
                warn!(
                    "Attempt {}/{} failed for {}: {}; retrying",
                    attempt, max_attempts, target.url, e
                );
                if !ctx.retry_delay.is_zero() {
                    tokio::time::sleep(ctx.retry_delay).await;
                }
            }
            Err(e) => {
                return PageOutcome::Failed {
                    target,
                    attempts: attempt,
                    error: e,
                };
            }
        }
    };

    if rendered.status >= 400 {
        debug!("{} returned HTTP {}", target.url, rendered.status);
        return PageOutcome::Broken(BrokenLinkRecord {
            url: target.url,
            status: rendered.status,
            depth: target.depth,
        });
    }

    let parsed = match Url::parse(&rendered.final_url).or_else(|_| Url::parse(&target.url)) {
        Ok(base) => parse_page(&rendered.html, &base),
        Err(_) => Default::default(),
    };

    let tags = detect_tags(&ctx.registry, &parsed.script_content());

    let data_layer = rendered.data_layer.as_ref().map(|events| {
        parse_data_layer_events(
            events,
            ctx.registry.event_catalog(),
            ctx.max_data_layer_events,
        )
    });

    let technologies =
        detect_technologies(&ctx, &target.url, &rendered.html, &parsed.meta_tags).await;

    let tracking_requests: Vec<ObservedRequest> = requests
        .into_iter()
        .filter(|request| ctx.registry.is_tracking_request(&request.url))
        .collect();

    let mut seen = HashSet::new();
    let mut internal_links = 0;
    let mut links = Vec::new();
    for link in &parsed.links {
        let normalized = match normalize_url(link) {
            Ok(normalized) => normalized,
            Err(_) => continue,
        };
        if !seen.insert(normalized.clone()) {
            continue;
        }
        if ctx.policy.in_scope(&normalized) {
            internal_links += 1;
        }
        if target.depth < ctx.max_depth {
            links.push(CrawlTarget::new(normalized, target.depth + 1));
        }
    }

    let screenshot = match (&rendered.screenshot, &ctx.screenshot_dir) {
        (Some(png), Some(dir)) => save_screenshot(dir, &target.url, png).await,
        _ => None,
    };

    let record = PageRecord {
        url: target.url.clone(),
        depth: target.depth,
        status: rendered.status,
        final_url: rendered.final_url,
        metadata: parsed.metadata,
        tags,
        data_layer,
        technologies,
        performance: rendered.performance,
        tracking_requests,
        internal_links,
        screenshot,
        fetched_at: Utc::now(),
    };

    PageOutcome::Success { record, links }
}

/// External detector first; built-in fingerprints when it is disabled,
/// fails, or finds nothing
async fn detect_technologies(
    ctx: &PageContext,
    url: &str,
    html: &str,
    meta_tags: &[(String, String)],
) -> Vec<DetectedTechnology> {
    if let Some(detector) = &ctx.detector {
        match detector.detect(url).await {
            Ok(found) if !found.is_empty() => return found,
            Ok(_) => debug!("{} found nothing on {}", detector.name(), url),
            Err(e) => warn!("{} detector failed for {}: {}", detector.name(), url, e),
        }
    }

    detect_technologies_fallback(&ctx.registry, html, meta_tags)
}

async fn save_screenshot(dir: &Path, url: &str, png: &[u8]) -> Option<String> {
    if let Err(e) = tokio::fs::create_dir_all(dir).await {
        warn!("Cannot create screenshot dir {}: {}", dir.display(), e);
        return None;
    }

    let path = dir.join(format!("{}.png", screenshot_name(url)));
    match tokio::fs::write(&path, png).await {
        Ok(()) => Some(path.display().to_string()),
        Err(e) => {
            warn!("Failed to save screenshot for {}: {}", url, e);
            None
        }
    }
}

/// File-safe name derived from the URL without its scheme
fn screenshot_name(url: &str) -> String {
    let without_scheme = url.split_once("://").map_or(url, |(_, rest)| rest);
    let name: String = without_scheme
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '.' || c == '-' { c } else { '_' })
        .take(150)
        .collect();
    name.trim_end_matches('_').to_string()
}
