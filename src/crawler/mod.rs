//! Crawler module for rendering and auditing pages
//!
//! This module contains the core crawling logic, including:
//! - The page renderer boundary and its headless Chrome implementation
//! - HTML parsing of rendered pages
//! - Per-page processing with retries
//! - Overall crawl coordination

mod browser;
mod coordinator;
mod parser;
mod renderer;
mod worker;

pub use browser::ChromeRenderer;
pub use coordinator::Coordinator;
pub use parser::{parse_page, PageScripts, ParsedPage};
pub use renderer::{
    parse_data_layer_json, parse_performance_timing, PageRenderer, RenderError, RenderOptions,
    RenderedPage, RequestSink,
};
pub use worker::{process_page, PageContext, PageOutcome};

use crate::config::Config;
use crate::detect::build_detector;
use crate::output::CrawlReport;
use crate::patterns::PatternRegistry;
use crate::Result;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Runs a complete audit
///
/// This is the main entry point for starting an audit. It will:
/// 1. Build the pattern registry, including custom tags
/// 2. Launch the browser
/// 3. Set up the external technology detector, if any
/// 4. Crawl until the frontier is empty or the page budget is spent
///
/// The browser is released when this function returns, on every path.
/// Renders still blocked in Chrome at that point stop at their next
/// DevTools step once `cancel` has fired, dropping the last browser handle.
///
/// # Errors
///
/// * `AuditorError::Render` - The browser could not be launched
/// * `AuditorError::Interrupted` - `cancel` fired; state was saved
///
/// # Example
///
/// ```no_run
/// use site_auditor::config::load_config;
/// use site_auditor::crawler::run_audit;
/// use std::path::Path;
/// use tokio_util::sync::CancellationToken;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = load_config(Path::new("audit.toml"))?;
/// let report = run_audit(config, CancellationToken::new()).await?;
/// println!("{} pages audited", report.pages.len());
/// # Ok(())
/// # }
/// ```
pub async fn run_audit(config: Config, cancel: CancellationToken) -> Result<CrawlReport> {
    let registry = Arc::new(PatternRegistry::with_custom_tags(&config.custom_tags)?);
    let renderer: Arc<dyn PageRenderer> = Arc::new(ChromeRenderer::launch(
        &config.browser,
        cancel.child_token(),
    )?);
    let detector = build_detector(&config.technology).await;

    let mut coordinator = Coordinator::new(config, renderer, detector, registry)?;
    coordinator.run(cancel).await
}
