//! Crawler coordinator - main crawl orchestration logic
//!
//! The coordinator is the only owner of the frontier, the result buffer and
//! the statistics. It drains the frontier in batches, runs one page task per
//! batch entry in a `JoinSet`, and merges the outcomes sequentially once the
//! whole batch has resolved.

use crate::config::Config;
use crate::crawler::renderer::PageRenderer;
use crate::crawler::worker::{process_page, PageContext, PageOutcome};
use crate::detect::TechnologyDetector;
use crate::output::{CrawlReport, CrawlStatistics, RunMetadata};
use crate::patterns::PatternRegistry;
use crate::state::{
    BrokenLinkRecord, CrawlFrontier, CrawlTarget, OverflowBuffer, PageRecord, PersistedState,
    StateStore, UrlState,
};
use crate::url::{normalize_url, UrlPolicy};
use crate::{AuditorError, Result};
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Main crawler coordinator structure
pub struct Coordinator {
    config: Arc<Config>,
    ctx: Arc<PageContext>,
    policy: Arc<UrlPolicy>,
    frontier: CrawlFrontier,
    store: StateStore,
    overflow: OverflowBuffer,
    /// Page records not yet spilled, in completion order
    buffer: Vec<PageRecord>,
    broken_links: Vec<BrokenLinkRecord>,
    /// Pages whose retries were exhausted
    failed_urls: Vec<String>,
    /// Dispatched targets not yet merged
    in_flight: Vec<CrawlTarget>,
    stats: CrawlStatistics,
    domain: String,
    resumed: bool,
    /// Successful pages merged during this run
    succeeded: usize,
    /// High-water mark of the in-memory buffer
    peak_buffered: usize,
}

impl Coordinator {
    /// Creates a new coordinator instance
    ///
    /// With `crawler.resume` set and a state file present, the frontier,
    /// buffered records and failures are restored from it; queued URLs
    /// that no longer pass the URL filters are dropped. Restored records
    /// beyond the memory threshold go straight to the overflow file.
    /// Otherwise any stale
    /// overflow file is deleted and the frontier is seeded with the start URL.
    ///
    /// # Errors
    ///
    /// An invalid start URL or filter pattern
    pub fn new(
        config: Config,
        renderer: Arc<dyn PageRenderer>,
        detector: Option<Arc<dyn TechnologyDetector>>,
        registry: Arc<PatternRegistry>,
    ) -> Result<Self> {
        let policy = Arc::new(UrlPolicy::from_config(&config)?);
        let seed = normalize_url(&config.crawler.start_url)?;
        let domain = policy.base_host().to_string();

        let state_dir = Path::new(&config.output.state_dir);
        let store = StateStore::new(state_dir, &domain);
        let overflow = OverflowBuffer::new(state_dir, &domain);

        let saved = if config.crawler.resume {
            match store.load() {
                Ok(Some(state)) => Some(state),
                Ok(None) => {
                    info!("No saved state for {}, starting fresh", domain);
                    None
                }
                Err(e) => {
                    warn!("Cannot resume from {}: {}", store.path().display(), e);
                    None
                }
            }
        } else {
            None
        };

        let ctx = Arc::new(PageContext::from_config(
            &config,
            renderer,
            detector,
            registry,
            Arc::clone(&policy),
        ));

        let mut coordinator = Self {
            config: Arc::new(config),
            ctx,
            policy,
            frontier: CrawlFrontier::new(),
            store,
            overflow,
            buffer: Vec::new(),
            broken_links: Vec::new(),
            failed_urls: Vec::new(),
            in_flight: Vec::new(),
            stats: CrawlStatistics::new(),
            domain,
            resumed: saved.is_some(),
            succeeded: 0,
            peak_buffered: 0,
        };

        match saved {
            Some(state) => coordinator.restore(state),
            None => {
                if let Err(e) = coordinator.overflow.discard() {
                    warn!("Failed to delete stale overflow file: {}", e);
                }

                if coordinator.policy.in_scope(&seed) {
                    coordinator.frontier.enqueue(CrawlTarget::new(seed, 0));
                } else {
                    warn!("Start URL {} is excluded by the URL filters", seed);
                    coordinator.frontier.mark_skipped(&seed);
                }
            }
        }

        Ok(coordinator)
    }

    fn restore(&mut self, state: PersistedState) {
        let spilled = match self.overflow.load_all() {
            Ok(records) => records,
            Err(e) => {
                warn!("Failed to read overflow file: {}", e);
                Vec::new()
            }
        };

        // Records spilled after the snapshot was taken are in both files
        let spilled_urls: HashSet<&str> = spilled.iter().map(|p| p.url.as_str()).collect();
        let page_data: Vec<PageRecord> = state
            .page_data
            .into_iter()
            .filter(|page| !spilled_urls.contains(page.url.as_str()))
            .collect();

        // Every recorded page counts as visited, snapshot or not
        let mut visited = state.visited_urls;
        let mut seen: HashSet<String> = visited.iter().cloned().collect();
        for page in spilled.iter().chain(page_data.iter()) {
            if seen.insert(page.url.clone()) {
                visited.push(page.url.clone());
            }
        }

        let mut failed: Vec<String> = state.broken_links.iter().map(|b| b.url.clone()).collect();
        failed.extend(state.failed_urls.iter().cloned());
        self.frontier = CrawlFrontier::restore(visited, state.to_visit, &failed);

        let policy = Arc::clone(&self.policy);
        for dropped in self.frontier.retain_queued(|target| policy.in_scope(&target.url)) {
            info!(
                "Dropping resumed URL {} (no longer passes the URL filters)",
                dropped.url
            );
        }

        self.stats = CrawlStatistics::from_records(
            spilled.iter().chain(page_data.iter()),
            state.broken_links.len() + state.failed_urls.len(),
        );
        self.buffer = page_data;
        self.broken_links = state.broken_links;
        self.failed_urls = state.failed_urls;

        info!(
            "Resumed audit of {}: {} visited, {} queued, {} pages recorded (saved {})",
            self.domain,
            self.frontier.visited_count(),
            self.frontier.pending_count(),
            spilled.len() + self.buffer.len(),
            state.last_saved
        );

        if self.buffer.len() >= self.config.crawler.memory_threshold {
            self.spill();
        }
        self.peak_buffered = self.buffer.len();
    }

    pub fn frontier(&self) -> &CrawlFrontier {
        &self.frontier
    }

    pub fn statistics(&self) -> &CrawlStatistics {
        &self.stats
    }

    /// Largest number of page records held in memory at once
    pub fn peak_buffered(&self) -> usize {
        self.peak_buffered
    }

    /// Runs the main crawl loop
    ///
    /// Batches are taken from the front of the frontier until it is empty
    /// or the page budget is spent. The returned report holds every page of
    /// the run, spilled ones first.
    ///
    /// # Errors
    ///
    /// `AuditorError::Interrupted` once `cancel` fires; in-flight pages are
    /// aborted and a snapshot is written so the run can be resumed
    pub async fn run(&mut self, cancel: CancellationToken) -> Result<CrawlReport> {
        let started_at = Utc::now();
        let start_time = Instant::now();
        let max_pages = self.config.crawler.max_pages;
        let batch_size = self.config.crawler.concurrent_pages;
        let mut pages_done = 0usize;

        info!(
            "Starting audit of {} (max {} pages, depth {}, {} concurrent)",
            self.config.crawler.start_url,
            max_pages,
            self.config.crawler.max_depth,
            batch_size
        );

        loop {
            if cancel.is_cancelled() {
                return Err(self.interrupt());
            }

            let batch = self.frontier.next_batch(batch_size, max_pages);
            self.in_flight = batch.clone();
            if batch.is_empty() {
                if self.frontier.is_empty() {
                    info!("Frontier is empty, audit complete");
                } else {
                    info!(
                        "Page budget of {} reached with {} URLs still queued",
                        max_pages,
                        self.frontier.pending_count()
                    );
                }
                break;
            }

            debug!("Dispatching batch of {} pages", batch.len());

            let mut tasks = JoinSet::new();
            for target in &batch {
                tasks.spawn(process_page(Arc::clone(&self.ctx), target.clone()));
            }

            let outcomes = tokio::select! {
                _ = cancel.cancelled() => None,
                outcomes = collect_outcomes(&mut tasks) => Some(outcomes),
            };

            let outcomes = match outcomes {
                Some(outcomes) => outcomes,
                None => {
                    tasks.abort_all();
                    return Err(self.interrupt());
                }
            };

            for outcome in outcomes {
                pages_done += 1;
                if self.merge(outcome) {
                    self.on_success(pages_done, start_time);
                }
            }

            // Tasks that panicked never reported back
            for target in &batch {
                if self.frontier.state_of(&target.url) == UrlState::InFlight {
                    error!("Page task for {} ended without a result", target.url);
                    self.complete(&target.url, UrlState::Failed);
                    self.stats.record_failure();
                    self.failed_urls.push(target.url.clone());
                }
            }
        }

        Ok(self.finish(started_at, start_time))
    }

    /// Merges one page outcome; returns true for a successful page
    fn merge(&mut self, outcome: PageOutcome) -> bool {
        match outcome {
            PageOutcome::Success { record, links } => {
                self.complete(&record.url, UrlState::Succeeded);

                for link in links {
                    if self.policy.in_scope(&link.url) {
                        self.frontier.enqueue(link);
                    } else {
                        self.frontier.mark_skipped(&link.url);
                    }
                }

                debug!(
                    "Audited {} (depth {}, {} tags)",
                    record.url,
                    record.depth,
                    record.tags.len()
                );
                self.stats.record_page(&record);
                self.buffer.push(record);
                self.peak_buffered = self.peak_buffered.max(self.buffer.len());

                if self.buffer.len() >= self.config.crawler.memory_threshold {
                    self.spill();
                }
                true
            }
            PageOutcome::Broken(broken) => {
                self.complete(&broken.url, UrlState::Failed);
                warn!("Broken link {} (HTTP {})", broken.url, broken.status);
                self.stats.record_failure();
                self.broken_links.push(broken);
                false
            }
            PageOutcome::Failed {
                target,
                attempts,
                error,
            } => {
                self.complete(&target.url, UrlState::Failed);
                error!(
                    "Giving up on {} after {} attempts: {}",
                    target.url, attempts, error
                );
                self.stats.record_failure();
                self.failed_urls.push(target.url);
                false
            }
        }
    }

    fn on_success(&mut self, pages_done: usize, start_time: Instant) {
        self.succeeded += 1;
        if self.succeeded % self.config.crawler.progress_interval.max(1) != 0 {
            return;
        }

        let rate = pages_done as f64 / start_time.elapsed().as_secs_f64().max(f64::EPSILON);
        info!(
            "Progress: {} pages audited, {} in frontier, {:.2} pages/sec",
            self.stats.pages_succeeded,
            self.frontier.pending_count(),
            rate
        );
        self.save_snapshot(self.buffer.clone());
    }

    fn complete(&mut self, url: &str, outcome: UrlState) {
        self.in_flight.retain(|target| target.url != url);
        if let Err(e) = self.frontier.complete(url, outcome) {
            error!("{}", e);
        }
    }

    /// Moves the buffer to the overflow file; keeps it in memory on failure
    ///
    /// A snapshot follows every spill so the state file never lists
    /// records that are also in the overflow file.
    fn spill(&mut self) {
        match self.overflow.spill(&self.buffer) {
            Ok(()) => {
                debug!(
                    "Moved {} page records to the overflow file ({} spilled this run)",
                    self.buffer.len(),
                    self.overflow.spilled()
                );
                self.buffer.clear();
                self.save_snapshot(Vec::new());
            }
            Err(e) => warn!("Overflow spill failed, keeping records in memory: {}", e),
        }
    }

    /// Writes a snapshot; targets not yet merged are saved as queued again
    fn save_snapshot(&self, page_data: Vec<PageRecord>) {
        let visited_urls = self
            .frontier
            .visited()
            .iter()
            .filter(|url| !self.in_flight.iter().any(|t| &t.url == *url))
            .cloned()
            .collect();

        let mut to_visit = self.in_flight.clone();
        to_visit.extend(self.frontier.pending());

        let state = PersistedState {
            domain: self.domain.clone(),
            visited_urls,
            to_visit,
            page_data,
            broken_links: self.broken_links.clone(),
            failed_urls: self.failed_urls.clone(),
            last_saved: Utc::now(),
        };

        match self.store.save(&state) {
            Ok(()) => debug!("Saved crawl state to {}", self.store.path().display()),
            Err(e) => warn!("Failed to save crawl state: {}", e),
        }
    }

    fn interrupt(&self) -> AuditorError {
        warn!(
            "Audit interrupted with {} pages in flight; saving state",
            self.in_flight.len()
        );
        self.save_snapshot(self.buffer.clone());
        AuditorError::Interrupted
    }

    fn finish(&mut self, started_at: DateTime<Utc>, start_time: Instant) -> CrawlReport {
        let mut pages = match self.overflow.drain() {
            Ok(records) => records,
            Err(e) => {
                warn!("Failed to read overflow file, spilled pages are missing from the report: {}", e);
                Vec::new()
            }
        };
        pages.append(&mut self.buffer);

        self.save_snapshot(pages.clone());

        info!(
            "Audit completed: {} pages, {} broken links in {:?}",
            pages.len(),
            self.broken_links.len(),
            start_time.elapsed()
        );
        debug!("Peak in-memory page records: {}", self.peak_buffered);

        CrawlReport {
            metadata: RunMetadata {
                start_url: self.config.crawler.start_url.clone(),
                domain: self.domain.clone(),
                started_at,
                finished_at: Utc::now(),
                total_pages: pages.len(),
                total_broken_links: self.broken_links.len(),
                max_pages: self.config.crawler.max_pages,
                max_depth: self.config.crawler.max_depth,
                resumed: self.resumed,
            },
            pages,
            broken_links: self.broken_links.clone(),
            statistics: self.stats.clone(),
        }
    }
}

/// Waits for every task of a batch, in completion order
async fn collect_outcomes(tasks: &mut JoinSet<PageOutcome>) -> Vec<PageOutcome> {
    let mut outcomes = Vec::with_capacity(tasks.len());
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok(outcome) => outcomes.push(outcome),
            Err(e) => error!("Page task failed: {}", e),
        }
    }
    outcomes
}
