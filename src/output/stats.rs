//! Crawl statistics
//!
//! Running counters maintained by the coordinator as results land, and the
//! console summary printed at the end of a run.

use crate::state::PageRecord;
use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;

/// Counter keyed by name, remembering first-insertion order
///
/// Serialized as a JSON object in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Counts {
    entries: Vec<(String, u64)>,
}

impl Counts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment(&mut self, key: &str) {
        match self.entries.iter_mut().find(|(name, _)| name == key) {
            Some((_, count)) => *count += 1,
            None => self.entries.push((key.to_string(), 1)),
        }
    }

    pub fn get(&self, key: &str) -> u64 {
        self.entries
            .iter()
            .find(|(name, _)| name == key)
            .map_or(0, |(_, count)| *count)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in first-insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> {
        self.entries.iter().map(|(name, count)| (name.as_str(), *count))
    }

    /// Entries sorted by count descending; ties keep insertion order
    pub fn ranked(&self) -> Vec<(&str, u64)> {
        let mut ranked: Vec<_> = self.iter().collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1));
        ranked
    }
}

impl Serialize for Counts {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (name, count) in &self.entries {
            map.serialize_entry(name, count)?;
        }
        map.end()
    }
}

/// Crawl statistics summary
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CrawlStatistics {
    /// Pages rendered with a status below 400
    pub pages_succeeded: u64,

    /// Broken links plus pages whose retries were exhausted
    pub pages_failed: u64,

    /// Pages on which each tag was found
    pub tag_counts: Counts,

    /// Pages on which each technology was detected
    pub technology_counts: Counts,
}

impl CrawlStatistics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds counters from records restored on resume
    pub fn from_records<'a>(
        pages: impl IntoIterator<Item = &'a PageRecord>,
        failures: usize,
    ) -> Self {
        let mut stats = Self::new();
        for page in pages {
            stats.record_page(page);
        }
        stats.pages_failed = failures as u64;
        stats
    }

    pub fn record_page(&mut self, page: &PageRecord) {
        self.pages_succeeded += 1;
        for (name, hit) in &page.tags {
            if hit.found {
                self.tag_counts.increment(name);
            }
        }
        for technology in &page.technologies {
            self.technology_counts.increment(&technology.name);
        }
    }

    pub fn record_failure(&mut self) {
        self.pages_failed += 1;
    }

    pub fn total_pages(&self) -> u64 {
        self.pages_succeeded + self.pages_failed
    }
}

/// Prints statistics to stdout in a formatted manner
///
/// # Arguments
///
/// * `stats` - The statistics to display
/// * `broken_links` - Number of broken links found
pub fn print_statistics(stats: &CrawlStatistics, broken_links: usize) {
    println!("=== Audit Statistics ===\n");

    println!("Overview:");
    println!("  Pages audited: {}", stats.pages_succeeded);
    println!("  Pages failed: {}", stats.pages_failed);
    println!("  Broken links: {}", broken_links);
    println!();

    if !stats.tag_counts.is_empty() {
        println!("Tags Found:");
        for (tag, count) in stats.tag_counts.ranked() {
            println!("  {}: {} {}", tag, count, pages_label(count));
        }
        println!();
    }

    if !stats.technology_counts.is_empty() {
        println!("Technologies Detected:");
        for (technology, count) in stats.technology_counts.ranked() {
            println!("  {}: {} {}", technology, count, pages_label(count));
        }
        println!();
    }

    let total = stats.total_pages();
    let success_rate = if total > 0 {
        (stats.pages_succeeded as f64 / total as f64) * 100.0
    } else {
        0.0
    };

    println!(
        "Success Rate: {:.1}% ({} / {} pages successfully audited)",
        success_rate, stats.pages_succeeded, total
    );
}

fn pages_label(count: u64) -> &'static str {
    if count == 1 {
        "page"
    } else {
        "pages"
    }
}
