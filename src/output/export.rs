//! Report exporters
//!
//! A finished run is written as `<prefix>_<timestamp>.json` (full dump) and
//! `<prefix>_<timestamp>.csv` (one row per page).

use crate::config::OutputConfig;
use crate::output::stats::CrawlStatistics;
use crate::state::{BrokenLinkRecord, PageRecord};
use crate::Result;
use chrono::{DateTime, Utc};
use csv::Writer;
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Describes the run a report was produced by
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunMetadata {
    pub start_url: String,
    pub domain: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub total_pages: usize,
    pub total_broken_links: usize,
    pub max_pages: usize,
    pub max_depth: u32,
    pub resumed: bool,
}

/// Everything a run produced
#[derive(Debug, Clone, Serialize)]
pub struct CrawlReport {
    pub metadata: RunMetadata,
    /// Page records in completion order
    pub pages: Vec<PageRecord>,
    pub broken_links: Vec<BrokenLinkRecord>,
    pub statistics: CrawlStatistics,
}

const CSV_HEADERS: [&str; 10] = [
    "url",
    "depth",
    "status",
    "title",
    "tag_count",
    "tags",
    "technologies",
    "tracking_requests",
    "internal_links",
    "load_time_ms",
];

pub fn write_json_report(report: &CrawlReport, path: &Path) -> Result<()> {
    debug!("Writing JSON report to {}", path.display());

    let mut writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(&mut writer, report)?;
    writer.flush()?;

    info!(
        "Wrote {} pages to JSON report: {}",
        report.pages.len(),
        path.display()
    );
    Ok(())
}

pub fn write_csv_report(report: &CrawlReport, path: &Path) -> Result<()> {
    debug!("Writing CSV report to {}", path.display());

    let mut wtr = Writer::from_path(path)?;
    wtr.write_record(CSV_HEADERS)?;

    for page in &report.pages {
        let found_tags: Vec<&str> = page
            .tags
            .iter()
            .filter(|(_, hit)| hit.found)
            .map(|(name, _)| name.as_str())
            .collect();

        wtr.write_record([
            page.url.clone(),
            page.depth.to_string(),
            page.status.to_string(),
            page.metadata.title.clone().unwrap_or_default(),
            found_tags.len().to_string(),
            found_tags.join("; "),
            page.technology_names().join("; "),
            page.tracking_requests.len().to_string(),
            page.internal_links.to_string(),
            page.load_time_ms().map(|ms| ms.to_string()).unwrap_or_default(),
        ])?;
    }

    wtr.flush()?;
    info!(
        "Wrote {} pages to CSV report: {}",
        report.pages.len(),
        path.display()
    );
    Ok(())
}

/// Writes the report in every configured format
///
/// # Returns
///
/// The paths written, in format order
pub fn export_reports(report: &CrawlReport, output: &OutputConfig) -> Result<Vec<PathBuf>> {
    let timestamp = report.metadata.finished_at.format("%Y%m%d_%H%M%S");
    let base = format!("{}_{}", output.prefix, timestamp);

    if let Some(parent) = Path::new(&base).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let mut written = Vec::new();
    for format in &output.formats {
        let path = PathBuf::from(format!("{}.{}", base, format));
        match format.as_str() {
            "json" => write_json_report(report, &path)?,
            "csv" => write_csv_report(report, &path)?,
            other => {
                warn!("Skipping unsupported report format '{}'", other);
                continue;
            }
        }
        written.push(path);
    }

    Ok(written)
}
