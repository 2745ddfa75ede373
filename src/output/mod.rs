//! Output module for audit reports
//!
//! This module handles:
//! - Exporting the finished run as JSON and CSV
//! - Running statistics and the console summary

mod export;
pub mod stats;

pub use export::{export_reports, write_csv_report, write_json_report, CrawlReport, RunMetadata};
pub use stats::{print_statistics, Counts, CrawlStatistics};
