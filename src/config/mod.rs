//! Configuration module for Site Auditor
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//! The resolved [`Config`] is built once at startup and shared read-only.
//!
//! # Example
//!
//! ```no_run
//! use site_auditor::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("audit.toml")).unwrap();
//! println!("Auditor will crawl up to {} pages", config.crawler.max_pages);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    BrowserConfig, Config, CrawlerConfig, CustomTagEntry, ExternalDetectorKind, FilterConfig,
    OutputConfig, TechnologyConfig,
};

// Re-export parser functions
pub use parser::{load_config, read_config};
pub use validation::{validate, SUPPORTED_FORMATS};
