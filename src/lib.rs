//! Site Auditor: a single-domain tag and technology auditor
//!
//! This crate crawls a website with a scripted browser, detects third-party
//! tracking tags and technology fingerprints on every rendered page, and
//! exports the findings as structured reports. Crawls are resumable and
//! memory-bounded.

pub mod config;
pub mod crawler;
pub mod detect;
pub mod output;
pub mod patterns;
pub mod state;
pub mod url;

use thiserror::Error;

/// Main error type for Site Auditor operations
#[derive(Debug, Error)]
pub enum AuditorError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("URL error: {0}")]
    UrlError(#[from] UrlError),

    #[error("Render error: {0}")]
    Render(#[from] crawler::RenderError),

    #[error("Technology detector error: {0}")]
    Detector(#[from] detect::DetectorError),

    #[error("Persistence error: {0}")]
    Persistence(#[from] PersistenceError),

    #[error("Invalid state transition for {url}: {from:?} -> {to:?}")]
    InvalidTransition {
        url: String,
        from: state::UrlState,
        to: state::UrlState,
    },

    #[error("Crawl interrupted; state saved for resume")]
    Interrupted,

    #[error("Export error: {0}")]
    Export(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Invalid pattern: {0}")]
    InvalidPattern(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing domain in URL")]
    MissingDomain,
}

/// Errors raised while saving or loading crawl state and overflow files
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("IO error on {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("Malformed JSON in {path}: {source}")]
    Json {
        path: String,
        source: serde_json::Error,
    },
}

/// Result type alias for Site Auditor operations
pub type Result<T> = std::result::Result<T, AuditorError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use config::Config;
pub use patterns::PatternRegistry;
pub use state::{CrawlTarget, UrlState};
pub use crate::url::{extract_host, normalize_url, UrlPolicy};
