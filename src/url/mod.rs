//! URL handling module for Site Auditor
//!
//! This module provides URL normalization, host extraction, and the
//! scope policy that decides which discovered URLs may enter the frontier.

mod domain;
mod normalize;

use crate::config::Config;
use crate::ConfigError;
use regex::Regex;

// Re-export main functions
pub use domain::{extract_host, host_slug};
pub use normalize::normalize_url;

/// Compiled URL scope rules for one crawl
///
/// Built once from the configuration and shared read-only by the
/// coordinator and every page task.
#[derive(Debug, Clone)]
pub struct UrlPolicy {
    base_host: String,
    include: Vec<Regex>,
    exclude: Vec<Regex>,
    skip_extensions: Vec<String>,
}

impl UrlPolicy {
    /// Builds the policy from a validated configuration
    ///
    /// The base host is taken from the crawler's start URL.
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        let base_host = extract_host(config.crawler.start_url.trim()).ok_or_else(|| {
            ConfigError::InvalidUrl(format!(
                "start_url '{}' has no host",
                config.crawler.start_url
            ))
        })?;

        Self::new(
            &base_host,
            &config.filters.include,
            &config.filters.exclude,
            &config.filters.skip_extensions,
        )
    }

    /// Builds a policy from raw rule lists
    ///
    /// # Arguments
    ///
    /// * `base_host` - The only host that is in scope
    /// * `include` - Regexes; when non-empty a URL must match one of them
    /// * `exclude` - Regexes; a URL matching any of them is out of scope
    /// * `skip_extensions` - Path suffixes that are never crawled
    ///
    /// # Returns
    ///
    /// * `Ok(UrlPolicy)` - All regexes compiled
    /// * `Err(ConfigError::InvalidPattern)` - A regex failed to compile
    pub fn new(
        base_host: &str,
        include: &[String],
        exclude: &[String],
        skip_extensions: &[String],
    ) -> Result<Self, ConfigError> {
        Ok(Self {
            base_host: base_host.to_lowercase(),
            include: compile_all("include", include)?,
            exclude: compile_all("exclude", exclude)?,
            skip_extensions: skip_extensions.iter().map(|e| e.to_lowercase()).collect(),
        })
    }

    /// The host every in-scope URL must have
    pub fn base_host(&self) -> &str {
        &self.base_host
    }

    /// Returns true if the URL may be crawled
    pub fn in_scope(&self, url: &str) -> bool {
        in_scope(
            url,
            &self.base_host,
            &self.exclude,
            &self.include,
            &self.skip_extensions,
        )
    }
}

/// Decides whether a URL is in scope for the crawl
///
/// The checks run in this order, and the first failing check rejects the URL:
/// 1. The host must equal `base_host`
/// 2. No exclude regex may match the URL
/// 3. If include regexes exist, at least one must match
/// 4. The path must not end with a skip extension (case-insensitive)
///
/// # Examples
///
/// ```
/// use site_auditor::url::in_scope;
/// use regex::Regex;
///
/// let exclude = vec![Regex::new("/admin").unwrap()];
/// let skip = vec![".pdf".to_string()];
///
/// assert!(in_scope("https://x.com/about", "x.com", &exclude, &[], &skip));
/// assert!(!in_scope("https://x.com/admin/users", "x.com", &exclude, &[], &skip));
/// assert!(!in_scope("https://x.com/guide.PDF", "x.com", &exclude, &[], &skip));
/// assert!(!in_scope("https://other.com/", "x.com", &exclude, &[], &skip));
/// ```
pub fn in_scope(
    url: &str,
    base_host: &str,
    exclude: &[Regex],
    include: &[Regex],
    skip_extensions: &[String],
) -> bool {
    let parsed = match ::url::Url::parse(url) {
        Ok(parsed) => parsed,
        Err(_) => return false,
    };

    match parsed.host_str() {
        Some(host) if host.eq_ignore_ascii_case(base_host) => {}
        _ => return false,
    }

    if exclude.iter().any(|re| re.is_match(url)) {
        return false;
    }

    if !include.is_empty() && !include.iter().any(|re| re.is_match(url)) {
        return false;
    }

    let path = parsed.path().to_lowercase();
    !skip_extensions
        .iter()
        .any(|ext| path.ends_with(&ext.to_lowercase()))
}

fn compile_all(label: &str, patterns: &[String]) -> Result<Vec<Regex>, ConfigError> {
    patterns
        .iter()
        .map(|p| {
            Regex::new(p).map_err(|e| {
                ConfigError::InvalidPattern(format!("{} pattern '{}': {}", label, p, e))
            })
        })
        .collect()
}
