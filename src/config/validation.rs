use crate::config::types::{
    Config, CrawlerConfig, ExternalDetectorKind, OutputConfig, TechnologyConfig,
    DEFAULT_CONCURRENT_PAGES, DEFAULT_MAX_DATA_LAYER_EVENTS, DEFAULT_MAX_PAGES,
    DEFAULT_MEMORY_THRESHOLD, DEFAULT_PROGRESS_INTERVAL, MAX_CONCURRENT_PAGES,
};
use crate::ConfigError;
use regex::Regex;
use url::Url;

/// Supported report formats
pub const SUPPORTED_FORMATS: &[&str] = &["json", "csv"];

/// Validates the entire configuration
///
/// Values with a safe default are corrected in place with a warning.
/// Problems without one (unusable start URL, invalid regex) are errors.
pub fn validate(config: &mut Config) -> Result<(), ConfigError> {
    validate_crawler_config(&mut config.crawler)?;
    validate_patterns("include", &config.filters.include)?;
    validate_patterns("exclude", &config.filters.exclude)?;
    validate_technology_config(&mut config.technology)?;
    validate_output_config(&mut config.output)?;
    for tag in &config.custom_tags {
        if tag.name.trim().is_empty() {
            return Err(ConfigError::Validation(
                "custom tag name cannot be empty".to_string(),
            ));
        }
        if tag.patterns.is_empty() && tag.urls.is_empty() {
            return Err(ConfigError::Validation(format!(
                "custom tag '{}' needs at least one pattern or url",
                tag.name
            )));
        }
        validate_patterns(&tag.name, &tag.patterns)?;
    }
    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &mut CrawlerConfig) -> Result<(), ConfigError> {
    if config.start_url.trim().is_empty() {
        return Err(ConfigError::InvalidUrl(
            "start_url is required (config file or --url)".to_string(),
        ));
    }

    let url = Url::parse(config.start_url.trim()).map_err(|e| {
        ConfigError::InvalidUrl(format!("Invalid start_url '{}': {}", config.start_url, e))
    })?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "start_url '{}' must use http or https",
            config.start_url
        )));
    }

    if url.host_str().is_none() {
        return Err(ConfigError::InvalidUrl(format!(
            "start_url '{}' has no host",
            config.start_url
        )));
    }

    if config.concurrent_pages < 1 || config.concurrent_pages > MAX_CONCURRENT_PAGES {
        let corrected = if config.concurrent_pages == 0 {
            DEFAULT_CONCURRENT_PAGES
        } else {
            MAX_CONCURRENT_PAGES
        };
        tracing::warn!(
            "concurrent_pages must be between 1 and {}, got {}; using {}",
            MAX_CONCURRENT_PAGES,
            config.concurrent_pages,
            corrected
        );
        config.concurrent_pages = corrected;
    }

    if config.max_pages == 0 {
        tracing::warn!("max_pages must be >= 1; using {}", DEFAULT_MAX_PAGES);
        config.max_pages = DEFAULT_MAX_PAGES;
    }

    if config.progress_interval == 0 {
        tracing::warn!(
            "progress_interval must be >= 1; using {}",
            DEFAULT_PROGRESS_INTERVAL
        );
        config.progress_interval = DEFAULT_PROGRESS_INTERVAL;
    }

    if config.memory_threshold == 0 {
        tracing::warn!(
            "memory_threshold must be >= 1; using {}",
            DEFAULT_MEMORY_THRESHOLD
        );
        config.memory_threshold = DEFAULT_MEMORY_THRESHOLD;
    }

    if config.max_data_layer_events == 0 {
        tracing::warn!(
            "max_data_layer_events must be >= 1; using {}",
            DEFAULT_MAX_DATA_LAYER_EVENTS
        );
        config.max_data_layer_events = DEFAULT_MAX_DATA_LAYER_EVENTS;
    }

    if config.page_timeout_ms == 0 {
        return Err(ConfigError::Validation(
            "page_timeout_ms must be > 0".to_string(),
        ));
    }

    Ok(())
}

/// Compiles each regex once to surface syntax errors before the crawl starts
fn validate_patterns(label: &str, patterns: &[String]) -> Result<(), ConfigError> {
    for pattern in patterns {
        Regex::new(pattern).map_err(|e| {
            ConfigError::InvalidPattern(format!("{} pattern '{}': {}", label, pattern, e))
        })?;
    }
    Ok(())
}

/// Validates the external technology detector settings
fn validate_technology_config(config: &mut TechnologyConfig) -> Result<(), ConfigError> {
    if config.external_detector == ExternalDetectorKind::Http {
        match config.endpoint.as_deref() {
            Some(endpoint) => {
                Url::parse(endpoint).map_err(|e| {
                    ConfigError::InvalidUrl(format!(
                        "Invalid technology endpoint '{}': {}",
                        endpoint, e
                    ))
                })?;
            }
            None => {
                tracing::warn!(
                    "external detector 'http' has no endpoint; using built-in patterns only"
                );
                config.external_detector = ExternalDetectorKind::None;
            }
        }
    }

    if config.external_detector == ExternalDetectorKind::Wappalyzer
        && config.command.trim().is_empty()
    {
        tracing::warn!("empty wappalyzer command; using built-in patterns only");
        config.external_detector = ExternalDetectorKind::None;
    }

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &mut OutputConfig) -> Result<(), ConfigError> {
    if config.prefix.trim().is_empty() {
        return Err(ConfigError::Validation(
            "output prefix cannot be empty".to_string(),
        ));
    }

    if config.state_dir.trim().is_empty() {
        return Err(ConfigError::Validation(
            "state_dir cannot be empty".to_string(),
        ));
    }

    let mut formats = Vec::new();
    for format in &config.formats {
        let format = format.trim().to_lowercase();
        if SUPPORTED_FORMATS.contains(&format.as_str()) {
            if !formats.contains(&format) {
                formats.push(format);
            }
        } else {
            tracing::warn!("Unsupported report format '{}' ignored", format);
        }
    }

    if formats.is_empty() {
        tracing::warn!("No supported report format selected; using json");
        formats.push("json".to_string());
    }
    config.formats = formats;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CustomTagEntry;

    fn valid_config() -> Config {
        Config::for_start_url("https://example.com/")
    }

    #[test]
    fn test_valid_config_passes() {
        let mut config = valid_config();
        assert!(validate(&mut config).is_ok());
    }

    #[test]
    fn test_concurrency_clamped_high() {
        let mut config = valid_config();
        config.crawler.concurrent_pages = 50;
        validate(&mut config).unwrap();
        assert_eq!(config.crawler.concurrent_pages, 10);
    }

    #[test]
    fn test_concurrency_zero_uses_default() {
        let mut config = valid_config();
        config.crawler.concurrent_pages = 0;
        validate(&mut config).unwrap();
        assert_eq!(config.crawler.concurrent_pages, DEFAULT_CONCURRENT_PAGES);
    }

    #[test]
    fn test_zero_limits_corrected() {
        let mut config = valid_config();
        config.crawler.max_pages = 0;
        config.crawler.progress_interval = 0;
        config.crawler.memory_threshold = 0;
        validate(&mut config).unwrap();
        assert_eq!(config.crawler.max_pages, DEFAULT_MAX_PAGES);
        assert_eq!(config.crawler.progress_interval, DEFAULT_PROGRESS_INTERVAL);
        assert_eq!(config.crawler.memory_threshold, DEFAULT_MEMORY_THRESHOLD);
    }

    #[test]
    fn test_invalid_start_url_is_fatal() {
        let mut config = Config::for_start_url("not a url");
        assert!(matches!(
            validate(&mut config),
            Err(ConfigError::InvalidUrl(_))
        ));

        let mut config = Config::for_start_url("ftp://example.com/");
        assert!(matches!(
            validate(&mut config),
            Err(ConfigError::InvalidUrl(_))
        ));
    }

    #[test]
    fn test_invalid_regex_is_fatal() {
        let mut config = valid_config();
        config.filters.exclude.push("([unclosed".to_string());
        assert!(matches!(
            validate(&mut config),
            Err(ConfigError::InvalidPattern(_))
        ));
    }

    #[test]
    fn test_unsupported_formats_dropped() {
        let mut config = valid_config();
        config.output.formats = vec!["HTML".to_string(), "csv".to_string(), "csv".to_string()];
        validate(&mut config).unwrap();
        assert_eq!(config.output.formats, vec!["csv".to_string()]);

        config.output.formats = vec!["html".to_string()];
        validate(&mut config).unwrap();
        assert_eq!(config.output.formats, vec!["json".to_string()]);
    }

    #[test]
    fn test_http_detector_without_endpoint_disabled() {
        let mut config = valid_config();
        config.technology.external_detector = ExternalDetectorKind::Http;
        validate(&mut config).unwrap();
        assert_eq!(
            config.technology.external_detector,
            ExternalDetectorKind::None
        );
    }

    #[test]
    fn test_custom_tag_requires_signature() {
        let mut config = valid_config();
        config.custom_tags.push(CustomTagEntry {
            name: "empty".to_string(),
            patterns: vec![],
            urls: vec![],
            category: "Custom".to_string(),
        });
        assert!(matches!(
            validate(&mut config),
            Err(ConfigError::Validation(_))
        ));
    }
}
