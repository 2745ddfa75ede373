//! Pattern registry for tag and technology detection
//!
//! The registry compiles every signature once at startup. It is then shared
//! read-only (behind an `Arc`) by all page tasks.

mod tags;
mod technologies;

use crate::config::CustomTagEntry;
use crate::ConfigError;
use regex::{Regex, RegexBuilder};

/// A compiled tracking tag signature
#[derive(Debug, Clone)]
pub struct TagSignature {
    pub name: String,
    /// Content regexes run against script bodies and sources
    pub patterns: Vec<Regex>,
    /// Substrings that identify the tag's script or beacon URLs
    pub urls: Vec<String>,
    pub category: String,
}

/// A compiled technology fingerprint
#[derive(Debug, Clone)]
pub struct TechnologySignature {
    pub name: String,
    /// Case-insensitive regexes run against the full rendered HTML
    pub patterns: Vec<Regex>,
    /// (meta tag name, value regex) rules
    pub meta: Vec<(String, Regex)>,
    pub category: String,
}

/// All signatures the detector consults
#[derive(Debug, Clone)]
pub struct PatternRegistry {
    tags: Vec<TagSignature>,
    technologies: Vec<TechnologySignature>,
    event_catalog: Vec<(String, String)>,
    tracking_hosts: Vec<String>,
}

impl PatternRegistry {
    /// Builds the registry with every built-in signature
    ///
    /// # Returns
    ///
    /// * `Ok(PatternRegistry)` - All built-in regexes compiled
    /// * `Err(ConfigError::InvalidPattern)` - A built-in regex is malformed
    pub fn builtin() -> Result<Self, ConfigError> {
        let mut registry = Self {
            tags: Vec::with_capacity(tags::TAG_DEFINITIONS.len()),
            technologies: Vec::with_capacity(technologies::TECHNOLOGY_DEFINITIONS.len()),
            event_catalog: technologies::EVENT_CATALOG
                .iter()
                .map(|(event, description)| (event.to_string(), description.to_string()))
                .collect(),
            tracking_hosts: Vec::new(),
        };

        for def in tags::TAG_DEFINITIONS {
            registry.add_tag(TagSignature {
                name: def.name.to_string(),
                patterns: compile_tag_patterns(def.name, def.patterns.iter().copied())?,
                urls: def.urls.iter().map(|u| u.to_string()).collect(),
                category: def.category.to_string(),
            });
        }

        for def in technologies::TECHNOLOGY_DEFINITIONS {
            let patterns = def
                .patterns
                .iter()
                .map(|p| case_insensitive(def.name, p))
                .collect::<Result<Vec<_>, _>>()?;
            let meta = def
                .meta
                .iter()
                .map(|(name, value)| Ok((name.to_string(), case_insensitive(def.name, value)?)))
                .collect::<Result<Vec<_>, ConfigError>>()?;

            registry.technologies.push(TechnologySignature {
                name: def.name.to_string(),
                patterns,
                meta,
                category: def.category.to_string(),
            });
        }

        for host in tags::COLLECTION_HOSTS {
            registry.add_tracking_host(host);
        }

        Ok(registry)
    }

    /// Builds the built-in registry extended with configured custom tags
    pub fn with_custom_tags(custom: &[CustomTagEntry]) -> Result<Self, ConfigError> {
        let mut registry = Self::builtin()?;
        registry.extend_tags(custom)?;
        Ok(registry)
    }

    /// Appends custom tag signatures after the built-in ones
    ///
    /// A custom tag whose name matches a built-in tag is added as a separate
    /// signature; both are reported under the same name.
    pub fn extend_tags(&mut self, custom: &[CustomTagEntry]) -> Result<(), ConfigError> {
        for entry in custom {
            let patterns =
                compile_tag_patterns(&entry.name, entry.patterns.iter().map(String::as_str))?;
            self.add_tag(TagSignature {
                name: entry.name.clone(),
                patterns,
                urls: entry.urls.clone(),
                category: entry.category.clone(),
            });
        }
        Ok(())
    }

    pub fn tags(&self) -> &[TagSignature] {
        &self.tags
    }

    pub fn technologies(&self) -> &[TechnologySignature] {
        &self.technologies
    }

    /// Known data-layer events as (event name, description) pairs
    pub fn event_catalog(&self) -> &[(String, String)] {
        &self.event_catalog
    }

    /// Looks up the description of a catalog event
    pub fn catalog_description(&self, event: &str) -> Option<&str> {
        self.event_catalog
            .iter()
            .find(|(name, _)| name == event)
            .map(|(_, description)| description.as_str())
    }

    /// Returns true if a network request went to a known tracking host
    ///
    /// A request matches when its host equals a tracking host or is a
    /// subdomain of one.
    pub fn is_tracking_request(&self, url: &str) -> bool {
        let host = match crate::url::extract_host(url) {
            Some(host) => host,
            None => return false,
        };

        self.tracking_hosts
            .iter()
            .any(|tracked| host == *tracked || host.ends_with(&format!(".{}", tracked)))
    }

    fn add_tag(&mut self, signature: TagSignature) {
        let hosts: Vec<String> = signature
            .urls
            .iter()
            .filter_map(|u| signature_host(u))
            .collect();
        for host in hosts {
            self.add_tracking_host(&host);
        }
        self.tags.push(signature);
    }

    fn add_tracking_host(&mut self, host: &str) {
        let host = host.to_lowercase();
        if !self.tracking_hosts.contains(&host) {
            self.tracking_hosts.push(host);
        }
    }
}

/// Extracts the host part of a URL signature such as `cdn.segment.com/analytics.js`
///
/// Signatures that are bare file names (`matomo.js`) have no host.
fn signature_host(signature: &str) -> Option<String> {
    let host = signature.split('/').next()?.trim();
    if host.contains('.') && !host.ends_with(".js") {
        Some(host.to_string())
    } else {
        None
    }
}

fn compile_tag_patterns<'a>(
    name: &str,
    patterns: impl Iterator<Item = &'a str>,
) -> Result<Vec<Regex>, ConfigError> {
    patterns
        .map(|p| {
            Regex::new(p).map_err(|e| {
                ConfigError::InvalidPattern(format!("tag '{}' pattern '{}': {}", name, p, e))
            })
        })
        .collect()
}

fn case_insensitive(name: &str, pattern: &str) -> Result<Regex, ConfigError> {
    RegexBuilder::new(pattern)
        .case_insensitive(true)
        .build()
        .map_err(|e| {
            ConfigError::InvalidPattern(format!(
                "technology '{}' pattern '{}': {}",
                name, pattern, e
            ))
        })
}
