use crate::patterns::PatternRegistry;
use serde::{Deserialize, Serialize};

/// How a technology was identified
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DetectionMethod {
    /// Reported by the external detector
    External,
    /// Matched by a built-in fingerprint
    Fallback,
}

/// A technology identified on a page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetectedTechnology {
    pub name: String,
    pub category: String,
    pub method: DetectionMethod,
}

/// Identifies technologies from built-in fingerprints
///
/// A technology is found when any of its regexes matches the rendered HTML
/// (case-insensitive), or when one of its meta rules matches a meta tag of
/// that name (names compared case-insensitively).
///
/// # Arguments
///
/// * `registry` - The pattern registry holding the fingerprints
/// * `html` - The full rendered HTML
/// * `meta_tags` - (name, content) pairs from the page's `<meta>` elements
pub fn detect_technologies_fallback(
    registry: &PatternRegistry,
    html: &str,
    meta_tags: &[(String, String)],
) -> Vec<DetectedTechnology> {
    registry
        .technologies()
        .iter()
        .filter(|signature| {
            signature.patterns.iter().any(|re| re.is_match(html))
                || signature.meta.iter().any(|(meta_name, value_re)| {
                    meta_tags.iter().any(|(name, content)| {
                        name.eq_ignore_ascii_case(meta_name) && value_re.is_match(content)
                    })
                })
        })
        .map(|signature| DetectedTechnology {
            name: signature.name.clone(),
            category: signature.category.clone(),
            method: DetectionMethod::Fallback,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(found: &[DetectedTechnology]) -> Vec<&str> {
        found.iter().map(|t| t.name.as_str()).collect()
    }

    #[test]
    fn test_wordpress_by_path() {
        let registry = PatternRegistry::builtin().unwrap();
        let html = r#"<link rel="stylesheet" href="/wp-content/themes/x/style.css">"#;
        let found = detect_technologies_fallback(&registry, html, &[]);
        assert_eq!(names(&found), vec!["wordpress"]);
        assert_eq!(found[0].category, "CMS");
        assert_eq!(found[0].method, DetectionMethod::Fallback);
    }

    #[test]
    fn test_wordpress_by_meta_generator() {
        let registry = PatternRegistry::builtin().unwrap();
        let meta = vec![("Generator".to_string(), "WordPress 6.4".to_string())];
        let found = detect_technologies_fallback(&registry, "<html></html>", &meta);
        assert_eq!(names(&found), vec!["wordpress"]);
    }

    #[test]
    fn test_case_insensitive_match() {
        let registry = PatternRegistry::builtin().unwrap();
        let html = r#"<script src="/static/JQUERY.min.js"></script><div id="__next"></div><script id="__NEXT_DATA__"></script>"#;
        let found = detect_technologies_fallback(&registry, html, &[]);
        assert_eq!(names(&found), vec!["next_js", "jquery"]);
    }

    #[test]
    fn test_nothing_found() {
        let registry = PatternRegistry::builtin().unwrap();
        let found = detect_technologies_fallback(&registry, "<html><body>plain</body></html>", &[]);
        assert!(found.is_empty());
    }
}
