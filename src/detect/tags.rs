use crate::patterns::PatternRegistry;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// A tracking tag found on a page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagHit {
    pub found: bool,
    /// Account/container identifiers captured by the tag's regexes
    pub ids: BTreeSet<String>,
    pub category: String,
}

/// Tag name to hit; tags that were not found are absent
pub type TagFindings = BTreeMap<String, TagHit>;

/// Detects tracking tags in a page's script content
///
/// `content` is the concatenation of every inline script body and every
/// script source URL on the page.
///
/// # Matching Rules
///
/// - A tag is found if any of its regexes matches, or any of its URL
///   substrings appears verbatim in `content`
/// - Capture groups from every matching regex are unioned into `ids`
/// - A regex without capture groups contributes its whole match
/// - A URL-only hit reports the tag with an empty id set
///
/// # Arguments
///
/// * `registry` - The pattern registry holding the tag signatures
/// * `content` - Script bodies and sources joined together
///
/// # Returns
///
/// Mapping of found tag names to their hits
pub fn detect_tags(registry: &PatternRegistry, content: &str) -> TagFindings {
    let mut findings = TagFindings::new();

    for signature in registry.tags() {
        let mut found = false;
        let mut ids = BTreeSet::new();

        for regex in &signature.patterns {
            if regex.captures_len() > 1 {
                for captures in regex.captures_iter(content) {
                    found = true;
                    for group in captures.iter().skip(1).flatten() {
                        ids.insert(group.as_str().to_string());
                    }
                }
            } else {
                for m in regex.find_iter(content) {
                    found = true;
                    ids.insert(m.as_str().to_string());
                }
            }
        }

        if !found {
            found = signature.urls.iter().any(|u| content.contains(u.as_str()));
        }

        if found {
            // Custom tags may share a name with a built-in one
            findings
                .entry(signature.name.clone())
                .and_modify(|hit| hit.ids.extend(ids.iter().cloned()))
                .or_insert_with(|| TagHit {
                    found: true,
                    ids,
                    category: signature.category.clone(),
                });
        }
    }

    findings
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CustomTagEntry;

    fn registry() -> PatternRegistry {
        PatternRegistry::builtin().unwrap()
    }

    #[test]
    fn test_gtm_container_id() {
        let findings = detect_tags(&registry(), "(window,document,'script','dataLayer','GTM-ABC123');");
        let hit = &findings["google_tag_manager"];
        assert!(hit.found);
        assert_eq!(hit.category, "Tag Management");
        assert!(hit.ids.contains("GTM-ABC123"));
    }

    #[test]
    fn test_facebook_pixel_capture_group() {
        let findings = detect_tags(&registry(), "fbq('init', '123456789'); fbq('track', 'PageView');");
        let hit = &findings["facebook_pixel"];
        assert_eq!(hit.category, "Advertising");
        assert_eq!(hit.ids.len(), 1);
        assert!(hit.ids.contains("123456789"));
    }

    #[test]
    fn test_url_only_hit_has_no_ids() {
        let content = "https://cdn.heapanalytics.com/js/heap-123.js";
        let findings = detect_tags(&registry(), content);
        let hit = &findings["heap"];
        assert!(hit.found);
        assert!(hit.ids.is_empty());
    }

    #[test]
    fn test_ids_are_unioned_across_patterns() {
        let content = "ttq.load('C123ABC'); var cfg = {tiktok_pixel_code: 'C999XYZ'};";
        let findings = detect_tags(&registry(), content);
        let ids: Vec<_> = findings["tiktok_pixel"].ids.iter().cloned().collect();
        assert_eq!(ids, vec!["C123ABC".to_string(), "C999XYZ".to_string()]);
    }

    #[test]
    fn test_duplicate_ids_collapse() {
        let content = "fbq('init', '42'); fbq('init', '42');";
        let findings = detect_tags(&registry(), content);
        assert_eq!(findings["facebook_pixel"].ids.len(), 1);
    }

    #[test]
    fn test_absent_tags_not_reported() {
        let findings = detect_tags(&registry(), "console.log('hello');");
        assert!(findings.is_empty());
    }

    #[test]
    fn test_custom_tag_shares_name_with_builtin() {
        let mut registry = registry();
        registry
            .extend_tags(&[CustomTagEntry {
                name: "facebook_pixel".to_string(),
                patterns: vec![r"fbPixelId=(\d+)".to_string()],
                urls: vec![],
                category: "Custom".to_string(),
            }])
            .unwrap();

        let findings = detect_tags(&registry, "fbq('init', '1'); fbPixelId=2");
        let hit = &findings["facebook_pixel"];
        assert_eq!(hit.category, "Advertising");
        assert!(hit.ids.contains("1"));
        assert!(hit.ids.contains("2"));
    }
}
