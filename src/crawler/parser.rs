//! HTML parser for rendered pages
//!
//! This module handles parsing rendered HTML to extract:
//! - Links to follow (from <a> tags and canonical links)
//! - SEO and Open Graph metadata
//! - Meta tags for technology fingerprinting
//! - Inline script bodies and script sources for tag detection

use crate::state::PageMetadata;
use scraper::{ElementRef, Html, Selector};
use url::Url;

/// Script content of a page
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageScripts {
    /// Bodies of inline `<script>` elements
    pub inline: Vec<String>,
    /// Resolved `src` attributes of external scripts
    pub sources: Vec<String>,
}

/// Extracted information from a rendered page
#[derive(Debug, Clone, Default)]
pub struct ParsedPage {
    pub metadata: PageMetadata,

    /// (name or property, content) of every `<meta>` element with content
    pub meta_tags: Vec<(String, String)>,

    pub scripts: PageScripts,

    /// All links found on the page (absolute URLs)
    pub links: Vec<String>,
}

impl ParsedPage {
    /// Inline script bodies and script sources joined into one searchable string
    pub fn script_content(&self) -> String {
        self.scripts
            .inline
            .iter()
            .chain(self.scripts.sources.iter())
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Parses rendered HTML
///
/// # Link Extraction Rules
///
/// **Include:**
/// - `<a href="...">` tags anywhere in the document
/// - `<link rel="canonical" href="...">`
///
/// **Exclude:**
/// - `<a href="..." download>`
/// - `javascript:`, `mailto:`, `tel:` links
/// - Data URIs and fragment-only links
///
/// # Arguments
///
/// * `html` - The rendered HTML content
/// * `base_url` - The page's final URL, for resolving relative links
///
/// # Example
///
/// ```
/// use site_auditor::crawler::parse_page;
/// use url::Url;
///
/// let html = r#"<html><head><title>Test</title></head><body><a href="/page">Link</a></body></html>"#;
/// let base_url = Url::parse("https://example.com/").unwrap();
/// let parsed = parse_page(html, &base_url);
/// assert_eq!(parsed.metadata.title, Some("Test".to_string()));
/// assert_eq!(parsed.links, vec!["https://example.com/page".to_string()]);
/// ```
pub fn parse_page(html: &str, base_url: &Url) -> ParsedPage {
    let document = Html::parse_document(html);
    let meta_tags = extract_meta_tags(&document);

    let mut metadata = PageMetadata {
        title: extract_title(&document),
        h1: extract_texts(&document, "h1"),
        h2: extract_texts(&document, "h2"),
        canonical: extract_canonical(&document, base_url),
        ..Default::default()
    };

    for (name, content) in &meta_tags {
        let slot = match name.to_lowercase().as_str() {
            "description" => &mut metadata.description,
            "og:title" => &mut metadata.og_title,
            "og:description" => &mut metadata.og_description,
            "og:image" => &mut metadata.og_image,
            "og:type" => &mut metadata.og_type,
            _ => continue,
        };
        if slot.is_none() {
            *slot = Some(content.clone());
        }
    }

    ParsedPage {
        metadata,
        meta_tags,
        scripts: extract_scripts(&document, base_url),
        links: extract_links(&document, base_url),
    }
}

/// Extracts the page title from the HTML document
fn extract_title(document: &Html) -> Option<String> {
    let title_selector = Selector::parse("title").ok()?;

    document
        .select(&title_selector)
        .next()
        .map(element_text)
        .filter(|s| !s.is_empty())
}

fn extract_texts(document: &Html, selector: &str) -> Vec<String> {
    let selector = match Selector::parse(selector) {
        Ok(selector) => selector,
        Err(_) => return Vec::new(),
    };

    document
        .select(&selector)
        .map(element_text)
        .filter(|s| !s.is_empty())
        .collect()
}

/// Collapses an element's text nodes and whitespace into one line
fn element_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn extract_canonical(document: &Html, base_url: &Url) -> Option<String> {
    let selector = Selector::parse("link[rel='canonical'][href]").ok()?;
    document
        .select(&selector)
        .filter_map(|element| element.value().attr("href"))
        .find_map(|href| resolve_link(href, base_url))
}

fn extract_meta_tags(document: &Html) -> Vec<(String, String)> {
    let selector = match Selector::parse("meta[content]") {
        Ok(selector) => selector,
        Err(_) => return Vec::new(),
    };

    document
        .select(&selector)
        .filter_map(|element| {
            let value = element.value();
            let name = value
                .attr("name")
                .or_else(|| value.attr("property"))
                .or_else(|| value.attr("http-equiv"))?;
            let content = value.attr("content")?;
            Some((name.trim().to_string(), content.trim().to_string()))
        })
        .collect()
}

fn extract_scripts(document: &Html, base_url: &Url) -> PageScripts {
    let mut scripts = PageScripts::default();
    let selector = match Selector::parse("script") {
        Ok(selector) => selector,
        Err(_) => return scripts,
    };

    for element in document.select(&selector) {
        match element.value().attr("src") {
            Some(src) => {
                let src = src.trim();
                if src.is_empty() {
                    continue;
                }
                let resolved = base_url
                    .join(src)
                    .map(|u| u.to_string())
                    .unwrap_or_else(|_| src.to_string());
                scripts.sources.push(resolved);
            }
            None => {
                let body = element.text().collect::<String>();
                if !body.trim().is_empty() {
                    scripts.inline.push(body);
                }
            }
        }
    }

    scripts
}

/// Extracts all valid links from the HTML document
fn extract_links(document: &Html, base_url: &Url) -> Vec<String> {
    let mut links = Vec::new();

    // Extract links from <a> tags
    if let Ok(a_selector) = Selector::parse("a[href]") {
        for element in document.select(&a_selector) {
            // Skip if it has the download attribute
            if element.value().attr("download").is_some() {
                continue;
            }

            if let Some(href) = element.value().attr("href") {
                if let Some(absolute_url) = resolve_link(href, base_url) {
                    links.push(absolute_url);
                }
            }
        }
    }

    // Extract canonical link
    if let Ok(canonical_selector) = Selector::parse("link[rel='canonical'][href]") {
        for element in document.select(&canonical_selector) {
            if let Some(href) = element.value().attr("href") {
                if let Some(absolute_url) = resolve_link(href, base_url) {
                    links.push(absolute_url);
                }
            }
        }
    }

    links
}

/// Resolves a link href to an absolute URL and validates it
///
/// Returns None if the link should be excluded:
/// - javascript:, mailto:, tel: schemes
/// - data: URIs
/// - Invalid URLs
/// - Non-HTTP(S) URLs after resolution
fn resolve_link(href: &str, base_url: &Url) -> Option<String> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    let lower = href.to_ascii_lowercase();
    if lower.starts_with("javascript:")
        || lower.starts_with("mailto:")
        || lower.starts_with("tel:")
        || lower.starts_with("data:")
    {
        return None;
    }

    match base_url.join(href) {
        Ok(absolute_url) => {
            if absolute_url.scheme() == "http" || absolute_url.scheme() == "https" {
                Some(absolute_url.to_string())
            } else {
                None
            }
        }
        Err(_) => None,
    }
}
