use url::Url;

/// Extracts the host from a URL string
///
/// This function parses the URL and returns its host converted to lowercase.
/// Unparseable URLs and URLs without a host return None.
///
/// # Examples
///
/// ```
/// use site_auditor::url::extract_host;
///
/// assert_eq!(extract_host("https://EXAMPLE.COM/path"), Some("example.com".to_string()));
/// assert_eq!(extract_host("https://sub.example.com:8080/"), Some("sub.example.com".to_string()));
/// assert_eq!(extract_host("mailto:someone@example.com"), None);
/// ```
pub fn extract_host(url: &str) -> Option<String> {
    Url::parse(url)
        .ok()?
        .host_str()
        .map(|h| h.to_lowercase())
}

/// Makes a host safe to embed in a file name
pub fn host_slug(host: &str) -> String {
    host.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '.' || c == '-' { c } else { '_' })
        .collect()
}
