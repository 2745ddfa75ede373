use crate::UrlError;
use url::Url;

/// Normalizes a URL to the form used for every visited/frontier lookup
///
/// # Normalization Steps
///
/// 1. Parse the URL; reject if malformed
/// 2. Accept only `http` and `https`
/// 3. Rebuild as `scheme://host[:port]/path[?query]`
///    - the host is whatever URL parsing canonicalizes it to
///    - a non-default port is kept, a default one dropped
/// 4. Remove the fragment
/// 5. Remove trailing slashes from the path, except for the root `/`
/// 6. Remove an empty query string (trailing `?`)
///
/// The operation is idempotent.
///
/// # Arguments
///
/// * `url_str` - The absolute URL string to normalize
///
/// # Returns
///
/// * `Ok(String)` - Normalized URL
/// * `Err(UrlError)` - Failed to parse or normalize the URL
///
/// # Examples
///
/// ```
/// use site_auditor::url::normalize_url;
///
/// let url = normalize_url("http://example.com/page/#top").unwrap();
/// assert_eq!(url, "http://example.com/page");
/// ```
pub fn normalize_url(url_str: &str) -> Result<String, UrlError> {
    let url = Url::parse(url_str.trim()).map_err(|e| UrlError::Parse(e.to_string()))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(format!(
            "Only HTTP and HTTPS schemes are supported, got: {}",
            url.scheme()
        )));
    }

    let host = url.host_str().ok_or(UrlError::MissingDomain)?;

    let mut normalized = format!("{}://{}", url.scheme(), host);
    if let Some(port) = url.port() {
        normalized.push(':');
        normalized.push_str(&port.to_string());
    }

    normalized.push_str(&normalize_path(url.path()));

    if let Some(query) = url.query() {
        if !query.is_empty() {
            normalized.push('?');
            normalized.push_str(query);
        }
    }

    Ok(normalized)
}

/// Removes trailing slashes; an empty result becomes the root path
fn normalize_path(path: &str) -> String {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trailing_slash_collapses() {
        let with_slash = normalize_url("http://x.com/a/").unwrap();
        let without = normalize_url("http://x.com/a").unwrap();
        assert_eq!(with_slash, without);
        assert_eq!(with_slash, "http://x.com/a");
    }

    #[test]
    fn test_keep_root_slash() {
        assert_eq!(
            normalize_url("https://example.com/").unwrap(),
            "https://example.com/"
        );
    }

    #[test]
    fn test_empty_path_becomes_root() {
        assert_eq!(
            normalize_url("https://example.com").unwrap(),
            "https://example.com/"
        );
    }

    #[test]
    fn test_scheme_is_preserved() {
        assert_eq!(
            normalize_url("http://example.com/page").unwrap(),
            "http://example.com/page"
        );
    }

    #[test]
    fn test_remove_fragment() {
        assert_eq!(
            normalize_url("https://example.com/page#section").unwrap(),
            "https://example.com/page"
        );
    }

    #[test]
    fn test_query_kept_verbatim() {
        assert_eq!(
            normalize_url("https://example.com/search/?q=shoes&b=2").unwrap(),
            "https://example.com/search?q=shoes&b=2"
        );
    }

    #[test]
    fn test_empty_query_removed() {
        assert_eq!(
            normalize_url("https://example.com/page?").unwrap(),
            "https://example.com/page"
        );
    }

    #[test]
    fn test_path_case_preserved() {
        assert_eq!(
            normalize_url("https://EXAMPLE.COM/Page").unwrap(),
            "https://example.com/Page"
        );
    }

    #[test]
    fn test_port_kept() {
        assert_eq!(
            normalize_url("http://127.0.0.1:8080/a/").unwrap(),
            "http://127.0.0.1:8080/a"
        );
        assert_eq!(
            normalize_url("https://example.com:443/a").unwrap(),
            "https://example.com/a"
        );
    }

    #[test]
    fn test_idempotent() {
        let inputs = [
            "http://x.com/a/",
            "http://x.com/a//",
            "https://example.com",
            "https://example.com/a/b/?x=1#frag",
            "http://127.0.0.1:3000/",
            "https://example.com/%7Euser/",
        ];

        for input in inputs {
            let once = normalize_url(input).unwrap();
            let twice = normalize_url(&once).unwrap();
            assert_eq!(once, twice, "not idempotent for {}", input);
        }
    }

    #[test]
    fn test_invalid_scheme() {
        let result = normalize_url("ftp://example.com/page");
        assert!(matches!(result, Err(UrlError::InvalidScheme(_))));
    }

    #[test]
    fn test_malformed_url() {
        assert!(normalize_url("not a url").is_err());
        assert!(normalize_url("/relative/path").is_err());
    }
}
