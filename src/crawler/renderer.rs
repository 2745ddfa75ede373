//! Page renderer boundary
//!
//! A renderer loads a URL in a scripted browser, runs the page's scripts and
//! hands back the rendered document. Network responses seen while the page
//! is open are pushed into a per-page [`RequestSink`].

use crate::state::{ObservedRequest, PerformanceTiming};
use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;

/// Errors from rendering a page
///
/// `Timeout` and `Failed` are transient and retried; `Launch` is fatal.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("Timed out rendering {url}")]
    Timeout { url: String },

    #[error("Failed to render {url}: {message}")]
    Failed { url: String, message: String },

    #[error("Failed to launch browser: {0}")]
    Launch(String),
}

impl RenderError {
    /// Returns true if the page may succeed on another attempt
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Timeout { .. } | Self::Failed { .. })
    }
}

/// What to capture while rendering a page
#[derive(Debug, Clone)]
pub struct RenderOptions {
    /// Upper bound for navigation and capture of one page
    pub timeout: Duration,
    /// Settle time after navigation so late tags can fire
    pub wait_after_load: Duration,
    pub capture_data_layer: bool,
    pub capture_performance: bool,
    pub capture_screenshot: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            wait_after_load: Duration::from_secs(2),
            capture_data_layer: true,
            capture_performance: true,
            capture_screenshot: false,
        }
    }
}

/// A fully rendered page
#[derive(Debug, Clone, Default)]
pub struct RenderedPage {
    /// HTTP status of the main document
    pub status: u16,
    /// URL after redirects
    pub final_url: String,
    pub html: String,
    /// Raw `window.dataLayer` entries
    pub data_layer: Option<Vec<Value>>,
    pub performance: Option<PerformanceTiming>,
    /// PNG bytes
    pub screenshot: Option<Vec<u8>>,
}

/// Receives network responses observed while a page is open
#[derive(Debug, Clone)]
pub struct RequestSink {
    sender: mpsc::UnboundedSender<ObservedRequest>,
}

impl RequestSink {
    /// Creates a sink and the receiver the page task drains after rendering
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<ObservedRequest>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }

    /// Records a response; silently dropped once the page task has moved on
    pub fn record(&self, url: impl Into<String>, status: Option<u16>) {
        let _ = self.sender.send(ObservedRequest {
            url: url.into(),
            status,
        });
    }
}

/// Loads and renders pages
#[async_trait]
pub trait PageRenderer: Send + Sync {
    /// Renders `url`, reporting observed network responses to `sink`
    async fn render(
        &self,
        url: &str,
        options: &RenderOptions,
        sink: RequestSink,
    ) -> Result<RenderedPage, RenderError>;
}

/// Reads navigation timing from the page
pub(crate) const PERFORMANCE_SCRIPT: &str = r#"JSON.stringify((function () {
    var t = window.performance && window.performance.timing;
    if (!t) { return null; }
    return {
        ttfb: t.responseStart - t.navigationStart,
        dom_content_loaded: t.domContentLoadedEventEnd - t.navigationStart,
        load: t.loadEventEnd - t.navigationStart
    };
})())"#;

/// Reads `window.dataLayer` as JSON
pub(crate) const DATA_LAYER_SCRIPT: &str = r#"(function () {
    try { return JSON.stringify(window.dataLayer || []); } catch (e) { return "[]"; }
})()"#;

/// Parses the JSON produced by [`PERFORMANCE_SCRIPT`]
///
/// Negative values (events that have not fired yet) are reported as missing.
pub fn parse_performance_timing(json: &str) -> Option<PerformanceTiming> {
    let value: Value = serde_json::from_str(json).ok()?;
    let object = value.as_object()?;
    let field = |name: &str| {
        object
            .get(name)
            .and_then(Value::as_i64)
            .and_then(|ms| u64::try_from(ms).ok())
    };

    Some(PerformanceTiming {
        ttfb_ms: field("ttfb"),
        dom_content_loaded_ms: field("dom_content_loaded"),
        load_ms: field("load"),
    })
}

/// Parses the JSON produced by [`DATA_LAYER_SCRIPT`]
pub fn parse_data_layer_json(json: &str) -> Option<Vec<Value>> {
    match serde_json::from_str::<Value>(json).ok()? {
        Value::Array(events) => Some(events),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_errors() {
        assert!(RenderError::Timeout {
            url: "https://example.com/".to_string()
        }
        .is_transient());
        assert!(RenderError::Failed {
            url: "https://example.com/".to_string(),
            message: "net::ERR_CONNECTION_RESET".to_string()
        }
        .is_transient());
        assert!(!RenderError::Launch("no chrome".to_string()).is_transient());
    }

    #[test]
    fn test_parse_performance_timing() {
        let timing = parse_performance_timing(r#"{"ttfb":120,"dom_content_loaded":850,"load":-1700000000000}"#)
            .unwrap();
        assert_eq!(timing.ttfb_ms, Some(120));
        assert_eq!(timing.dom_content_loaded_ms, Some(850));
        assert_eq!(timing.load_ms, None);

        assert!(parse_performance_timing("null").is_none());
        assert!(parse_performance_timing("garbage").is_none());
    }

    #[test]
    fn test_parse_data_layer_json() {
        let events = parse_data_layer_json(r#"[{"event":"gtm.js"},{"event":"page_view"}]"#).unwrap();
        assert_eq!(events.len(), 2);
        assert!(parse_data_layer_json(r#"{"event":"x"}"#).is_none());
    }

    #[tokio::test]
    async fn test_request_sink_delivers() {
        let (sink, mut receiver) = RequestSink::channel();
        sink.record("https://www.google-analytics.com/g/collect", Some(204));
        let cloned = sink.clone();
        cloned.record("https://example.com/app.js", None);
        drop(sink);
        drop(cloned);

        let mut seen = Vec::new();
        while let Some(request) = receiver.recv().await {
            seen.push(request.url);
        }
        assert_eq!(seen.len(), 2);
    }
}
