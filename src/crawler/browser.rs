//! Headless Chrome page renderer
//!
//! One browser process is launched per run. Every page gets a fresh browser
//! context and tab, so cookies and storage never leak between pages. The
//! blocking DevTools calls run on the blocking thread pool.
//!
//! Blocking renders cannot be aborted from async code, and each one holds a
//! handle to the browser. They check the shutdown token between DevTools
//! steps so the last handle, and with it the Chrome process, goes away
//! shortly after an interrupt.

use crate::config::BrowserConfig;
use crate::crawler::renderer::{
    parse_data_layer_json, parse_performance_timing, PageRenderer, RenderError, RenderOptions,
    RenderedPage, RequestSink, DATA_LAYER_SCRIPT, PERFORMANCE_SCRIPT,
};
use crate::url::normalize_url;
use async_trait::async_trait;
use headless_chrome::protocol::cdp::Page::CaptureScreenshotFormatOption;
use headless_chrome::{Browser, LaunchOptions, Tab};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Extra time granted on top of the page timeout for capture and teardown
const CAPTURE_GRACE: Duration = Duration::from_secs(15);

/// Renders pages in a shared headless Chrome process
pub struct ChromeRenderer {
    browser: Arc<Browser>,
    user_agent: Option<String>,
    shutdown: CancellationToken,
}

impl ChromeRenderer {
    /// Launches the browser process
    ///
    /// Renders still running when `shutdown` fires give up at their next
    /// DevTools step.
    ///
    /// # Errors
    ///
    /// `RenderError::Launch` if Chrome cannot be found or started
    pub fn launch(
        config: &BrowserConfig,
        shutdown: CancellationToken,
    ) -> Result<Self, RenderError> {
        let options = LaunchOptions::default_builder()
            .headless(config.headless)
            .sandbox(false)
            .window_size(Some((config.window_width, config.window_height)))
            .path(config.chrome_path.as_ref().map(PathBuf::from))
            .idle_browser_timeout(Duration::from_secs(600))
            .build()
            .map_err(|e| RenderError::Launch(format!("invalid launch options: {}", e)))?;

        let browser = Browser::new(options).map_err(|e| RenderError::Launch(e.to_string()))?;
        info!(
            "Launched {} Chrome ({}x{})",
            if config.headless { "headless" } else { "headed" },
            config.window_width,
            config.window_height
        );

        Ok(Self {
            browser: Arc::new(browser),
            user_agent: config.user_agent.clone(),
            shutdown,
        })
    }
}

impl Drop for ChromeRenderer {
    fn drop(&mut self) {
        let renders = Arc::strong_count(&self.browser) - 1;
        if renders > 0 {
            debug!("Chrome exits once {} running renders finish", renders);
        } else {
            debug!("Releasing browser process");
        }
    }
}

#[async_trait]
impl PageRenderer for ChromeRenderer {
    async fn render(
        &self,
        url: &str,
        options: &RenderOptions,
        sink: RequestSink,
    ) -> Result<RenderedPage, RenderError> {
        let browser = Arc::clone(&self.browser);
        let user_agent = self.user_agent.clone();
        let options_owned = options.clone();
        let url_owned = url.to_string();
        let shutdown = self.shutdown.clone();

        let handle = tokio::task::spawn_blocking(move || {
            render_blocking(
                &browser,
                &url_owned,
                user_agent.as_deref(),
                &options_owned,
                sink,
                &shutdown,
            )
        });

        let limit = options.timeout + options.wait_after_load + CAPTURE_GRACE;
        match tokio::time::timeout(limit, handle).await {
            Ok(Ok(result)) => result,
            Ok(Err(join_error)) => Err(RenderError::Failed {
                url: url.to_string(),
                message: format!("render task panicked: {}", join_error),
            }),
            Err(_) => Err(RenderError::Timeout {
                url: url.to_string(),
            }),
        }
    }
}

fn render_blocking(
    browser: &Browser,
    url: &str,
    user_agent: Option<&str>,
    options: &RenderOptions,
    sink: RequestSink,
    shutdown: &CancellationToken,
) -> Result<RenderedPage, RenderError> {
    ensure_running(shutdown, url)?;
    let context = browser.new_context().map_err(|e| classify(url, e))?;
    let tab = context.new_tab().map_err(|e| classify(url, e))?;
    tab.set_default_timeout(options.timeout);

    let result = render_in_tab(&tab, url, user_agent, options, sink, shutdown);

    if let Err(e) = tab.close(false) {
        debug!("Failed to close tab for {}: {}", url, e);
    }

    result
}

fn render_in_tab(
    tab: &Arc<Tab>,
    url: &str,
    user_agent: Option<&str>,
    options: &RenderOptions,
    sink: RequestSink,
    shutdown: &CancellationToken,
) -> Result<RenderedPage, RenderError> {
    if let Some(user_agent) = user_agent {
        tab.set_user_agent(user_agent, None, None)
            .map_err(|e| classify(url, e))?;
    }

    let responses: Arc<Mutex<Vec<(String, u16)>>> = Arc::new(Mutex::new(Vec::new()));
    let responses_clone = Arc::clone(&responses);

    tab.register_response_handling(
        "site_auditor",
        Box::new(move |event_params, _fetch_body| {
            let response = &event_params.response;
            let status = u16::try_from(response.status).ok();
            if let (Some(status), Ok(mut seen)) = (status, responses_clone.lock()) {
                seen.push((response.url.clone(), status));
            }
            sink.record(response.url.clone(), status);
        }),
    )
    .map_err(|e| classify(url, e))?;

    ensure_running(shutdown, url)?;
    tab.navigate_to(url).map_err(|e| classify(url, e))?;
    tab.wait_until_navigated().map_err(|e| classify(url, e))?;

    if !options.wait_after_load.is_zero() {
        std::thread::sleep(options.wait_after_load);
    }
    ensure_running(shutdown, url)?;

    let html = tab.get_content().map_err(|e| classify(url, e))?;
    let final_url = tab.get_url();

    let data_layer = if options.capture_data_layer {
        evaluate_string(tab, DATA_LAYER_SCRIPT)
            .and_then(|json| parse_data_layer_json(&json))
            .or_else(|| {
                debug!("No data layer captured for {}", url);
                None
            })
    } else {
        None
    };

    let performance = if options.capture_performance {
        evaluate_string(tab, PERFORMANCE_SCRIPT).and_then(|json| parse_performance_timing(&json))
    } else {
        None
    };

    let screenshot = if options.capture_screenshot {
        match tab.capture_screenshot(CaptureScreenshotFormatOption::Png, None, None, true) {
            Ok(png) => Some(png),
            Err(e) => {
                warn!("Screenshot failed for {}: {}", url, e);
                None
            }
        }
    } else {
        None
    };

    if let Err(e) = tab.deregister_response_handling("site_auditor") {
        debug!("Failed to remove response handler for {}: {}", url, e);
    }

    let status = match responses.lock() {
        Ok(seen) => document_status(&seen, &final_url),
        Err(_) => 200,
    };

    Ok(RenderedPage {
        status,
        final_url,
        html,
        data_layer,
        performance,
        screenshot,
    })
}

/// Fails the render once the run is shutting down
fn ensure_running(shutdown: &CancellationToken, url: &str) -> Result<(), RenderError> {
    if shutdown.is_cancelled() {
        return Err(RenderError::Failed {
            url: url.to_string(),
            message: "audit is shutting down".to_string(),
        });
    }
    Ok(())
}

/// Runs a script expected to return a string
fn evaluate_string(tab: &Tab, script: &str) -> Option<String> {
    match tab.evaluate(script, false) {
        Ok(object) => object
            .value
            .and_then(|value| value.as_str().map(str::to_string)),
        Err(e) => {
            warn!("Script evaluation failed: {}", e);
            None
        }
    }
}

/// Picks the status of the main document among the observed responses
///
/// The response for the final URL wins; otherwise the first response seen
/// (the document is requested first). With no responses at all, 200.
fn document_status(responses: &[(String, u16)], final_url: &str) -> u16 {
    let target = normalize_url(final_url).ok();
    responses
        .iter()
        .find(|(url, _)| target.is_some() && normalize_url(url).ok() == target)
        .or_else(|| responses.first())
        .map(|(_, status)| *status)
        .unwrap_or(200)
}

/// Maps a DevTools error to a render error, separating timeouts
fn classify(url: &str, error: anyhow::Error) -> RenderError {
    let message = error.to_string();
    let lower = message.to_lowercase();
    if lower.contains("timeout") || lower.contains("timed out") || lower.contains("never came") {
        RenderError::Timeout {
            url: url.to_string(),
        }
    } else {
        RenderError::Failed {
            url: url.to_string(),
            message,
        }
    }
}
