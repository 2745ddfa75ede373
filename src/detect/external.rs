//! External technology detectors
//!
//! An external detector is consulted before the built-in fingerprints. Two
//! implementations exist: the Wappalyzer command-line tool run as a
//! subprocess, and an HTTP fingerprinting service queried with `?url=`.

use crate::config::{ExternalDetectorKind, TechnologyConfig};
use crate::detect::{DetectedTechnology, DetectionMethod, DetectorError};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, info, warn};

/// A source of technology findings for a URL
#[async_trait]
pub trait TechnologyDetector: Send + Sync {
    /// Short label used in log lines
    fn name(&self) -> &str;

    /// Reports the technologies used by the page at `url`
    async fn detect(&self, url: &str) -> Result<Vec<DetectedTechnology>, DetectorError>;
}

#[derive(Debug, Deserialize)]
struct DetectorReport {
    #[serde(default)]
    technologies: Vec<ReportedTechnology>,
}

#[derive(Debug, Deserialize)]
struct ReportedTechnology {
    name: String,
    #[serde(default)]
    category: Option<String>,
    #[serde(default)]
    categories: Vec<ReportedCategory>,
}

#[derive(Debug, Deserialize)]
struct ReportedCategory {
    name: String,
}

/// Parses `{"technologies": [{"name", "category" | "categories": [{"name"}]}]}`
///
/// A technology without any category is reported as "Unknown".
pub fn parse_detector_output(body: &str) -> Result<Vec<DetectedTechnology>, DetectorError> {
    let report: DetectorReport = serde_json::from_str(body)?;
    Ok(report
        .technologies
        .into_iter()
        .map(|tech| {
            let category = tech
                .category
                .or_else(|| tech.categories.into_iter().next().map(|c| c.name))
                .unwrap_or_else(|| "Unknown".to_string());
            DetectedTechnology {
                name: tech.name,
                category,
                method: DetectionMethod::External,
            }
        })
        .collect())
}

/// Runs `wappalyzer <url>` and parses its JSON output
pub struct WappalyzerCli {
    command: String,
    timeout: Duration,
}

impl WappalyzerCli {
    pub fn new(command: impl Into<String>, timeout: Duration) -> Self {
        Self {
            command: command.into(),
            timeout,
        }
    }

    /// Probes the tool with `--version`
    pub async fn is_available(&self) -> bool {
        let probe = Command::new(&self.command)
            .arg("--version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .status();

        match tokio::time::timeout(Duration::from_secs(10), probe).await {
            Ok(Ok(status)) => status.success(),
            Ok(Err(e)) => {
                debug!("{} --version failed: {}", self.command, e);
                false
            }
            Err(_) => false,
        }
    }
}

#[async_trait]
impl TechnologyDetector for WappalyzerCli {
    fn name(&self) -> &str {
        "wappalyzer"
    }

    async fn detect(&self, url: &str) -> Result<Vec<DetectedTechnology>, DetectorError> {
        let run = Command::new(&self.command)
            .arg(url)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output();

        let output = tokio::time::timeout(self.timeout, run)
            .await
            .map_err(|_| DetectorError::Timeout(self.timeout))?
            .map_err(|e| DetectorError::Unavailable(format!("{}: {}", self.command, e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(DetectorError::Process(format!(
                "{} exited with {}: {}",
                self.command,
                output.status,
                stderr.trim()
            )));
        }

        parse_detector_output(&String::from_utf8_lossy(&output.stdout))
    }
}

/// Queries `GET <endpoint>?url=<page url>`
pub struct HttpTechnologyService {
    client: Client,
    endpoint: String,
}

impl HttpTechnologyService {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, DetectorError> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(10))
            .gzip(true)
            .brotli(true)
            .build()?;

        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }
}

#[async_trait]
impl TechnologyDetector for HttpTechnologyService {
    fn name(&self) -> &str {
        "http"
    }

    async fn detect(&self, url: &str) -> Result<Vec<DetectedTechnology>, DetectorError> {
        let body = self
            .client
            .get(&self.endpoint)
            .query(&[("url", url)])
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        parse_detector_output(&body)
    }
}

/// Builds the configured external detector
///
/// Returns None when detection is disabled or the detector cannot be used;
/// the crawl then relies on the built-in fingerprints.
pub async fn build_detector(config: &TechnologyConfig) -> Option<Arc<dyn TechnologyDetector>> {
    let timeout = Duration::from_millis(config.timeout_ms);

    match config.external_detector {
        ExternalDetectorKind::None => None,
        ExternalDetectorKind::Wappalyzer => {
            let cli = WappalyzerCli::new(config.command.clone(), timeout);
            if cli.is_available().await {
                info!("Using {} for technology detection", config.command);
                Some(Arc::new(cli))
            } else {
                warn!(
                    "{} not available; using built-in technology patterns",
                    config.command
                );
                None
            }
        }
        ExternalDetectorKind::Http => {
            let endpoint = config.endpoint.clone()?;
            match HttpTechnologyService::new(endpoint.clone(), timeout) {
                Ok(service) => {
                    info!("Using {} for technology detection", endpoint);
                    Some(Arc::new(service))
                }
                Err(e) => {
                    warn!("Technology service unavailable: {}", e);
                    None
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_parse_wappalyzer_output() {
        let body = r#"{
            "urls": {"https://example.com/": {"status": 200}},
            "technologies": [
                {"slug": "nginx", "name": "Nginx", "categories": [{"id": 22, "slug": "web-servers", "name": "Web servers"}]},
                {"name": "HSTS", "categories": []},
                {"name": "Stripe", "category": "Payment processors"}
            ]
        }"#;

        let found = parse_detector_output(body).unwrap();
        assert_eq!(found.len(), 3);
        assert_eq!(found[0].name, "Nginx");
        assert_eq!(found[0].category, "Web servers");
        assert_eq!(found[1].category, "Unknown");
        assert_eq!(found[2].category, "Payment processors");
        assert!(found.iter().all(|t| t.method == DetectionMethod::External));
    }

    #[test]
    fn test_parse_malformed_output() {
        assert!(matches!(
            parse_detector_output("not json"),
            Err(DetectorError::Output(_))
        ));
    }

    #[tokio::test]
    async fn test_http_service_detect() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/lookup"))
            .and(query_param("url", "https://example.com/"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"{"technologies": [{"name": "WordPress", "categories": [{"name": "CMS"}]}]}"#,
            ))
            .mount(&server)
            .await;

        let service = HttpTechnologyService::new(
            format!("{}/lookup", server.uri()),
            Duration::from_secs(5),
        )
        .unwrap();

        let found = service.detect("https://example.com/").await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, "WordPress");
        assert_eq!(found[0].category, "CMS");
    }

    #[tokio::test]
    async fn test_http_service_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let service =
            HttpTechnologyService::new(server.uri(), Duration::from_secs(5)).unwrap();

        assert!(matches!(
            service.detect("https://example.com/").await,
            Err(DetectorError::Http(_))
        ));
    }

    #[tokio::test]
    async fn test_missing_cli_is_unavailable() {
        let cli = WappalyzerCli::new("definitely-not-a-real-binary-4821", Duration::from_secs(1));
        assert!(!cli.is_available().await);
        assert!(matches!(
            cli.detect("https://example.com/").await,
            Err(DetectorError::Unavailable(_))
        ));
    }

    #[tokio::test]
    async fn test_build_detector_disabled() {
        let config = TechnologyConfig {
            external_detector: ExternalDetectorKind::None,
            ..Default::default()
        };
        assert!(build_detector(&config).await.is_none());
    }
}
