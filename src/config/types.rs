use serde::Deserialize;

/// Main configuration structure for Site Auditor
///
/// Every section has defaults, so an empty file (or no file at all, when the
/// start URL comes from the command line) is a valid starting point.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub crawler: CrawlerConfig,
    #[serde(default)]
    pub filters: FilterConfig,
    #[serde(default)]
    pub browser: BrowserConfig,
    #[serde(default)]
    pub technology: TechnologyConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default, rename = "custom-tags")]
    pub custom_tags: Vec<CustomTagEntry>,
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct CrawlerConfig {
    /// Seed URL; its host is the only host that will be crawled
    #[serde(default)]
    pub start_url: String,

    /// Maximum number of pages dispatched over the whole run
    #[serde(default = "default_max_pages")]
    pub max_pages: usize,

    /// Maximum link depth from the seed
    #[serde(default = "default_max_depth")]
    pub max_depth: u32,

    /// Delay applied after every page navigation (milliseconds)
    #[serde(default = "default_rate_limit_ms")]
    pub rate_limit_ms: u64,

    /// Number of pages rendered concurrently (1-10)
    #[serde(default = "default_concurrent_pages")]
    pub concurrent_pages: usize,

    /// Retries after the first attempt on timeout or transient error
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Fixed delay between retry attempts (milliseconds)
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,

    /// Per-page render timeout (milliseconds)
    #[serde(default = "default_page_timeout_ms")]
    pub page_timeout_ms: u64,

    /// Persist a state snapshot every N successfully processed pages
    #[serde(default = "default_progress_interval")]
    pub progress_interval: usize,

    /// In-memory page records kept before spilling to the overflow file
    #[serde(default = "default_memory_threshold")]
    pub memory_threshold: usize,

    /// Data-layer events kept per page
    #[serde(default = "default_max_data_layer_events")]
    pub max_data_layer_events: usize,

    /// Resume from the saved state file when one exists
    #[serde(default)]
    pub resume: bool,
}

/// URL inclusion and exclusion rules
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct FilterConfig {
    /// Regexes; when non-empty a URL must match at least one
    #[serde(default)]
    pub include: Vec<String>,

    /// Regexes; a URL matching any of them is skipped
    #[serde(default)]
    pub exclude: Vec<String>,

    /// Path suffixes (case-insensitive) that are never crawled
    #[serde(default = "default_skip_extensions")]
    pub skip_extensions: Vec<String>,
}

/// Headless browser configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct BrowserConfig {
    #[serde(default = "default_true")]
    pub headless: bool,

    /// Overrides the browser's default user agent
    #[serde(default)]
    pub user_agent: Option<String>,

    #[serde(default = "default_window_width")]
    pub window_width: u32,

    #[serde(default = "default_window_height")]
    pub window_height: u32,

    /// Extra settle time after navigation so late tags can fire (milliseconds)
    #[serde(default = "default_wait_after_load_ms")]
    pub wait_after_load_ms: u64,

    #[serde(default = "default_true")]
    pub capture_data_layer: bool,

    #[serde(default = "default_true")]
    pub capture_performance: bool,

    #[serde(default)]
    pub capture_screenshots: bool,

    /// Explicit Chrome/Chromium binary
    #[serde(default)]
    pub chrome_path: Option<String>,
}

/// Which external technology detector to consult before the built-in patterns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExternalDetectorKind {
    /// Built-in fallback patterns only
    None,
    /// `wappalyzer <url>` subprocess
    #[default]
    Wappalyzer,
    /// HTTP fingerprinting service
    Http,
}

/// External technology detector configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct TechnologyConfig {
    #[serde(default)]
    pub external_detector: ExternalDetectorKind,

    /// Executable used for the Wappalyzer detector
    #[serde(default = "default_wappalyzer_command")]
    pub command: String,

    /// Service URL used for the HTTP detector; the page URL is passed as `?url=`
    #[serde(default)]
    pub endpoint: Option<String>,

    #[serde(default = "default_detector_timeout_ms")]
    pub timeout_ms: u64,
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct OutputConfig {
    /// Report file prefix; a timestamp and extension are appended
    #[serde(default = "default_prefix")]
    pub prefix: String,

    /// Report formats: "json", "csv"
    #[serde(default = "default_formats")]
    pub formats: Vec<String>,

    /// Directory for the crawl state and overflow files
    #[serde(default = "default_state_dir")]
    pub state_dir: String,

    /// Directory for page screenshots
    #[serde(default = "default_screenshot_dir")]
    pub screenshot_dir: String,
}

/// Additional tag signature declared in the config file
#[derive(Debug, Clone, Deserialize)]
pub struct CustomTagEntry {
    pub name: String,
    #[serde(default)]
    pub patterns: Vec<String>,
    #[serde(default)]
    pub urls: Vec<String>,
    #[serde(default = "default_custom_category")]
    pub category: String,
}

pub(crate) const DEFAULT_MAX_PAGES: usize = 500;
pub(crate) const DEFAULT_CONCURRENT_PAGES: usize = 3;
pub(crate) const MAX_CONCURRENT_PAGES: usize = 10;
pub(crate) const DEFAULT_PROGRESS_INTERVAL: usize = 10;
pub(crate) const DEFAULT_MEMORY_THRESHOLD: usize = 50;
pub(crate) const DEFAULT_MAX_DATA_LAYER_EVENTS: usize = 100;

fn default_max_pages() -> usize {
    DEFAULT_MAX_PAGES
}

fn default_max_depth() -> u32 {
    3
}

fn default_rate_limit_ms() -> u64 {
    1000
}

fn default_concurrent_pages() -> usize {
    DEFAULT_CONCURRENT_PAGES
}

fn default_max_retries() -> u32 {
    2
}

fn default_retry_delay_ms() -> u64 {
    2000
}

fn default_page_timeout_ms() -> u64 {
    30_000
}

fn default_progress_interval() -> usize {
    DEFAULT_PROGRESS_INTERVAL
}

fn default_memory_threshold() -> usize {
    DEFAULT_MEMORY_THRESHOLD
}

fn default_max_data_layer_events() -> usize {
    DEFAULT_MAX_DATA_LAYER_EVENTS
}

fn default_skip_extensions() -> Vec<String> {
    [
        ".pdf", ".jpg", ".jpeg", ".png", ".gif", ".svg", ".webp", ".ico", ".css", ".js", ".json",
        ".xml", ".zip", ".gz", ".mp3", ".mp4", ".avi", ".mov", ".doc", ".docx", ".xls", ".xlsx",
        ".ppt", ".pptx", ".woff", ".woff2", ".ttf", ".eot",
    ]
    .iter()
    .map(|ext| ext.to_string())
    .collect()
}

fn default_true() -> bool {
    true
}

fn default_window_width() -> u32 {
    1920
}

fn default_window_height() -> u32 {
    1080
}

fn default_wait_after_load_ms() -> u64 {
    2000
}

fn default_wappalyzer_command() -> String {
    "wappalyzer".to_string()
}

fn default_detector_timeout_ms() -> u64 {
    60_000
}

fn default_prefix() -> String {
    "site_audit".to_string()
}

fn default_formats() -> Vec<String> {
    vec!["json".to_string(), "csv".to_string()]
}

fn default_state_dir() -> String {
    ".site-auditor".to_string()
}

fn default_screenshot_dir() -> String {
    "screenshots".to_string()
}

fn default_custom_category() -> String {
    "Custom".to_string()
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            start_url: String::new(),
            max_pages: default_max_pages(),
            max_depth: default_max_depth(),
            rate_limit_ms: default_rate_limit_ms(),
            concurrent_pages: default_concurrent_pages(),
            max_retries: default_max_retries(),
            retry_delay_ms: default_retry_delay_ms(),
            page_timeout_ms: default_page_timeout_ms(),
            progress_interval: default_progress_interval(),
            memory_threshold: default_memory_threshold(),
            max_data_layer_events: default_max_data_layer_events(),
            resume: false,
        }
    }
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            include: Vec::new(),
            exclude: Vec::new(),
            skip_extensions: default_skip_extensions(),
        }
    }
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            headless: true,
            user_agent: None,
            window_width: default_window_width(),
            window_height: default_window_height(),
            wait_after_load_ms: default_wait_after_load_ms(),
            capture_data_layer: true,
            capture_performance: true,
            capture_screenshots: false,
            chrome_path: None,
        }
    }
}

impl Default for TechnologyConfig {
    fn default() -> Self {
        Self {
            external_detector: ExternalDetectorKind::default(),
            command: default_wappalyzer_command(),
            endpoint: None,
            timeout_ms: default_detector_timeout_ms(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            prefix: default_prefix(),
            formats: default_formats(),
            state_dir: default_state_dir(),
            screenshot_dir: default_screenshot_dir(),
        }
    }
}

impl Config {
    /// Builds a default configuration around a start URL
    pub fn for_start_url(start_url: &str) -> Self {
        let mut config = Self::default();
        config.crawler.start_url = start_url.to_string();
        config
    }
}
