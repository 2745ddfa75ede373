//! Site Auditor main entry point
//!
//! This is the command-line interface for the Site Auditor tag and
//! technology auditor.

use clap::Parser;
use site_auditor::config::{read_config, validate, Config, ExternalDetectorKind};
use site_auditor::crawler::run_audit;
use site_auditor::output::{export_reports, print_statistics};
use site_auditor::{AuditorError, PatternRegistry};
use std::path::PathBuf;
use std::process::ExitCode;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

/// Site Auditor: a tag and technology auditor
///
/// Site Auditor renders every page of one website in headless Chrome and
/// reports the tracking tags, data-layer events and technologies it finds.
/// Command-line options override the config file.
#[derive(Parser, Debug)]
#[command(name = "site-auditor")]
#[command(version)]
#[command(about = "A tag and technology auditor for websites", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// Start URL; its host is the only host crawled
    #[arg(short, long)]
    url: Option<String>,

    /// Maximum number of pages to audit
    #[arg(long)]
    max_pages: Option<usize>,

    /// Maximum link depth from the start URL
    #[arg(long)]
    max_depth: Option<u32>,

    /// Delay after every page navigation, in milliseconds
    #[arg(long, value_name = "MS")]
    rate_limit: Option<u64>,

    /// Pages rendered concurrently (1-10)
    #[arg(long)]
    concurrent: Option<usize>,

    /// Report file prefix
    #[arg(short, long, value_name = "PREFIX")]
    output: Option<String>,

    /// Report formats, comma separated (json, csv)
    #[arg(long, value_delimiter = ',')]
    format: Vec<String>,

    /// Only crawl URLs matching one of these regexes
    #[arg(long)]
    include: Vec<String>,

    /// Never crawl URLs matching any of these regexes
    #[arg(long)]
    exclude: Vec<String>,

    /// Resume from the saved state file
    #[arg(long, conflicts_with = "fresh")]
    resume: bool,

    /// Start a fresh audit, ignoring previous state
    #[arg(long, conflicts_with = "resume")]
    fresh: bool,

    /// Use only the built-in technology fingerprints
    #[arg(long)]
    no_external_detector: bool,

    /// Capture a screenshot of every page
    #[arg(long)]
    screenshots: bool,

    /// Validate config and show what would be audited without crawling
    #[arg(long)]
    dry_run: bool,

    /// Increase logging verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

/// Exit status after Ctrl-C, as a shell reports SIGINT
const EXIT_INTERRUPTED: u8 = 130;

// Returning from main lets the runtime wait for blocking renders, so the
// browser process is killed before exit.
#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    let config = match resolve_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Invalid configuration: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let result = if cli.dry_run {
        handle_dry_run(&config).map(|()| 0)
    } else {
        handle_audit(config).await
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("site_auditor=info,warn"),
            1 => EnvFilter::new("site_auditor=debug,info"),
            _ => EnvFilter::new("site_auditor=trace,debug"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Reads the config file (if any), applies command-line overrides, validates
fn resolve_config(cli: &Cli) -> Result<Config, Box<dyn std::error::Error>> {
    let mut config = match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            read_config(path)?
        }
        None => Config::default(),
    };

    apply_overrides(&mut config, cli);
    validate(&mut config)?;
    Ok(config)
}

fn apply_overrides(config: &mut Config, cli: &Cli) {
    if let Some(url) = &cli.url {
        config.crawler.start_url = url.clone();
    }
    if let Some(max_pages) = cli.max_pages {
        config.crawler.max_pages = max_pages;
    }
    if let Some(max_depth) = cli.max_depth {
        config.crawler.max_depth = max_depth;
    }
    if let Some(rate_limit) = cli.rate_limit {
        config.crawler.rate_limit_ms = rate_limit;
    }
    if let Some(concurrent) = cli.concurrent {
        config.crawler.concurrent_pages = concurrent;
    }
    if let Some(prefix) = &cli.output {
        config.output.prefix = prefix.clone();
    }

    if !cli.format.is_empty() {
        let mut formats = Vec::new();
        for format in &cli.format {
            if format.trim().eq_ignore_ascii_case("html") {
                tracing::warn!("HTML reports are not supported; use json or csv");
            } else {
                formats.push(format.clone());
            }
        }
        config.output.formats = formats;
    }

    if !cli.include.is_empty() {
        config.filters.include = cli.include.clone();
    }
    if !cli.exclude.is_empty() {
        config.filters.exclude.extend(cli.exclude.iter().cloned());
    }

    if cli.resume {
        config.crawler.resume = true;
    }
    if cli.fresh {
        config.crawler.resume = false;
    }
    if cli.no_external_detector {
        config.technology.external_detector = ExternalDetectorKind::None;
    }
    if cli.screenshots {
        config.browser.capture_screenshots = true;
    }
}

/// Handles the --dry-run mode: validates config and shows what would be audited
fn handle_dry_run(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let registry = PatternRegistry::with_custom_tags(&config.custom_tags)?;

    println!("=== Site Auditor Dry Run ===\n");

    println!("Crawler Configuration:");
    println!("  Start URL: {}", config.crawler.start_url);
    println!("  Max pages: {}", config.crawler.max_pages);
    println!("  Max depth: {}", config.crawler.max_depth);
    println!("  Concurrent pages: {}", config.crawler.concurrent_pages);
    println!("  Rate limit: {}ms", config.crawler.rate_limit_ms);
    println!(
        "  Retries: {} ({}ms apart)",
        config.crawler.max_retries, config.crawler.retry_delay_ms
    );
    println!("  Resume: {}", config.crawler.resume);

    println!("\nFilters:");
    println!("  Include: {:?}", config.filters.include);
    println!("  Exclude: {:?}", config.filters.exclude);

    println!("\nDetection:");
    println!("  Tag signatures: {}", registry.tags().len());
    println!("  Technology fingerprints: {}", registry.technologies().len());
    println!(
        "  External detector: {:?}",
        config.technology.external_detector
    );

    println!("\nOutput:");
    println!("  Prefix: {}", config.output.prefix);
    println!("  Formats: {}", config.output.formats.join(", "));
    println!("  State dir: {}", config.output.state_dir);

    println!("\n✓ Configuration is valid");

    Ok(())
}

/// Handles the main audit operation, returning the process exit status
async fn handle_audit(config: Config) -> Result<u8, Box<dyn std::error::Error>> {
    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, saving state...");
            on_signal.cancel();
        }
    });

    let output = config.output.clone();

    let result = run_audit(config, cancel).await;
    if let Some(code) = interrupted_exit(&result) {
        println!("Audit interrupted. Run again with --resume to continue.");
        return Ok(code);
    }

    match result {
        Ok(report) => {
            for path in export_reports(&report, &output)? {
                println!("✓ Report written to: {}", path.display());
            }
            println!();
            print_statistics(&report.statistics, report.broken_links.len());
            Ok(0)
        }
        Err(e) => Err(format!("Audit failed: {}", e).into()),
    }
}

fn interrupted_exit<T>(result: &Result<T, AuditorError>) -> Option<u8> {
    match result {
        Err(AuditorError::Interrupted) => Some(EXIT_INTERRUPTED),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interrupt_exits_with_sigint_status() {
        let interrupted: Result<(), AuditorError> = Err(AuditorError::Interrupted);
        assert_eq!(interrupted_exit(&interrupted), Some(130));
        assert_eq!(interrupted_exit(&Ok::<(), AuditorError>(())), None);
    }

    #[test]
    fn test_exclude_flag_extends_config() {
        let cli = Cli::parse_from([
            "site-auditor",
            "--url",
            "https://example.com",
            "--exclude",
            "/cart",
            "--format",
            "json,html",
        ]);
        let mut config = Config::default();
        config.filters.exclude = vec!["/admin".to_string()];
        apply_overrides(&mut config, &cli);

        assert_eq!(config.crawler.start_url, "https://example.com");
        assert_eq!(config.filters.exclude, vec!["/admin", "/cart"]);
        assert_eq!(config.output.formats, vec!["json"]);
    }
}
