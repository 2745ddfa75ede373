//! Tag, technology and data-layer detection
//!
//! Everything here except the external detectors is a pure function of the
//! rendered page content and the [`PatternRegistry`](crate::patterns::PatternRegistry).

mod data_layer;
mod external;
mod tags;
mod technologies;

use std::time::Duration;
use thiserror::Error;

pub use data_layer::{parse_data_layer_events, DataLayerEvent, DataLayerSummary};
pub use external::{
    build_detector, parse_detector_output, HttpTechnologyService, TechnologyDetector,
    WappalyzerCli,
};
pub use tags::{detect_tags, TagFindings, TagHit};
pub use technologies::{detect_technologies_fallback, DetectedTechnology, DetectionMethod};

/// Errors from an external technology detector
#[derive(Debug, Error)]
pub enum DetectorError {
    #[error("Detector unavailable: {0}")]
    Unavailable(String),

    #[error("Detector timed out after {0:?}")]
    Timeout(Duration),

    #[error("Detector process failed: {0}")]
    Process(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Malformed detector output: {0}")]
    Output(#[from] serde_json::Error),
}
