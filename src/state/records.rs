//! Per-page result records
//!
//! Records are created by page tasks, handed to the coordinator, and never
//! mutated afterwards.

use crate::detect::{DataLayerSummary, DetectedTechnology, TagFindings};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// SEO and social metadata extracted from a rendered page
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageMetadata {
    pub title: Option<String>,
    pub description: Option<String>,
    pub h1: Vec<String>,
    pub h2: Vec<String>,
    pub canonical: Option<String>,
    pub og_title: Option<String>,
    pub og_description: Option<String>,
    pub og_image: Option<String>,
    pub og_type: Option<String>,
}

/// Navigation timing in milliseconds since navigation start
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PerformanceTiming {
    /// Time to first byte
    pub ttfb_ms: Option<u64>,
    pub dom_content_loaded_ms: Option<u64>,
    pub load_ms: Option<u64>,
}

/// A network response observed while a page was open
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObservedRequest {
    pub url: String,
    pub status: Option<u16>,
}

/// Everything recorded about one successfully rendered page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageRecord {
    pub url: String,
    pub depth: u32,
    pub status: u16,
    /// URL after redirects
    pub final_url: String,
    pub metadata: PageMetadata,
    pub tags: TagFindings,
    pub data_layer: Option<DataLayerSummary>,
    pub technologies: Vec<DetectedTechnology>,
    pub performance: Option<PerformanceTiming>,
    /// Requests to known tracking hosts
    pub tracking_requests: Vec<ObservedRequest>,
    /// In-scope links found on the page
    pub internal_links: usize,
    /// Path of the saved screenshot
    pub screenshot: Option<String>,
    pub fetched_at: DateTime<Utc>,
}

/// A URL that answered with status 400 or above
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrokenLinkRecord {
    pub url: String,
    pub status: u16,
    pub depth: u32,
}

impl PageRecord {
    /// Names of the tags found on this page, sorted
    pub fn tag_names(&self) -> Vec<&str> {
        self.tags.keys().map(String::as_str).collect()
    }

    /// Names of the technologies found on this page, in detection order
    pub fn technology_names(&self) -> Vec<&str> {
        self.technologies.iter().map(|t| t.name.as_str()).collect()
    }

    /// Load event time if performance data was captured
    pub fn load_time_ms(&self) -> Option<u64> {
        self.performance.and_then(|p| p.load_ms)
    }
}


#[cfg(test)]
mod tests {
    use super::fixtures::page;

    #[test]
    fn test_record_accessors() {
        let record = page("https://example.com/", 0);
        assert_eq!(record.tag_names(), vec!["google_tag_manager"]);
        assert_eq!(record.technology_names(), vec!["wordpress"]);
        assert_eq!(record.load_time_ms(), Some(900));
    }

    #[test]
    fn test_record_json_shape() {
        let record = page("https://example.com/", 1);
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["tags"]["google_tag_manager"]["ids"][0], "GTM-ABC123");
        assert_eq!(value["technologies"][0]["method"], "fallback");
        assert_eq!(value["depth"], 1);
    }
}
