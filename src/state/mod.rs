//! State module for tracking crawl progress
//!
//! This module provides the crawl frontier, per-URL states, result records,
//! and the files that make a crawl resumable.
//!
//! # Components
//!
//! - `UrlState`: The state machine each URL moves through
//! - `CrawlFrontier`: Visited set plus FIFO frontier of `CrawlTarget`s
//! - `PageRecord` / `BrokenLinkRecord`: Immutable per-page results
//! - `StateStore`: Atomic JSON snapshots for resume
//! - `OverflowBuffer`: Disk spillover for page records

mod frontier;
mod overflow;
mod persist;
pub(crate) mod records;
mod url_state;

// Re-export main types
pub use frontier::{CrawlFrontier, CrawlTarget};
pub use overflow::OverflowBuffer;
pub use persist::{PersistedState, StateStore};
pub use records::{BrokenLinkRecord, ObservedRequest, PageMetadata, PageRecord, PerformanceTiming};
pub use url_state::UrlState;
