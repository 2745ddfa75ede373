use crate::state::UrlState;
use crate::AuditorError;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet, VecDeque};

/// A normalized URL paired with its discovery depth
///
/// Serialized as a two-element array `[url, depth]`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "(String, u32)", into = "(String, u32)")]
pub struct CrawlTarget {
    pub url: String,
    pub depth: u32,
}

impl CrawlTarget {
    pub fn new(url: impl Into<String>, depth: u32) -> Self {
        Self {
            url: url.into(),
            depth,
        }
    }
}

impl From<(String, u32)> for CrawlTarget {
    fn from((url, depth): (String, u32)) -> Self {
        Self { url, depth }
    }
}

impl From<CrawlTarget> for (String, u32) {
    fn from(target: CrawlTarget) -> Self {
        (target.url, target.depth)
    }
}

/// The visited set, the FIFO frontier and the per-URL state machine
///
/// Owned exclusively by the coordinator. A URL enters the visited set the
/// moment it is dispatched, so no two page tasks ever render the same URL.
#[derive(Debug, Default)]
pub struct CrawlFrontier {
    queue: VecDeque<CrawlTarget>,
    queued: HashSet<String>,
    /// Visited URLs in dispatch order
    visited: Vec<String>,
    visited_set: HashSet<String>,
    /// InFlight and terminal states; Queued and Unseen are derived
    states: HashMap<String, UrlState>,
}

impl CrawlFrontier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds a frontier from a saved snapshot
    ///
    /// The saved queue order is kept as is. Restored visited URLs count as
    /// finished: those listed in `failed` as Failed, the rest as Succeeded.
    pub fn restore(visited: Vec<String>, to_visit: Vec<CrawlTarget>, failed: &[String]) -> Self {
        let mut frontier = Self::new();

        for url in visited {
            if frontier.visited_set.insert(url.clone()) {
                let state = if failed.contains(&url) {
                    UrlState::Failed
                } else {
                    UrlState::Succeeded
                };
                frontier.states.insert(url.clone(), state);
                frontier.visited.push(url);
            }
        }

        for target in to_visit {
            frontier.queued.insert(target.url.clone());
            frontier.queue.push_back(target);
        }

        frontier
    }

    /// Adds a target to the back of the frontier (Unseen -> Queued)
    ///
    /// # Returns
    ///
    /// `false` if the URL is already visited, queued or skipped
    pub fn enqueue(&mut self, target: CrawlTarget) -> bool {
        if self.state_of(&target.url) != UrlState::Unseen {
            return false;
        }
        self.queued.insert(target.url.clone());
        self.queue.push_back(target);
        true
    }

    /// Records a URL rejected by the URL policy (Unseen -> Skipped)
    ///
    /// # Returns
    ///
    /// `false` if the URL already had a state
    pub fn mark_skipped(&mut self, url: &str) -> bool {
        if self.state_of(url) != UrlState::Unseen {
            return false;
        }
        self.states.insert(url.to_string(), UrlState::Skipped);
        true
    }

    /// Takes the next dispatch batch from the front of the frontier
    ///
    /// At most `batch_size` targets are returned, and never more than
    /// `max_pages` minus the number of visited URLs. Every returned target
    /// is moved to InFlight and added to the visited set.
    pub fn next_batch(&mut self, batch_size: usize, max_pages: usize) -> Vec<CrawlTarget> {
        let budget = max_pages.saturating_sub(self.visited.len());
        let take = batch_size.min(budget);
        let mut batch = Vec::with_capacity(take);

        while batch.len() < take {
            let target = match self.queue.pop_front() {
                Some(target) => target,
                None => break,
            };

            if !self.queue.iter().any(|t| t.url == target.url) {
                self.queued.remove(&target.url);
            }

            // Restored queues may hold URLs that were visited meanwhile
            if self.visited_set.contains(&target.url) {
                continue;
            }

            self.visited_set.insert(target.url.clone());
            self.visited.push(target.url.clone());
            self.states.insert(target.url.clone(), UrlState::InFlight);
            batch.push(target);
        }

        batch
    }

    /// Moves an in-flight URL to a terminal state
    ///
    /// # Errors
    ///
    /// `AuditorError::InvalidTransition` if the URL is not InFlight or the
    /// outcome is not Succeeded or Failed
    pub fn complete(&mut self, url: &str, outcome: UrlState) -> Result<(), AuditorError> {
        let from = self.state_of(url);
        if !from.can_transition_to(outcome) {
            return Err(AuditorError::InvalidTransition {
                url: url.to_string(),
                from,
                to: outcome,
            });
        }
        self.states.insert(url.to_string(), outcome);
        Ok(())
    }

    /// Current state of a URL
    pub fn state_of(&self, url: &str) -> UrlState {
        if let Some(state) = self.states.get(url) {
            *state
        } else if self.queued.contains(url) {
            UrlState::Queued
        } else {
            UrlState::Unseen
        }
    }

    /// Drops queued targets that fail `keep`, returning the dropped ones
    pub fn retain_queued(&mut self, mut keep: impl FnMut(&CrawlTarget) -> bool) -> Vec<CrawlTarget> {
        let mut dropped = Vec::new();
        let mut kept = VecDeque::with_capacity(self.queue.len());

        for target in self.queue.drain(..) {
            if keep(&target) {
                kept.push_back(target);
            } else {
                dropped.push(target);
            }
        }

        self.queue = kept;
        self.queued = self.queue.iter().map(|t| t.url.clone()).collect();
        dropped
    }

    pub fn is_visited(&self, url: &str) -> bool {
        self.visited_set.contains(url)
    }

    /// Visited URLs in dispatch order
    pub fn visited(&self) -> &[String] {
        &self.visited
    }

    pub fn visited_count(&self) -> usize {
        self.visited.len()
    }

    /// Pending targets in FIFO order
    pub fn pending(&self) -> Vec<CrawlTarget> {
        self.queue.iter().cloned().collect()
    }

    pub fn pending_count(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}
