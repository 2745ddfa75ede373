/// Per-URL states for the lifetime of a crawl
///
/// This module defines the states a URL moves through and which moves are legal.
use serde::{Deserialize, Serialize};
use std::fmt;

/// Represents the current state of a URL in the crawl process
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UrlState {
    // ===== Active States =====
    /// Never seen, or seen but not yet admitted to the frontier
    Unseen,

    /// In the frontier, waiting for dispatch
    Queued,

    /// Dispatched to a page task; already in the visited set
    InFlight,

    // ===== Terminal States =====
    /// Rendered with a status below 400
    Succeeded,

    /// Returned a status of 400 or above, or exhausted its retries
    Failed,

    /// Rejected by the URL policy
    Skipped,
}

impl UrlState {
    /// Returns true if this is a terminal state (no further processing needed)
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed | Self::Skipped)
    }

    /// Returns true if the URL has been dispatched or finished
    pub fn is_visited(&self) -> bool {
        matches!(self, Self::InFlight | Self::Succeeded | Self::Failed)
    }

    /// Returns true if `self -> next` is a legal transition
    ///
    /// ```text
    /// Unseen -> Queued -> InFlight -> Succeeded | Failed
    /// Unseen -> Skipped
    /// ```
    pub fn can_transition_to(&self, next: UrlState) -> bool {
        matches!(
            (self, next),
            (Self::Unseen, Self::Queued)
                | (Self::Unseen, Self::Skipped)
                | (Self::Queued, Self::InFlight)
                | (Self::InFlight, Self::Succeeded)
                | (Self::InFlight, Self::Failed)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unseen => "unseen",
            Self::Queued => "queued",
            Self::InFlight => "in_flight",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
            Self::Skipped => "skipped",
        }
    }
}

impl fmt::Display for UrlState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [UrlState; 6] = [
        UrlState::Unseen,
        UrlState::Queued,
        UrlState::InFlight,
        UrlState::Succeeded,
        UrlState::Failed,
        UrlState::Skipped,
    ];

    #[test]
    fn test_is_terminal() {
        assert!(!UrlState::Unseen.is_terminal());
        assert!(!UrlState::Queued.is_terminal());
        assert!(!UrlState::InFlight.is_terminal());

        assert!(UrlState::Succeeded.is_terminal());
        assert!(UrlState::Failed.is_terminal());
        assert!(UrlState::Skipped.is_terminal());
    }

    #[test]
    fn test_legal_transitions() {
        assert!(UrlState::Unseen.can_transition_to(UrlState::Queued));
        assert!(UrlState::Unseen.can_transition_to(UrlState::Skipped));
        assert!(UrlState::Queued.can_transition_to(UrlState::InFlight));
        assert!(UrlState::InFlight.can_transition_to(UrlState::Succeeded));
        assert!(UrlState::InFlight.can_transition_to(UrlState::Failed));
    }

    #[test]
    fn test_terminal_states_never_move() {
        for from in ALL.iter().filter(|s| s.is_terminal()) {
            for to in ALL {
                assert!(!from.can_transition_to(to), "{} -> {}", from, to);
            }
        }
    }

    #[test]
    fn test_no_skipping_in_flight() {
        assert!(!UrlState::Queued.can_transition_to(UrlState::Succeeded));
        assert!(!UrlState::Unseen.can_transition_to(UrlState::InFlight));
        assert!(!UrlState::Queued.can_transition_to(UrlState::Skipped));
    }

    #[test]
    fn test_display() {
        assert_eq!(UrlState::InFlight.to_string(), "in_flight");
        assert_eq!(UrlState::Skipped.to_string(), "skipped");
    }
}
