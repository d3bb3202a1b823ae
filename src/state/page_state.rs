/// Page state definitions for tracking a single URL through the crawl unit
use crate::SpiderError;
use std::fmt;

/// Represents the current state of a URL inside one crawl attempt
///
/// ```text
/// Pending -> Fetching -> Succeeded
///                     -> Failed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PageState {
    /// Dequeued, not yet requested
    Pending,

    /// Network request in flight (including retries)
    Fetching,

    /// Content persisted; the URL is now in the crawled set
    Succeeded,

    /// Retries exhausted or the server blocked us; dropped from the queue
    Failed,
}

impl PageState {
    /// Returns true if this is a terminal state (no further processing needed)
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed)
    }

    /// Returns true if this represents a successful completion
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded)
    }

    /// Checks whether moving to `next` is a legal transition
    pub fn can_transition_to(&self, next: PageState) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Fetching)
                | (Self::Fetching, Self::Succeeded)
                | (Self::Fetching, Self::Failed)
        )
    }

    /// Moves to `next`, rejecting illegal transitions
    pub fn transition(self, next: PageState) -> Result<PageState, SpiderError> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(SpiderError::InvalidTransition {
                from: self,
                to: next,
            })
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Fetching => "fetching",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for PageState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_terminal() {
        assert!(!PageState::Pending.is_terminal());
        assert!(!PageState::Fetching.is_terminal());
        assert!(PageState::Succeeded.is_terminal());
        assert!(PageState::Failed.is_terminal());
    }

    #[test]
    fn test_is_success() {
        assert!(PageState::Succeeded.is_success());
        assert!(!PageState::Failed.is_success());
        assert!(!PageState::Pending.is_success());
    }

    #[test]
    fn test_legal_transitions() {
        let state = PageState::Pending.transition(PageState::Fetching).unwrap();
        assert_eq!(state, PageState::Fetching);
        assert_eq!(
            state.transition(PageState::Succeeded).unwrap(),
            PageState::Succeeded
        );
        assert_eq!(
            PageState::Fetching.transition(PageState::Failed).unwrap(),
            PageState::Failed
        );
    }

    #[test]
    fn test_illegal_transitions() {
        assert!(PageState::Pending.transition(PageState::Succeeded).is_err());
        assert!(PageState::Succeeded.transition(PageState::Fetching).is_err());
        assert!(PageState::Failed.transition(PageState::Succeeded).is_err());

        match PageState::Pending.transition(PageState::Failed) {
            Err(SpiderError::InvalidTransition { from, to }) => {
                assert_eq!(from, PageState::Pending);
                assert_eq!(to, PageState::Failed);
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", PageState::Pending), "pending");
        assert_eq!(format!("{}", PageState::Succeeded), "succeeded");
    }
}
