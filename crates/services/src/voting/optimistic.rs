//! Client-side vote state with an optimistic override.
//!
//! The card flips immediately on click; the server's answer then either
//! becomes the confirmed state or, on failure, the flip is discarded.

use domains::{DomainError, Result, VoteAction, VoteOutcome};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteView {
    pub is_upvoted: bool,
    pub upvotes: u32,
}

impl VoteView {
    fn flipped(self) -> Self {
        if self.is_upvoted {
            Self {
                is_upvoted: false,
                upvotes: self.upvotes.saturating_sub(1),
            }
        } else {
            Self {
                is_upvoted: true,
                upvotes: self.upvotes.saturating_add(1),
            }
        }
    }
}

impl From<VoteOutcome> for VoteView {
    fn from(outcome: VoteOutcome) -> Self {
        Self {
            is_upvoted: outcome.action == VoteAction::Added,
            upvotes: outcome.upvotes,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptimisticVote {
    confirmed: VoteView,
    pending: Option<VoteView>,
}

impl OptimisticVote {
    pub fn new(confirmed: VoteView) -> Self {
        Self {
            confirmed,
            pending: None,
        }
    }

    /// What the card should show right now.
    pub fn displayed(&self) -> VoteView {
        self.pending.unwrap_or(self.confirmed)
    }

    pub fn confirmed(&self) -> VoteView {
        self.confirmed
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Applies the flip locally. Only one toggle may be in flight.
    pub fn begin_toggle(&mut self) -> Result<VoteView> {
        if self.pending.is_some() {
            return Err(DomainError::Conflict("a vote toggle is already in flight".into()));
        }
        let next = self.confirmed.flipped();
        self.pending = Some(next);
        Ok(next)
    }

    /// Adopts the server's answer, or drops the override on failure.
    pub fn settle(&mut self, result: &Result<VoteOutcome>) -> VoteView {
        match result {
            Ok(outcome) => {
                self.confirmed = VoteView::from(*outcome);
                self.pending = None;
            }
            Err(_) => self.rollback(),
        }
        self.confirmed
    }

    pub fn rollback(&mut self) {
        self.pending = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn view(is_upvoted: bool, upvotes: u32) -> VoteView {
        VoteView { is_upvoted, upvotes }
    }

    #[test]
    fn test_flip_is_shown_before_server_answers() {
        let mut state = OptimisticVote::new(view(false, 4));
        assert_eq!(state.begin_toggle().unwrap(), view(true, 5));
        assert_eq!(state.displayed(), view(true, 5));
        assert_eq!(state.confirmed(), view(false, 4));
    }

    #[test]
    fn test_server_answer_wins_over_local_guess() {
        let mut state = OptimisticVote::new(view(false, 4));
        state.begin_toggle().unwrap();
        // someone else voted meanwhile
        let settled = state.settle(&Ok(VoteOutcome { action: VoteAction::Added, upvotes: 6 }));
        assert_eq!(settled, view(true, 6));
        assert!(!state.is_pending());
    }

    #[test]
    fn test_failure_rolls_back() {
        let mut state = OptimisticVote::new(view(true, 1));
        assert_eq!(state.begin_toggle().unwrap(), view(false, 0));
        state.settle(&Err(DomainError::TransientStore("timeout".into())));
        assert_eq!(state.displayed(), view(true, 1));
    }

    #[test]
    fn test_second_click_while_pending_is_rejected() {
        let mut state = OptimisticVote::new(view(false, 0));
        state.begin_toggle().unwrap();
        assert!(matches!(state.begin_toggle(), Err(DomainError::Conflict(_))));
    }

    #[test]
    fn test_counter_never_goes_negative() {
        let mut state = OptimisticVote::new(view(true, 0));
        assert_eq!(state.begin_toggle().unwrap(), view(false, 0));
    }
}
