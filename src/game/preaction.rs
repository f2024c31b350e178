//! Pre-actions: intents staged before the local player's turn arrives.
//!
//! A pre-action is owned entirely by the local client and is never
//! transmitted as staged. It resolves into a concrete [`PlayerAction`]
//! at the exact edge where turn control transfers to the local seat,
//! and is consumed by that resolution — or discarded when the user acts
//! manually instead.

use super::entities::{Chips, PlayerAction};

/// An intent the user can stage while waiting for their turn.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum PreAction {
    /// Fold no matter what.
    Fold,
    /// Check if checking is free, otherwise fold.
    CheckOrFold,
    /// Call whatever the current bet is, or check if there is none.
    CallAny,
}

/// Holds at most one staged pre-action.
#[derive(Debug, Default)]
pub struct PreActionQueue {
    staged: Option<PreAction>,
}

impl PreActionQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stage an intent. Staging the intent that is already staged clears
    /// it instead (the buttons toggle); staging a different one replaces
    /// the previous selection.
    pub fn stage(&mut self, intent: PreAction) {
        self.staged = match self.staged {
            Some(staged) if staged == intent => None,
            _ => Some(intent),
        };
    }

    pub fn staged(&self) -> Option<PreAction> {
        self.staged
    }

    /// Discard the staged intent, e.g. when the user acts manually.
    pub fn clear(&mut self) {
        self.staged = None;
    }

    /// Resolve the staged intent against the authoritative bet to call.
    ///
    /// Call this only at the edge where the local seat's `is_active`
    /// flips false to true. Whatever the outcome, the queue is emptied:
    /// a pre-action fires at most once.
    pub fn resolve(&mut self, current_bet_to_call: Chips) -> Option<PlayerAction> {
        let staged = self.staged.take()?;
        let action = match staged {
            PreAction::Fold => PlayerAction::Fold,
            PreAction::CheckOrFold => {
                if current_bet_to_call > 0 {
                    PlayerAction::Fold
                } else {
                    PlayerAction::Check
                }
            }
            PreAction::CallAny => {
                if current_bet_to_call > 0 {
                    PlayerAction::Call {
                        amount: current_bet_to_call,
                    }
                } else {
                    PlayerAction::Check
                }
            }
        };
        Some(action)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_toggles_same_intent_off() {
        let mut queue = PreActionQueue::new();
        queue.stage(PreAction::CallAny);
        assert_eq!(queue.staged(), Some(PreAction::CallAny));
        queue.stage(PreAction::CallAny);
        assert_eq!(queue.staged(), None);
    }

    #[test]
    fn test_stage_replaces_different_intent() {
        let mut queue = PreActionQueue::new();
        queue.stage(PreAction::Fold);
        queue.stage(PreAction::CheckOrFold);
        assert_eq!(queue.staged(), Some(PreAction::CheckOrFold));
    }

    #[test]
    fn test_check_or_fold_checks_when_bet_is_zero() {
        let mut queue = PreActionQueue::new();
        queue.stage(PreAction::CheckOrFold);
        assert_eq!(queue.resolve(0), Some(PlayerAction::Check));
    }

    #[test]
    fn test_check_or_fold_folds_against_a_bet() {
        let mut queue = PreActionQueue::new();
        queue.stage(PreAction::CheckOrFold);
        assert_eq!(queue.resolve(150), Some(PlayerAction::Fold));
    }

    #[test]
    fn test_call_any_matches_the_bet() {
        let mut queue = PreActionQueue::new();
        queue.stage(PreAction::CallAny);
        assert_eq!(queue.resolve(300), Some(PlayerAction::Call { amount: 300 }));
    }

    #[test]
    fn test_call_any_checks_when_bet_is_zero() {
        let mut queue = PreActionQueue::new();
        queue.stage(PreAction::CallAny);
        assert_eq!(queue.resolve(0), Some(PlayerAction::Check));
    }

    #[test]
    fn test_fold_resolves_unconditionally() {
        let mut queue = PreActionQueue::new();
        queue.stage(PreAction::Fold);
        assert_eq!(queue.resolve(0), Some(PlayerAction::Fold));
    }

    #[test]
    fn test_resolution_consumes_the_intent() {
        let mut queue = PreActionQueue::new();
        queue.stage(PreAction::CallAny);
        assert!(queue.resolve(100).is_some());
        // A later turn edge without restaging fires nothing.
        assert_eq!(queue.resolve(100), None);
    }

    #[test]
    fn test_resolve_with_nothing_staged_is_a_no_op() {
        let mut queue = PreActionQueue::new();
        assert_eq!(queue.resolve(500), None);
    }
}
