//! Transient presentation state layered over the canonical table.
//!
//! The overlay tracks short-lived visual facts: chips sitting on the
//! felt, a bet collection sliding into the pot, the dealer button moving
//! between seats, and the optimistic chip/pot delta shown while a local
//! action awaits confirmation. None of it is authoritative. Nothing that
//! determines pot or stack totals may read from here; the reconciler
//! clears the canonical bet list the moment `collect-bets` arrives and
//! the overlay buffers its own presentation lag.

use super::entities::{Bet, Chips, PlayerAction};
use std::time::{Duration, Instant};

/// How long collected chips stay visible while fading into the pot.
pub const COLLECT_FADE: Duration = Duration::from_millis(500);

/// How long the dealer button's slide between seats is tracked.
pub const DEALER_MOVE_FADE: Duration = Duration::from_millis(500);

#[derive(Clone, Debug)]
struct Collection {
    bets: Vec<Bet>,
    deadline: Instant,
}

/// The dealer button in transit between two seats.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct DealerMove {
    pub from: usize,
    pub to: usize,
}

/// Optimistic chip/pot rendering delta for a sent-but-unconfirmed local
/// action. Never written into canonical state; dropped wholesale on the
/// next authoritative snapshot or on reconnect.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
struct DisplayDelta {
    chips_out: Chips,
    pot_in: Chips,
}

#[derive(Debug, Default)]
pub struct AnimationOverlay {
    bets_in_flight: Vec<Bet>,
    collection: Option<Collection>,
    dealer_seat: Option<usize>,
    dealer_move: Option<(DealerMove, Instant)>,
    delta: DisplayDelta,
}

impl AnimationOverlay {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mirror the canonical bet list for presentation.
    pub fn sync_bets(&mut self, bets: &[Bet]) {
        self.bets_in_flight = bets.to_vec();
    }

    pub fn bets_in_flight(&self) -> &[Bet] {
        &self.bets_in_flight
    }

    /// Start presenting a bet collection. A collection already in flight
    /// is replaced and its timer restarted, never stacked.
    pub fn begin_collection(&mut self, bets: Vec<Bet>, now: Instant) {
        self.bets_in_flight.clear();
        self.collection = Some(Collection {
            bets,
            deadline: now + COLLECT_FADE,
        });
    }

    pub fn is_collecting(&self) -> bool {
        self.collection.is_some()
    }

    /// The chips currently sliding into the pot, if a collection is
    /// still presenting.
    pub fn collected_bets(&self) -> &[Bet] {
        self.collection
            .as_ref()
            .map(|collection| collection.bets.as_slice())
            .unwrap_or_default()
    }

    /// Note the authoritative dealer seat; a change starts a button move.
    pub fn observe_dealer(&mut self, dealer_seat: Option<usize>, now: Instant) {
        if let (Some(from), Some(to)) = (self.dealer_seat, dealer_seat)
            && from != to
        {
            self.dealer_move = Some((DealerMove { from, to }, now + DEALER_MOVE_FADE));
        }
        self.dealer_seat = dealer_seat;
    }

    pub fn dealer_move(&self) -> Option<DealerMove> {
        self.dealer_move.map(|(dealer_move, _)| dealer_move)
    }

    /// Stage the optimistic rendering delta for a local action the way
    /// the table displays it: a call moves the call amount, an all-in
    /// moves the whole stack. Other actions wait for the server.
    pub fn stage_local_action(&mut self, action: &PlayerAction, chip_stack: Chips) {
        match action {
            PlayerAction::Call { amount } => {
                let amount = (*amount).min(chip_stack);
                self.delta.chips_out += amount;
                self.delta.pot_in += amount;
            }
            PlayerAction::AllIn => {
                let remaining = chip_stack.saturating_sub(self.delta.chips_out);
                self.delta.chips_out += remaining;
                self.delta.pot_in += remaining;
            }
            PlayerAction::Fold | PlayerAction::Check | PlayerAction::Raise { .. } => {}
        }
    }

    /// Drop the optimistic delta; the next authoritative state fully
    /// overwrites it, never merges.
    pub fn clear_display_delta(&mut self) {
        self.delta = DisplayDelta::default();
    }

    /// The local chip stack as rendered: canonical minus pending outlay.
    pub fn displayed_stack(&self, canonical: Chips) -> Chips {
        canonical.saturating_sub(self.delta.chips_out)
    }

    /// The pot as rendered: canonical plus pending outlay.
    pub fn displayed_pot(&self, canonical: Chips) -> Chips {
        canonical + self.delta.pot_in
    }

    /// Expire timer-bounded facts.
    pub fn tick(&mut self, now: Instant) {
        if self
            .collection
            .as_ref()
            .is_some_and(|collection| now >= collection.deadline)
        {
            self.collection = None;
        }
        if self
            .dealer_move
            .is_some_and(|(_, deadline)| now >= deadline)
        {
            self.dealer_move = None;
        }
    }

    /// Forget everything, e.g. when the connection drops. The next
    /// snapshot repopulates whatever still matters.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
