//! Merges the server's event stream into one canonical [`TableState`].
//!
//! Two message shapes arrive: full snapshots (`game-state`), which
//! replace every field they cover, and narrow events, which mutate only
//! the fields they name. The reconciler applies them strictly in arrival
//! order. It never invents game facts of its own: the only local writes
//! are presentation-neutral bookkeeping such as clearing per-hand flags
//! at a hand boundary and synthesizing log lines.
//!
//! Applying the same snapshot twice leaves the state unchanged, so a
//! reconnect burst of repeated snapshots is harmless.

use super::entities::{
    ACTION_LOG_RETENTION, ActionLogEntry, Bet, Card, CardView, ChatMessage, Chips, PlayerId, Seat,
    SeatOccupant, TableState,
};
use crate::net::errors::{Rejection, RejectionKind};
use crate::net::messages::{ServerEvent, TableSnapshot};

/// Side effects of applying one event, for the session loop to act on.
/// Everything canonical has already been written into the state by the
/// time this is returned.
#[derive(Clone, Debug, Default)]
pub struct ApplyOutcome {
    /// The local seat's turn just began (its `is_active` flipped false to
    /// true). This is the only edge at which a pre-action may resolve.
    pub turn_started: bool,
    /// `collect-bets` arrived; these chips should animate into the pot.
    /// The canonical bet list is already empty.
    pub collected_bets: Option<Vec<Bet>>,
    /// The server turned down a sit-down or add-chips request.
    pub rejection: Option<Rejection>,
    /// A chat line to surface, either relayed or synthesized.
    pub chat: Option<ChatMessage>,
    /// A free-form server notice to surface.
    pub notice: Option<String>,
}

/// Owns the canonical table state for one session and folds server
/// events into it. One instance per active table; everything else reads
/// through [`state`](Self::state).
#[derive(Debug)]
pub struct Reconciler {
    state: TableState,
    local_player: PlayerId,
    /// Cached wire seat id of the local player, kept in sync with the
    /// seat map on every write that can move them.
    local_seat: Option<usize>,
    /// A sit-down is in flight; cleared by confirmation or rejection.
    awaiting_sit_down: bool,
    /// An add-chips is in flight; cleared when the stack grows or the
    /// server rejects.
    awaiting_add_chips: bool,
}

impl Reconciler {
    pub fn new(local_player: PlayerId) -> Self {
        Self {
            state: TableState::new(),
            local_player,
            local_seat: None,
            awaiting_sit_down: false,
            awaiting_add_chips: false,
        }
    }

    pub fn state(&self) -> &TableState {
        &self.state
    }

    pub fn local_player(&self) -> &PlayerId {
        &self.local_player
    }

    /// The seat the local player occupies, if seated.
    pub fn local_seat(&self) -> Option<usize> {
        self.local_seat
    }

    /// Whether the authoritative turn is on the local seat right now.
    pub fn is_local_turn(&self) -> bool {
        self.local_seat
            .and_then(|seat_id| self.state.occupant(seat_id))
            .is_some_and(|occupant| {
                occupant.player_id == self.local_player && occupant.is_active
            })
    }

    pub fn awaiting_sit_down(&self) -> bool {
        self.awaiting_sit_down
    }

    pub fn awaiting_add_chips(&self) -> bool {
        self.awaiting_add_chips
    }

    /// Note that a sit-down request went out.
    pub fn mark_awaiting_sit_down(&mut self) {
        self.awaiting_sit_down = true;
    }

    /// Note that an add-chips request went out.
    pub fn mark_awaiting_add_chips(&mut self) {
        self.awaiting_add_chips = true;
    }

    /// The connection dropped. In-flight requests can no longer be
    /// matched to their outcomes; the first post-reconnect snapshot is
    /// the sole source of truth for whatever they did or did not do.
    pub fn on_reconnect(&mut self) {
        self.awaiting_sit_down = false;
        self.awaiting_add_chips = false;
    }

    /// Fold one server event into the canonical state, in arrival order.
    pub fn apply(&mut self, event: &ServerEvent) -> ApplyOutcome {
        let was_local_turn = self.is_local_turn();
        let mut outcome = ApplyOutcome::default();

        match event {
            ServerEvent::GameState(snapshot) => self.apply_snapshot(snapshot),
            ServerEvent::PlayerActionLog(entry) => {
                // History only. A log line never moves chips; stack and
                // pot changes arrive through snapshots.
                self.state.push_log(entry.clone());
            }
            ServerEvent::HandStart {
                hand_number,
                hole_cards,
            } => self.apply_hand_start(*hand_number, hole_cards.as_deref()),
            ServerEvent::HandEnd { hand_number } => {
                self.state
                    .push_log(ActionLogEntry::system("hand complete", Some(*hand_number)));
            }
            ServerEvent::BlindPosted {
                player,
                amount,
                blind_type,
            } => {
                let mut entry = ActionLogEntry::player(player, "posted blind", Some(*amount));
                entry.detail = Some(blind_type.clone());
                entry.hand_number = self.state.hand_number;
                self.state.push_log(entry);
            }
            ServerEvent::PotWon { player, amount } => {
                self.state
                    .push_log(ActionLogEntry::player(player, "won the pot", Some(*amount)));
            }
            ServerEvent::Showdown { players, winners } => {
                for reveal in players {
                    if let Some(seat_id) = self.state.seat_of(&reveal.player_id)
                        && let Some(occupant) = self.state.occupant_mut(seat_id)
                    {
                        occupant.hole_cards =
                            reveal.cards.iter().copied().map(CardView::FaceUp).collect();
                        occupant.hand_rank = Some(reveal.hand_rank.clone());
                        occupant.is_in_hand = true;
                    }
                }
                for winner in winners {
                    if let Some(seat_id) = self.state.seat_of(winner)
                        && let Some(occupant) = self.state.occupant_mut(seat_id)
                    {
                        occupant.is_winner = true;
                    }
                }
            }
            ServerEvent::CollectBets { bets } => {
                // Canonical bets clear right now; lingering chips are the
                // overlay's business.
                self.state.bets.clear();
                outcome.collected_bets = Some(bets.clone());
            }
            ServerEvent::SitDownFailed { message } => {
                self.awaiting_sit_down = false;
                outcome.rejection = Some(Rejection {
                    kind: RejectionKind::SitDown,
                    message: message.clone(),
                });
            }
            ServerEvent::AddChipsFailed { message } => {
                self.awaiting_add_chips = false;
                outcome.rejection = Some(Rejection {
                    kind: RejectionKind::AddChips,
                    message: message.clone(),
                });
            }
            ServerEvent::ChatMessage(message) => {
                outcome.chat = Some(message.clone());
            }
            ServerEvent::PlayerJoined {
                seat,
                player_id,
                display_name,
                chip_stack,
            } => {
                outcome.chat =
                    self.apply_player_joined(*seat, player_id, display_name, *chip_stack);
            }
            ServerEvent::PlayerLeft {
                seat,
                player_id,
                display_name,
            } => {
                outcome.chat = self.apply_player_left(*seat, player_id, display_name);
            }
            ServerEvent::Notification { message } => {
                outcome.notice = Some(message.clone());
            }
        }

        outcome.turn_started = !was_local_turn && self.is_local_turn();
        outcome
    }

    /// Replace every snapshot-covered field wholesale. Fields the
    /// snapshot leaves optional and absent keep their narrow-event
    /// semantics: absent bets mean no live bets, absent log means the
    /// accumulated log stands.
    fn apply_snapshot(&mut self, snapshot: &TableSnapshot) {
        let old_local_stack = self.local_stack();

        self.state.pot_total = snapshot.pot_total;
        self.state.current_bet_to_call = snapshot.current_bet_to_call;
        self.state.community_cards = snapshot.community_cards.clone();
        self.state.dealer_seat = snapshot.dealer_seat;
        self.state.replace_seats(
            snapshot
                .seats
                .iter()
                .cloned()
                .map(|seated| (seated.seat, seated.occupant)),
        );
        self.enforce_single_active();
        self.local_seat = self.state.seat_of(&self.local_player);

        if let Some(cards) = &snapshot.hole_cards
            && let Some(seat_id) = self.local_seat
            && let Some(occupant) = self.state.occupant_mut(seat_id)
        {
            occupant.hole_cards = cards.iter().copied().map(CardView::FaceUp).collect();
        }

        self.state.bets = snapshot.bets.clone().unwrap_or_default();
        if let Some(log) = &snapshot.action_log {
            let skip = log.len().saturating_sub(ACTION_LOG_RETENTION);
            self.state.action_log = log.iter().skip(skip).cloned().collect();
        }
        if snapshot.hand_number.is_some() {
            self.state.hand_number = snapshot.hand_number;
        }

        if self.local_seat.is_some() {
            self.awaiting_sit_down = false;
        }
        if self.awaiting_add_chips
            && let (Some(old), Some(new)) = (old_local_stack, self.local_stack())
            && new > old
        {
            self.awaiting_add_chips = false;
        }
    }

    fn apply_hand_start(&mut self, hand_number: u64, hole_cards: Option<&[Card]>) {
        self.state.hand_number = Some(hand_number);
        self.state.community_cards.clear();
        for (_, occupant) in self.state.occupied_seats_mut() {
            occupant.reset_for_hand();
        }
        if let Some(cards) = hole_cards
            && let Some(seat_id) = self.local_seat
            && let Some(occupant) = self.state.occupant_mut(seat_id)
        {
            occupant.hole_cards = cards.iter().copied().map(CardView::FaceUp).collect();
        }
        self.state
            .push_log(ActionLogEntry::system("new hand", Some(hand_number)));
    }

    fn apply_player_joined(
        &mut self,
        seat_id: usize,
        player_id: &PlayerId,
        display_name: &str,
        chip_stack: Chips,
    ) -> Option<ChatMessage> {
        let Some(seat) = self.state.seat_mut(seat_id) else {
            log::warn!("player-joined referenced invalid seat {seat_id}, dropped");
            return None;
        };
        match seat.occupant() {
            // Redelivery of a join we already hold. No state change, no
            // duplicate notice.
            Some(occupant) if &occupant.player_id == player_id => {
                if player_id == &self.local_player {
                    self.awaiting_sit_down = false;
                }
                None
            }
            Some(occupant) => {
                log::warn!(
                    "player-joined for seat {seat_id} conflicts with occupant {}, ignored",
                    occupant.player_id
                );
                None
            }
            None => {
                *seat = Seat::Occupied(SeatOccupant::new(
                    player_id.clone(),
                    display_name,
                    chip_stack,
                ));
                if player_id == &self.local_player {
                    self.local_seat = Some(seat_id);
                    self.awaiting_sit_down = false;
                }
                Some(ChatMessage::system(format!(
                    "{display_name} joined the table"
                )))
            }
        }
    }

    fn apply_player_left(
        &mut self,
        seat_id: usize,
        player_id: &PlayerId,
        display_name: &str,
    ) -> Option<ChatMessage> {
        let Some(seat) = self.state.seat_mut(seat_id) else {
            log::warn!("player-left referenced invalid seat {seat_id}, dropped");
            return None;
        };
        // Only clear when both seat and identity match; a stale leave
        // after the seat changed hands must not evict the new occupant.
        match seat.occupant() {
            Some(occupant) if &occupant.player_id == player_id => {
                let name = if display_name.is_empty() {
                    occupant.display_name.clone()
                } else {
                    display_name.to_string()
                };
                seat.clear();
                if player_id == &self.local_player {
                    self.local_seat = None;
                }
                Some(ChatMessage::system(format!("{name} left the table")))
            }
            _ => None,
        }
    }

    fn local_stack(&self) -> Option<Chips> {
        self.state
            .seat_of(&self.local_player)
            .and_then(|seat_id| self.state.occupant(seat_id))
            .map(|occupant| occupant.chip_stack)
    }

    /// At most one seat may hold the turn. If a snapshot claims more,
    /// the lowest-numbered seat wins and the rest are demoted.
    fn enforce_single_active(&mut self) {
        let mut seen = false;
        for (seat_id, occupant) in self.state.occupied_seats_mut() {
            if occupant.is_active {
                if seen {
                    log::warn!("seat {seat_id} also flagged active, demoting");
                    occupant.is_active = false;
                } else {
                    seen = true;
                }
            }
        }
    }
}
