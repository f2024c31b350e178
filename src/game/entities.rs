//! Entities for the client-side view of a poker table.
//!
//! Everything here mirrors what the authoritative server reports. Nothing
//! in this module decides game outcomes; the types only have to hold the
//! server's facts without losing or inventing any.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{collections::VecDeque, fmt, time::Duration};

/// Fixed number of seats at a table. An open seat is a sentinel occupant,
/// never an absent key.
pub const SEAT_COUNT: usize = 9;

/// How many action log entries the client retains.
pub const ACTION_LOG_RETENTION: usize = 20;

/// Maximum number of community cards (flop + turn + river).
pub const MAX_BOARD_CARDS: usize = 5;

/// Number of hole cards per player.
pub const HOLE_CARD_COUNT: usize = 2;

/// Chip amounts as reported by the server.
pub type Chips = u64;

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub enum Suit {
    Club,
    Spade,
    Diamond,
    Heart,
}

impl fmt::Display for Suit {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let repr = match self {
            Self::Club => "♣",
            Self::Spade => "♠",
            Self::Diamond => "♦",
            Self::Heart => "♥",
        };
        write!(f, "{repr}")
    }
}

/// Placeholder for card values. 2-10 are face value, 11 is jack, 12 is
/// queen, 13 is king, and 1 or 14 is ace.
pub type Value = u8;

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub struct Card(pub Value, pub Suit);

impl fmt::Display for Card {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let value = match self.0 {
            1 | 14 => "A",
            11 => "J",
            12 => "Q",
            13 => "K",
            v => &v.to_string(),
        };
        write!(f, "{value}{}", self.1)
    }
}

/// A card as the local client is allowed to see it. Opponents' live hole
/// cards come down the wire as `null` and stay face-down until a showdown
/// reveal supplies them.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(from = "Option<Card>", into = "Option<Card>")]
pub enum CardView {
    FaceDown,
    FaceUp(Card),
}

impl From<Option<Card>> for CardView {
    fn from(card: Option<Card>) -> Self {
        match card {
            Some(card) => Self::FaceUp(card),
            None => Self::FaceDown,
        }
    }
}

impl From<CardView> for Option<Card> {
    fn from(view: CardView) -> Self {
        match view {
            CardView::FaceUp(card) => Some(card),
            CardView::FaceDown => None,
        }
    }
}

impl fmt::Display for CardView {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::FaceUp(card) => write!(f, "{card}"),
            Self::FaceDown => write!(f, "??"),
        }
    }
}

/// Server-issued player identifier.
#[derive(Clone, Debug, Deserialize, Eq, Hash, PartialEq, PartialOrd, Ord, Serialize)]
pub struct PlayerId(String);

impl PlayerId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for PlayerId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for PlayerId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// A player occupying a seat, as the server last described them.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SeatOccupant {
    pub player_id: PlayerId,
    pub display_name: String,
    pub chip_stack: Chips,
    /// 0 or 2 cards; face-up only for the local user or after a reveal.
    #[serde(default)]
    pub hole_cards: Vec<CardView>,
    /// Whether this seat holds the authoritative turn.
    #[serde(default)]
    pub is_active: bool,
    #[serde(default)]
    pub is_in_hand: bool,
    #[serde(default)]
    pub hand_rank: Option<String>,
    #[serde(default)]
    pub is_winner: bool,
    /// Countdown window for the turn timer, when the server provides one.
    #[serde(default)]
    pub turn_started_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub turn_expires_at: Option<DateTime<Utc>>,
}

impl SeatOccupant {
    /// A freshly seated player: present, but not yet dealt in.
    pub fn new(player_id: PlayerId, display_name: impl Into<String>, chip_stack: Chips) -> Self {
        Self {
            player_id,
            display_name: display_name.into(),
            chip_stack,
            hole_cards: Vec::new(),
            is_active: false,
            is_in_hand: false,
            hand_rank: None,
            is_winner: false,
            turn_started_at: None,
            turn_expires_at: None,
        }
    }

    /// Reset per-hand fields at a hand boundary. Chip stack and identity
    /// are untouched; only the server changes those.
    pub fn reset_for_hand(&mut self) {
        self.is_winner = false;
        self.hand_rank = None;
        self.hole_cards.clear();
        self.is_in_hand = self.chip_stack > 0;
        self.is_active = false;
        self.turn_started_at = None;
        self.turn_expires_at = None;
    }

    /// Time left in the current turn window, saturating at zero.
    pub fn turn_remaining(&self, now: DateTime<Utc>) -> Option<Duration> {
        let expires = self.turn_expires_at?;
        Some((expires - now).to_std().unwrap_or(Duration::ZERO))
    }
}

/// A seat is either open or held by a player. The open sentinel keeps the
/// seat map at fixed cardinality regardless of occupancy.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub enum Seat {
    #[default]
    Empty,
    Occupied(SeatOccupant),
}

impl Seat {
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }

    pub fn occupant(&self) -> Option<&SeatOccupant> {
        match self {
            Self::Occupied(occupant) => Some(occupant),
            Self::Empty => None,
        }
    }

    pub fn occupant_mut(&mut self) -> Option<&mut SeatOccupant> {
        match self {
            Self::Occupied(occupant) => Some(occupant),
            Self::Empty => None,
        }
    }

    /// Revert the seat to the open sentinel.
    pub fn clear(&mut self) {
        *self = Self::Empty;
    }
}

/// A live bet sitting in front of a seat. Lives only between a bet event
/// and the next `collect-bets`; each snapshot replaces the whole set.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Bet {
    pub player_id: PlayerId,
    pub seat: usize,
    pub amount: Chips,
}

/// One line of the table's action history.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionLogEntry {
    pub action: String,
    pub player: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<Chips>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hand_number: Option<u64>,
    pub timestamp: DateTime<Utc>,
}

impl ActionLogEntry {
    /// An entry attributed to the system rather than a player.
    pub fn system(action: impl Into<String>, hand_number: Option<u64>) -> Self {
        Self {
            action: action.into(),
            player: "System".to_string(),
            amount: None,
            detail: None,
            hand_number,
            timestamp: Utc::now(),
        }
    }

    pub fn player(
        player: impl Into<String>,
        action: impl Into<String>,
        amount: Option<Chips>,
    ) -> Self {
        Self {
            action: action.into(),
            player: player.into(),
            amount,
            detail: None,
            hand_number: None,
            timestamp: Utc::now(),
        }
    }
}

/// A chat line relayed through the table channel.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub player: String,
    pub message: String,
    #[serde(default)]
    pub color: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl ChatMessage {
    /// A synthesized system line, e.g. for join/leave notices.
    pub fn system(message: impl Into<String>) -> Self {
        Self {
            player: "System".to_string(),
            message: message.into(),
            color: None,
            timestamp: Utc::now(),
        }
    }
}

/// The canonical, server-derived table view. Exactly one mutable instance
/// exists per active table, owned by the reconciler; everything else reads.
///
/// Seat ids are 1-based on the wire and throughout the public API, matching
/// what the server sends.
#[derive(Clone, Debug, PartialEq)]
pub struct TableState {
    pub pot_total: Chips,
    pub current_bet_to_call: Chips,
    pub community_cards: Vec<Card>,
    /// Wire seat id of the dealer button, if placed.
    pub dealer_seat: Option<usize>,
    pub bets: Vec<Bet>,
    pub action_log: VecDeque<ActionLogEntry>,
    pub hand_number: Option<u64>,
    seats: [Seat; SEAT_COUNT],
}

impl Default for TableState {
    fn default() -> Self {
        Self {
            pot_total: 0,
            current_bet_to_call: 0,
            community_cards: Vec::new(),
            dealer_seat: None,
            bets: Vec::new(),
            action_log: VecDeque::new(),
            hand_number: None,
            seats: std::array::from_fn(|_| Seat::Empty),
        }
    }
}

impl TableState {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(seat_id: usize) -> Option<usize> {
        (1..=SEAT_COUNT).contains(&seat_id).then(|| seat_id - 1)
    }

    /// Look up a seat by its wire id (1..=9).
    pub fn seat(&self, seat_id: usize) -> Option<&Seat> {
        Self::slot(seat_id).map(|slot| &self.seats[slot])
    }

    pub(crate) fn seat_mut(&mut self, seat_id: usize) -> Option<&mut Seat> {
        Self::slot(seat_id).map(|slot| &mut self.seats[slot])
    }

    pub fn occupant(&self, seat_id: usize) -> Option<&SeatOccupant> {
        self.seat(seat_id)?.occupant()
    }

    pub(crate) fn occupant_mut(&mut self, seat_id: usize) -> Option<&mut SeatOccupant> {
        self.seat_mut(seat_id)?.occupant_mut()
    }

    /// Iterate occupied seats as `(seat_id, occupant)` pairs.
    pub fn occupied_seats(&self) -> impl Iterator<Item = (usize, &SeatOccupant)> {
        self.seats
            .iter()
            .enumerate()
            .filter_map(|(slot, seat)| seat.occupant().map(|occupant| (slot + 1, occupant)))
    }

    pub(crate) fn occupied_seats_mut(&mut self) -> impl Iterator<Item = (usize, &mut SeatOccupant)> {
        self.seats
            .iter_mut()
            .enumerate()
            .filter_map(|(slot, seat)| seat.occupant_mut().map(|occupant| (slot + 1, occupant)))
    }

    /// Replace the whole seat map from a snapshot. Unlisted seats revert
    /// to the open sentinel.
    pub(crate) fn replace_seats(&mut self, occupants: impl IntoIterator<Item = (usize, SeatOccupant)>) {
        self.seats = std::array::from_fn(|_| Seat::Empty);
        for (seat_id, occupant) in occupants {
            if let Some(seat) = self.seat_mut(seat_id) {
                *seat = Seat::Occupied(occupant);
            } else {
                log::warn!("snapshot referenced seat {seat_id} outside 1..={SEAT_COUNT}, dropped");
            }
        }
    }

    /// The seat currently holding a given player, if any.
    pub fn seat_of(&self, player_id: &PlayerId) -> Option<usize> {
        self.occupied_seats()
            .find(|(_, occupant)| &occupant.player_id == player_id)
            .map(|(seat_id, _)| seat_id)
    }

    /// The seat holding the authoritative turn. At most one exists.
    pub fn active_seat(&self) -> Option<usize> {
        self.occupied_seats()
            .find(|(_, occupant)| occupant.is_active)
            .map(|(seat_id, _)| seat_id)
    }

    /// Append a log entry, trimming to the retention bound.
    pub(crate) fn push_log(&mut self, entry: ActionLogEntry) {
        self.action_log.push_back(entry);
        while self.action_log.len() > ACTION_LOG_RETENTION {
            self.action_log.pop_front();
        }
    }
}

/// A concrete action the local user takes on their turn.
///
/// Serializes flat (`{"action": "call", "amount": 300}`) so it can be
/// embedded directly in a `player-action` command.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(tag = "action", rename_all = "kebab-case")]
pub enum PlayerAction {
    Fold,
    Check,
    Call { amount: Chips },
    Raise { amount: Chips },
    AllIn,
}

impl PlayerAction {
    /// The amount the action puts in, if it names one.
    pub fn amount(&self) -> Option<Chips> {
        match self {
            Self::Call { amount } | Self::Raise { amount } => Some(*amount),
            Self::Fold | Self::Check | Self::AllIn => None,
        }
    }
}

impl fmt::Display for PlayerAction {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let repr = match self {
            Self::Fold => "fold".to_string(),
            Self::Check => "check".to_string(),
            Self::Call { amount } => format!("call {amount}"),
            Self::Raise { amount } => format!("raise {amount}"),
            Self::AllIn => "all-in".to_string(),
        };
        write!(f, "{repr}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_card_display() {
        assert_eq!(Card(14, Suit::Spade).to_string(), "A♠");
        assert_eq!(Card(1, Suit::Heart).to_string(), "A♥");
        assert_eq!(Card(11, Suit::Club).to_string(), "J♣");
        assert_eq!(Card(10, Suit::Diamond).to_string(), "10♦");
    }

    #[test]
    fn test_card_view_wire_shape() {
        let up: CardView = serde_json::from_str("[13,\"Heart\"]").unwrap();
        assert_eq!(up, CardView::FaceUp(Card(13, Suit::Heart)));
        let down: CardView = serde_json::from_str("null").unwrap();
        assert_eq!(down, CardView::FaceDown);
        assert_eq!(serde_json::to_string(&down).unwrap(), "null");
    }

    #[test]
    fn test_seat_sentinel_roundtrip() {
        let mut seat = Seat::Occupied(SeatOccupant::new(PlayerId::new("u1"), "Alice", 1000));
        assert!(!seat.is_empty());
        seat.clear();
        assert!(seat.is_empty());
        assert_eq!(seat.occupant(), None);
    }

    #[test]
    fn test_reset_for_hand_keeps_stack_and_busts_empty_stacks() {
        let mut occupant = SeatOccupant::new(PlayerId::new("u1"), "Alice", 500);
        occupant.is_winner = true;
        occupant.hand_rank = Some("Two Pair".to_string());
        occupant.hole_cards = vec![CardView::FaceDown, CardView::FaceDown];
        occupant.is_active = true;
        occupant.reset_for_hand();
        assert!(!occupant.is_winner && !occupant.is_active);
        assert!(occupant.hole_cards.is_empty() && occupant.hand_rank.is_none());
        assert!(occupant.is_in_hand);
        assert_eq!(occupant.chip_stack, 500);

        let mut busted = SeatOccupant::new(PlayerId::new("u2"), "Bob", 0);
        busted.reset_for_hand();
        assert!(!busted.is_in_hand);
    }

    #[test]
    fn test_seat_ids_are_one_based() {
        let state = TableState::new();
        assert!(state.seat(0).is_none());
        assert!(state.seat(1).is_some());
        assert!(state.seat(SEAT_COUNT).is_some());
        assert!(state.seat(SEAT_COUNT + 1).is_none());
    }

    #[test]
    fn test_replace_seats_reverts_unlisted_to_empty() {
        let mut state = TableState::new();
        state.replace_seats([(3, SeatOccupant::new(PlayerId::new("u1"), "Alice", 100))]);
        assert!(state.occupant(3).is_some());
        state.replace_seats([(5, SeatOccupant::new(PlayerId::new("u2"), "Bob", 200))]);
        assert!(state.occupant(3).is_none());
        assert!(state.occupant(5).is_some());
    }

    #[test]
    fn test_action_log_retention() {
        let mut state = TableState::new();
        for i in 0..(ACTION_LOG_RETENTION + 5) {
            state.push_log(ActionLogEntry::player(format!("p{i}"), "check", None));
        }
        assert_eq!(state.action_log.len(), ACTION_LOG_RETENTION);
        assert_eq!(state.action_log.front().unwrap().player, "p5");
    }

    #[test]
    fn test_turn_remaining_saturates() {
        let mut occupant = SeatOccupant::new(PlayerId::new("u1"), "Alice", 100);
        let now = Utc::now();
        occupant.turn_expires_at = Some(now + chrono::Duration::seconds(10));
        let remaining = occupant.turn_remaining(now).unwrap();
        assert!(remaining <= Duration::from_secs(10));
        assert!(remaining >= Duration::from_secs(9));

        occupant.turn_expires_at = Some(now - chrono::Duration::seconds(5));
        assert_eq!(occupant.turn_remaining(now), Some(Duration::ZERO));
    }

    #[test]
    fn test_player_action_display() {
        assert_eq!(PlayerAction::Fold.to_string(), "fold");
        assert_eq!(PlayerAction::Call { amount: 300 }.to_string(), "call 300");
        assert_eq!(PlayerAction::AllIn.to_string(), "all-in");
    }
}
