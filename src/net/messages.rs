//! Wire protocol between the client and the authoritative table server.
//!
//! Everything travels as JSON text frames, internally tagged with the
//! event name (`{"type": "game-state", ...}`). A message either decodes
//! completely or is rejected whole; there is no partial application of a
//! payload with missing fields.

use crate::game::entities::{
    ActionLogEntry, Bet, Card, ChatMessage, Chips, PlayerAction, PlayerId, SeatOccupant,
};
use crate::net::errors::ClientError;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Server-issued table identifier.
#[derive(Clone, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub struct TableId(String);

impl TableId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TableId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for TableId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// One seat of a full snapshot: the wire seat id plus the occupant.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct SeatedPlayer {
    pub seat: usize,
    #[serde(flatten)]
    pub occupant: SeatOccupant,
}

/// A complete replacement of all tracked table fields. Authoritative
/// over any prior partial state; never merged with it.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TableSnapshot {
    pub pot_total: Chips,
    pub current_bet_to_call: Chips,
    #[serde(default)]
    pub community_cards: Vec<Card>,
    #[serde(default)]
    pub dealer_seat: Option<usize>,
    #[serde(default)]
    pub seats: Vec<SeatedPlayer>,
    /// Live bets; absence means there are none (e.g. end of round).
    #[serde(default)]
    pub bets: Option<Vec<Bet>>,
    #[serde(default)]
    pub action_log: Option<Vec<ActionLogEntry>>,
    /// The local player's hole cards, when this push carries them.
    #[serde(default)]
    pub hole_cards: Option<Vec<Card>>,
    #[serde(default)]
    pub hand_number: Option<u64>,
}

/// A player's revealed hand at showdown.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShowdownReveal {
    pub player_id: PlayerId,
    pub cards: Vec<Card>,
    pub hand_rank: String,
}

/// A message from the table server: either a full snapshot or a narrow
/// event describing one discrete fact.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum ServerEvent {
    /// Full snapshot; replaces every snapshot-covered field.
    GameState(TableSnapshot),
    /// A line for the action history; touches nothing else.
    PlayerActionLog(ActionLogEntry),
    /// A new hand is being dealt.
    HandStart {
        hand_number: u64,
        #[serde(default)]
        hole_cards: Option<Vec<Card>>,
    },
    /// Hand boundary marker; log only.
    HandEnd { hand_number: u64 },
    BlindPosted {
        player: String,
        amount: Chips,
        blind_type: String,
    },
    PotWon { player: String, amount: Chips },
    /// Cards revealed and winners declared at the end of a hand.
    Showdown {
        players: Vec<ShowdownReveal>,
        winners: Vec<PlayerId>,
    },
    /// Bets leave the felt for the pot.
    CollectBets { bets: Vec<Bet> },
    SitDownFailed { message: String },
    AddChipsFailed { message: String },
    ChatMessage(ChatMessage),
    PlayerJoined {
        seat: usize,
        player_id: PlayerId,
        display_name: String,
        chip_stack: Chips,
    },
    PlayerLeft {
        seat: usize,
        player_id: PlayerId,
        #[serde(default)]
        display_name: String,
    },
    Notification { message: String },
}

/// Identity attached to outbound commands.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct PlayerRef {
    pub id: PlayerId,
    pub name: String,
}

/// A user intent serialized for the server. Sending one never implies
/// success: the server confirms through a later state event, or rejects
/// with an explicit failure notice.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum ClientCommand {
    JoinTable { table_id: TableId },
    SitDown {
        seat_id: usize,
        buy_in_amount: Chips,
        player: PlayerRef,
    },
    AddChips { amount: Chips },
    StandUp,
    PlayerAction {
        #[serde(flatten)]
        action: PlayerAction,
        player: String,
    },
    ChatMessage(ChatMessage),
}

impl ClientCommand {
    pub fn sit_down(seat_id: usize, buy_in_amount: Chips, player: PlayerRef) -> Self {
        Self::SitDown {
            seat_id,
            buy_in_amount,
            player,
        }
    }

    pub fn player_action(action: PlayerAction, player: impl Into<String>) -> Self {
        Self::PlayerAction {
            action,
            player: player.into(),
        }
    }

    pub fn chat(
        player: impl Into<String>,
        message: impl Into<String>,
        color: Option<String>,
    ) -> Self {
        Self::ChatMessage(ChatMessage {
            player: player.into(),
            message: message.into(),
            color,
            timestamp: Utc::now(),
        })
    }
}

impl fmt::Display for ClientCommand {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let repr = match self {
            Self::JoinTable { table_id } => format!("join table {table_id}"),
            Self::SitDown {
                seat_id,
                buy_in_amount,
                ..
            } => format!("sit down at seat {seat_id} for {buy_in_amount}"),
            Self::AddChips { amount } => format!("add {amount} chips"),
            Self::StandUp => "stand up".to_string(),
            Self::PlayerAction { action, .. } => action.to_string(),
            Self::ChatMessage(_) => "chat".to_string(),
        };
        write!(f, "{repr}")
    }
}

/// Decode one inbound frame. A failure means the whole frame is dropped
/// by the caller; nothing is applied from it.
pub fn decode_event(text: &str) -> Result<ServerEvent, ClientError> {
    Ok(serde_json::from_str(text)?)
}

/// Encode one outbound command as a text frame.
pub fn encode_command(command: &ClientCommand) -> Result<String, ClientError> {
    Ok(serde_json::to_string(command)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::entities::Suit;
    use serde_json::json;

    #[test]
    fn test_game_state_decodes_from_wire_shape() {
        let frame = json!({
            "type": "game-state",
            "potTotal": 5000,
            "currentBetToCall": 200,
            "communityCards": [[14, "Spade"], [13, "Heart"]],
            "dealerSeat": 3,
            "seats": [{
                "seat": 5,
                "playerId": "u1",
                "displayName": "Alice",
                "chipStack": 1000,
                "isActive": true
            }],
            "bets": [{"playerId": "u1", "seat": 5, "amount": 200}],
            "holeCards": [[2, "Club"], [7, "Diamond"]]
        });
        let event = decode_event(&frame.to_string()).unwrap();
        let ServerEvent::GameState(snapshot) = event else {
            panic!("expected a snapshot");
        };
        assert_eq!(snapshot.pot_total, 5000);
        assert_eq!(snapshot.current_bet_to_call, 200);
        assert_eq!(snapshot.community_cards, vec![Card(14, Suit::Spade), Card(13, Suit::Heart)]);
        assert_eq!(snapshot.dealer_seat, Some(3));
        assert_eq!(snapshot.seats.len(), 1);
        assert_eq!(snapshot.seats[0].seat, 5);
        assert!(snapshot.seats[0].occupant.is_active);
        assert_eq!(snapshot.bets.as_ref().unwrap().len(), 1);
        assert_eq!(snapshot.hole_cards.unwrap().len(), 2);
    }

    #[test]
    fn test_narrow_event_tags() {
        let event = decode_event(r#"{"type": "hand-start", "handNumber": 7}"#).unwrap();
        assert_eq!(
            event,
            ServerEvent::HandStart {
                hand_number: 7,
                hole_cards: None
            }
        );

        let event =
            decode_event(r#"{"type": "sit-down-failed", "message": "seat taken"}"#).unwrap();
        assert_eq!(
            event,
            ServerEvent::SitDownFailed {
                message: "seat taken".to_string()
            }
        );
    }

    #[test]
    fn test_collect_bets_payload() {
        let frame = json!({
            "type": "collect-bets",
            "bets": [{"playerId": "p1", "seat": 2, "amount": 500}]
        });
        let event = decode_event(&frame.to_string()).unwrap();
        let ServerEvent::CollectBets { bets } = event else {
            panic!("expected collect-bets");
        };
        assert_eq!(bets[0].player_id, PlayerId::new("p1"));
        assert_eq!(bets[0].amount, 500);
    }

    #[test]
    fn test_missing_field_rejects_whole_frame() {
        // blind-posted without its amount must not half-apply.
        let err = decode_event(r#"{"type": "blind-posted", "player": "Bob"}"#);
        assert!(err.is_err());
    }

    #[test]
    fn test_unknown_event_type_rejected() {
        assert!(decode_event(r#"{"type": "telepathy", "message": "hi"}"#).is_err());
    }

    #[test]
    fn test_garbage_frame_rejected() {
        assert!(decode_event("not json at all").is_err());
    }

    #[test]
    fn test_player_action_command_is_flat() {
        let command = ClientCommand::player_action(PlayerAction::Call { amount: 300 }, "alice");
        let value = serde_json::to_value(&command).unwrap();
        assert_eq!(
            value,
            json!({
                "type": "player-action",
                "action": "call",
                "amount": 300,
                "player": "alice"
            })
        );
    }

    #[test]
    fn test_sit_down_command_wire_shape() {
        let command = ClientCommand::sit_down(
            4,
            1000,
            PlayerRef {
                id: PlayerId::new("u1"),
                name: "Alice".to_string(),
            },
        );
        let value = serde_json::to_value(&command).unwrap();
        assert_eq!(
            value,
            json!({
                "type": "sit-down",
                "seatId": 4,
                "buyInAmount": 1000,
                "player": {"id": "u1", "name": "Alice"}
            })
        );
    }

    #[test]
    fn test_stand_up_is_bare() {
        let value = serde_json::to_value(&ClientCommand::StandUp).unwrap();
        assert_eq!(value, json!({"type": "stand-up"}));
    }

    #[test]
    fn test_join_table_roundtrip() {
        let command = ClientCommand::JoinTable {
            table_id: TableId::new("table-9"),
        };
        let encoded = encode_command(&command).unwrap();
        let decoded: ClientCommand = serde_json::from_str(&encoded).unwrap();
        assert_eq!(command, decoded);
    }

    #[test]
    fn test_showdown_decodes_reveals_and_winners() {
        let frame = json!({
            "type": "showdown",
            "players": [{
                "playerId": "u2",
                "cards": [[10, "Heart"], [10, "Spade"]],
                "handRank": "Pair of Tens"
            }],
            "winners": ["u2"]
        });
        let event = decode_event(&frame.to_string()).unwrap();
        let ServerEvent::Showdown { players, winners } = event else {
            panic!("expected showdown");
        };
        assert_eq!(players[0].hand_rank, "Pair of Tens");
        assert_eq!(winners, vec![PlayerId::new("u2")]);
    }
}
