//! Protocol module - JSON message types for online battle
//!
//! One JSON object per line. Every message carries a `type` tag in SCREAMING_SNAKE_CASE;
//! the remaining fields depend on the type. Inbound snapshot fields are parsed leniently:
//! a field with the wrong shape reads as absent instead of rejecting the whole message.

use serde::de::{DeserializeOwned, IgnoredAny};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::core::battle::{EndReason, MatchResult, OutboundEvent, RemoteEvent};
use crate::core::controller::{PlayerState, RemoteUpdate};
use crate::core::piece::{PieceState, PieceUpdate};
use crate::types::{Cell, DebuffKind, Rgb, Side};

/// Default `DEBUFF.duration` in seconds when the field is missing.
pub const DEFAULT_DEBUFF_SECS: f64 = 5.0;

/// A grid cell on the wire: `0` when empty, `[r, g, b]` when occupied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WireCell(pub Cell);

impl Serialize for WireCell {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self.0 {
            Some(rgb) => rgb.to_array().serialize(serializer),
            None => serializer.serialize_u8(0),
        }
    }
}

impl<'de> Deserialize<'de> for WireCell {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Rgb([u8; 3]),
            Other(IgnoredAny),
        }

        Ok(match Raw::deserialize(deserializer)? {
            Raw::Rgb(rgb) => WireCell(Some(Rgb::from(rgb))),
            Raw::Other(_) => WireCell(None),
        })
    }
}

/// Read a field as `None` when its value has the wrong shape.
fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(T::deserialize(value).ok())
}

/// Falling piece as published in `STATE`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WirePiece {
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub x: Option<i8>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub y: Option<i8>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub rotation: Option<u8>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub color: Option<[u8; 3]>,
    /// Current rotation matrix, `1` for filled.
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub shape: Option<Vec<Vec<u8>>>,
}

impl From<&PieceState> for WirePiece {
    fn from(piece: &PieceState) -> Self {
        Self {
            x: Some(piece.x),
            y: Some(piece.y),
            rotation: Some(piece.rotation),
            color: Some(piece.color.to_array()),
            shape: Some(
                piece
                    .matrix
                    .iter()
                    .map(|row| row.iter().map(|&filled| filled as u8).collect())
                    .collect(),
            ),
        }
    }
}

impl From<WirePiece> for PieceUpdate {
    fn from(piece: WirePiece) -> Self {
        Self {
            x: piece.x,
            y: piece.y,
            rotation: piece.rotation,
            color: piece.color.map(Rgb::from),
            matrix: piece
                .shape
                .map(|rows| rows.into_iter().map(|row| row.into_iter().map(|v| v != 0).collect()).collect()),
        }
    }
}

/// Body of `STATE` (outbound) and `OPPONENT_STATE` (inbound).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatePayload {
    /// Rows top to bottom.
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub grid: Option<Vec<Vec<WireCell>>>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub score: Option<u32>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub lines: Option<u32>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub piece: Option<WirePiece>,
}

impl From<&PlayerState> for StatePayload {
    fn from(state: &PlayerState) -> Self {
        Self {
            grid: Some(
                state
                    .grid
                    .iter()
                    .map(|row| row.iter().copied().map(WireCell).collect())
                    .collect(),
            ),
            score: Some(state.score),
            lines: Some(state.lines),
            piece: state.piece.as_ref().map(WirePiece::from),
        }
    }
}

impl From<StatePayload> for RemoteUpdate {
    fn from(payload: StatePayload) -> Self {
        Self {
            grid: payload
                .grid
                .map(|rows| rows.into_iter().map(|row| row.into_iter().map(|c| c.0).collect()).collect()),
            score: payload.score,
            lines: payload.lines,
            piece: payload.piece.map(PieceUpdate::from),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GameEndReason {
    OpponentDisconnected,
    OpponentToppedOut,
    Timeout,
}

fn default_player_name() -> String {
    "Player".to_string()
}

fn default_debuff_secs() -> f64 {
    DEFAULT_DEBUFF_SECS
}

/// Every message of the online battle protocol, both directions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Message {
    Join {
        #[serde(default = "default_player_name")]
        player_name: String,
    },
    Waiting,
    MatchStart {
        /// 1 for the player that waited, 2 for the joiner.
        role: u8,
        game_id: String,
        #[serde(default)]
        opponent_name: String,
        #[serde(default)]
        my_blocks: Vec<String>,
        #[serde(default)]
        opponent_blocks: Vec<String>,
    },
    State(StatePayload),
    OpponentState(StatePayload),
    Garbage {
        lines: u32,
    },
    Debuff {
        debuff: String,
        /// Seconds.
        #[serde(default = "default_debuff_secs")]
        duration: f64,
    },
    GameOver,
    GameEnd {
        /// Role of the winner, 0 for a draw.
        winner: u8,
        reason: GameEndReason,
    },
    OpponentDisconnected,
    TimeSync {
        /// Milliseconds left on the match clock.
        remaining: u64,
    },
}

impl Message {
    pub fn type_name(&self) -> &'static str {
        match self {
            Message::Join { .. } => "JOIN",
            Message::Waiting => "WAITING",
            Message::MatchStart { .. } => "MATCH_START",
            Message::State(_) => "STATE",
            Message::OpponentState(_) => "OPPONENT_STATE",
            Message::Garbage { .. } => "GARBAGE",
            Message::Debuff { .. } => "DEBUFF",
            Message::GameOver => "GAME_OVER",
            Message::GameEnd { .. } => "GAME_END",
            Message::OpponentDisconnected => "OPPONENT_DISCONNECTED",
            Message::TimeSync { .. } => "TIME_SYNC",
        }
    }
}

const KNOWN_TYPES: [&str; 11] = [
    "JOIN",
    "WAITING",
    "MATCH_START",
    "STATE",
    "OPPONENT_STATE",
    "GARBAGE",
    "DEBUFF",
    "GAME_OVER",
    "GAME_END",
    "OPPONENT_DISCONNECTED",
    "TIME_SYNC",
];

/// Parsed incoming line.
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedMessage {
    Known(Message),
    /// Well-formed JSON with a `type` this protocol does not define.
    Unknown(String),
}

/// Parse one line.
///
/// An unrecognized `type` is not an error; a known type with bad fields, or invalid JSON, is.
pub fn parse_message(json: &str) -> Result<ParsedMessage, serde_json::Error> {
    match serde_json::from_str::<Message>(json) {
        Ok(msg) => Ok(ParsedMessage::Known(msg)),
        Err(e) => {
            #[derive(Deserialize)]
            struct TypeOnly {
                #[serde(rename = "type")]
                msg_type: Option<String>,
            }
            let msg_type = serde_json::from_str::<TypeOnly>(json)?
                .msg_type
                .unwrap_or_default();
            if KNOWN_TYPES.contains(&msg_type.as_str()) {
                return Err(e);
            }
            Ok(ParsedMessage::Unknown(msg_type))
        }
    }
}

/// Serialize to a single line without the trailing newline.
pub fn encode(msg: &Message) -> Result<String, serde_json::Error> {
    serde_json::to_string(msg)
}

pub fn create_join(player_name: &str) -> Message {
    Message::Join {
        player_name: player_name.to_string(),
    }
}

pub fn create_state(state: &PlayerState) -> Message {
    Message::State(StatePayload::from(state))
}

pub fn create_debuff(kind: DebuffKind, duration_ms: u32) -> Message {
    Message::Debuff {
        debuff: kind.as_str().to_string(),
        duration: duration_ms as f64 / 1000.0,
    }
}

pub fn create_game_end(winner: Option<Side>, reason: GameEndReason) -> Message {
    Message::GameEnd {
        winner: winner.map(|s| s.role()).unwrap_or(0),
        reason,
    }
}

/// Wire form of a queued outbound event.
pub fn outbound_message(event: &OutboundEvent) -> Message {
    match event {
        OutboundEvent::State(state) => create_state(state),
        OutboundEvent::Garbage(lines) => Message::Garbage { lines: *lines },
        OutboundEvent::Debuff { kind, duration_ms } => create_debuff(*kind, *duration_ms),
        OutboundEvent::GameOver => Message::GameOver,
    }
}

/// Translate an inbound message into something a running match reacts to.
///
/// Lobby messages and anything a client never receives map to `None`, as does a debuff
/// with an unknown name.
pub fn remote_event(msg: Message) -> Option<RemoteEvent> {
    match msg {
        Message::OpponentState(payload) => Some(RemoteEvent::OpponentState(payload.into())),
        Message::Garbage { lines } => Some(RemoteEvent::Garbage(lines)),
        Message::Debuff { debuff, duration } => {
            let Some(kind) = DebuffKind::from_str(&debuff) else {
                tracing::debug!(debuff = %debuff, "Ignored unknown debuff");
                return None;
            };
            let duration_ms = (duration.max(0.0) * 1000.0).round() as u32;
            Some(RemoteEvent::Debuff { kind, duration_ms })
        }
        Message::TimeSync { remaining } => Some(RemoteEvent::TimeSync {
            remaining_ms: remaining,
        }),
        Message::GameEnd { winner, reason } => Some(RemoteEvent::GameEnd(MatchResult {
            winner: Side::from_role(winner),
            reason: match reason {
                GameEndReason::OpponentDisconnected => EndReason::OpponentDisconnected,
                GameEndReason::OpponentToppedOut => EndReason::TopOut,
                GameEndReason::Timeout => EndReason::Timeout,
            },
        })),
        Message::OpponentDisconnected => Some(RemoteEvent::OpponentDisconnected),
        Message::Join { .. }
        | Message::Waiting
        | Message::MatchStart { .. }
        | Message::State(_)
        | Message::GameOver => None,
    }
}
