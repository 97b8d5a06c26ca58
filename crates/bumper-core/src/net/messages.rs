use serde::{Deserialize, Serialize};

use crate::player::{PlayerId, PlayerNumber};

/// Network message type discriminator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum MessageType {
    // Client -> Server
    MovementInput = 0x01,
    JoinMatch = 0x02,

    // Server -> Client
    InputEcho = 0x10,
    StateUpdated = 0x11,
    PlayerJoined = 0x12,
    GameStarted = 0x13,
    GameUnpaused = 0x14,
    GamePaused = 0x15,
    GameCancelled = 0x16,
    PlayerWon = 0x17,
    PlayerResigned = 0x18,
}

impl MessageType {
    pub fn from_byte(b: u8) -> Option<Self> {
        match b {
            0x01 => Some(Self::MovementInput),
            0x02 => Some(Self::JoinMatch),
            0x10 => Some(Self::InputEcho),
            0x11 => Some(Self::StateUpdated),
            0x12 => Some(Self::PlayerJoined),
            0x13 => Some(Self::GameStarted),
            0x14 => Some(Self::GameUnpaused),
            0x15 => Some(Self::GamePaused),
            0x16 => Some(Self::GameCancelled),
            0x17 => Some(Self::PlayerWon),
            0x18 => Some(Self::PlayerResigned),
            _ => None,
        }
    }

    /// Whether only the server may send this type.
    pub fn is_server_only(self) -> bool {
        (self as u8) >= 0x10
    }
}

/// Paddle movement action carried by input messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MoveAction {
    MoveLeft,
    MoveRight,
}

/// Movement input (client -> server) and its echo (server -> client).
///
/// `content` is the signed sequence number: positive for a key press,
/// negative for a release. Sequence numbers start at 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovementInputMsg {
    pub action: MoveAction,
    pub content: i32,
    pub player_id: PlayerId,
}

impl MovementInputMsg {
    pub fn new(action: MoveAction, sequence: u32, pressed: bool, player_id: PlayerId) -> Self {
        let seq = sequence.min(i32::MAX as u32) as i32;
        Self {
            action,
            content: if pressed { seq } else { -seq },
            player_id,
        }
    }

    pub fn pressed(&self) -> bool {
        self.content > 0
    }

    pub fn sequence(&self) -> u32 {
        self.content.unsigned_abs()
    }
}

/// First frame on every connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinMatchMsg {
    pub match_id: String,
    pub player_id: PlayerId,
    pub display_name: String,
    pub protocol_version: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec2Msg {
    pub x: f32,
    pub z: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BallStateMsg {
    pub x: f32,
    pub z: f32,
    pub velocity: Vec2Msg,
    pub temporal_speed: Vec2Msg,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BumperStateMsg {
    pub x: f32,
    pub score: u8,
}

/// Authoritative match state as broadcast every tick.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MatchStateMsg {
    pub ball: BallStateMsg,
    pub bumper_1: BumperStateMsg,
    pub bumper_2: BumperStateMsg,
    pub pickup: Vec2Msg,
    /// Effect id 1..=5 while active, `-id` on the tick it expired, 0 otherwise.
    pub current_buff_or_debuff: i8,
    pub last_bumper_collided: Option<PlayerNumber>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StateUpdatedMsg {
    pub tick: u32,
    pub state: MatchStateMsg,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerJoinedMsg {
    pub player_number: PlayerNumber,
    pub player_id: PlayerId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GamePausedMsg {
    /// Display name of the player who dropped.
    pub name: String,
    /// Seconds until the absent player forfeits.
    pub remaining_time: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameCancelledMsg {
    pub tournament_id: Option<u64>,
}

/// Final outcome, used by both `PlayerWon` and `PlayerResigned`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchResultMsg {
    pub winner: PlayerId,
    pub loser: PlayerId,
    pub score: [u8; 2],
}

/// Messages sent by a client.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientMessage {
    MovementInput(MovementInputMsg),
    JoinMatch(JoinMatchMsg),
}

impl ClientMessage {
    pub fn message_type(&self) -> MessageType {
        match self {
            Self::MovementInput(_) => MessageType::MovementInput,
            Self::JoinMatch(_) => MessageType::JoinMatch,
        }
    }
}

/// Messages sent by the server.
#[derive(Debug, Clone, PartialEq)]
pub enum ServerMessage {
    InputEcho(MovementInputMsg),
    StateUpdated(StateUpdatedMsg),
    PlayerJoined(PlayerJoinedMsg),
    GameStarted,
    GameUnpaused,
    GamePaused(GamePausedMsg),
    GameCancelled(GameCancelledMsg),
    PlayerWon(MatchResultMsg),
    PlayerResigned(MatchResultMsg),
}

impl ServerMessage {
    pub fn message_type(&self) -> MessageType {
        match self {
            Self::InputEcho(_) => MessageType::InputEcho,
            Self::StateUpdated(_) => MessageType::StateUpdated,
            Self::PlayerJoined(_) => MessageType::PlayerJoined,
            Self::GameStarted => MessageType::GameStarted,
            Self::GameUnpaused => MessageType::GameUnpaused,
            Self::GamePaused(_) => MessageType::GamePaused,
            Self::GameCancelled(_) => MessageType::GameCancelled,
            Self::PlayerWon(_) => MessageType::PlayerWon,
            Self::PlayerResigned(_) => MessageType::PlayerResigned,
        }
    }
}
