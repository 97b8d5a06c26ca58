//! WebSocket close codes shared by server and client.
//!
//! The server picks the code; the client maps it to what the player sees and
//! whether to return to the lobby.

use std::time::Duration;

/// Normal closure after the match ended.
pub const NORMAL: u16 = 1000;
/// The match no longer exists or has already ended.
pub const MATCH_GONE: u16 = 4000;
/// The player is already seated in another live match.
pub const ALREADY_IN_GAME: u16 = 4001;
/// Bad first frame, version mismatch, or other protocol violation.
pub const PROTOCOL_VIOLATION: u16 = 4002;

/// How long the client waits before returning to the lobby.
pub const LOBBY_REDIRECT_DELAY: Duration = Duration::from_secs(3);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    Normal,
    MatchGone,
    AlreadyInGame,
    ProtocolViolation,
    /// Anything else, including abnormal closure with no code.
    Other(Option<u16>),
}

impl CloseReason {
    pub fn from_code(code: Option<u16>) -> Self {
        match code {
            Some(NORMAL) => Self::Normal,
            Some(MATCH_GONE) => Self::MatchGone,
            Some(ALREADY_IN_GAME) => Self::AlreadyInGame,
            Some(PROTOCOL_VIOLATION) => Self::ProtocolViolation,
            other => Self::Other(other),
        }
    }

    pub fn code(self) -> Option<u16> {
        match self {
            Self::Normal => Some(NORMAL),
            Self::MatchGone => Some(MATCH_GONE),
            Self::AlreadyInGame => Some(ALREADY_IN_GAME),
            Self::ProtocolViolation => Some(PROTOCOL_VIOLATION),
            Self::Other(code) => code,
        }
    }

    /// Message shown to the player, `None` for a normal close.
    pub fn user_message(self) -> Option<&'static str> {
        match self {
            Self::Normal => None,
            Self::MatchGone => Some("This game no longer exists or has already ended."),
            Self::AlreadyInGame => Some("You are already playing in another game."),
            Self::ProtocolViolation | Self::Other(_) => Some("Connection to the game was lost."),
        }
    }

    pub fn redirect_delay(self) -> Option<Duration> {
        match self {
            Self::Normal => None,
            _ => Some(LOBBY_REDIRECT_DELAY),
        }
    }
}
