//! Client side of a bumper match: input prediction and reconciliation,
//! opponent interpolation, ball extrapolation, and the local bot game.

pub mod config;
pub mod extrapolation;
pub mod interpolation;
pub mod local_game;
pub mod net_client;
pub mod reconcile;
pub mod session;

use std::fmt;

use bumper_core::net::protocol::ProtocolError;

#[derive(Debug)]
pub enum ClientError {
    /// The connection closed with this code.
    Closed(Option<u16>),
    Protocol(ProtocolError),
}

impl fmt::Display for ClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Closed(Some(code)) => write!(f, "connection closed with code {code}"),
            Self::Closed(None) => write!(f, "connection closed"),
            Self::Protocol(e) => write!(f, "protocol error: {e}"),
        }
    }
}

impl std::error::Error for ClientError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Protocol(e) => Some(e),
            Self::Closed(_) => None,
        }
    }
}

impl From<ProtocolError> for ClientError {
    fn from(e: ProtocolError) -> Self {
        Self::Protocol(e)
    }
}
