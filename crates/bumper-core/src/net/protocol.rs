use serde::{Deserialize, Serialize};

use super::messages::{
    ClientMessage, GameCancelledMsg, GamePausedMsg, JoinMatchMsg, MatchResultMsg, MessageType,
    MovementInputMsg, PlayerJoinedMsg, ServerMessage, StateUpdatedMsg,
};

/// Current protocol version.
pub const PROTOCOL_VERSION: u8 = 1;

/// Default authoritative tick rate in Hz.
pub const DEFAULT_TICK_RATE_HZ: u32 = 60;

/// Maximum message payload size in bytes.
pub const MAX_MESSAGE_SIZE: usize = 64 * 1024; // 64 KiB

#[derive(Debug)]
pub enum ProtocolError {
    EmptyMessage,
    UnknownMessageType(u8),
    UnexpectedMessageType(MessageType),
    PayloadTooLarge(usize),
    SerializeError(String),
    DeserializeError(String),
}

impl std::fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyMessage => write!(f, "empty message"),
            Self::UnknownMessageType(b) => write!(f, "unknown message type: 0x{b:02x}"),
            Self::UnexpectedMessageType(t) => {
                write!(f, "message type {t:?} not valid in this direction")
            },
            Self::PayloadTooLarge(size) => {
                write!(
                    f,
                    "payload too large: {size} bytes (max {MAX_MESSAGE_SIZE})"
                )
            },
            Self::SerializeError(e) => write!(f, "serialize error: {e}"),
            Self::DeserializeError(e) => write!(f, "deserialize error: {e}"),
        }
    }
}

impl std::error::Error for ProtocolError {}

/// Encode a serializable payload with a 1-byte type prefix.
pub fn encode_message<T: Serialize>(
    msg_type: MessageType,
    payload: &T,
) -> Result<Vec<u8>, ProtocolError> {
    let payload_bytes =
        rmp_serde::to_vec(payload).map_err(|e| ProtocolError::SerializeError(e.to_string()))?;
    let total = 1 + payload_bytes.len();
    if total > MAX_MESSAGE_SIZE {
        return Err(ProtocolError::PayloadTooLarge(total));
    }
    let mut buf = Vec::with_capacity(total);
    buf.push(msg_type as u8);
    buf.extend_from_slice(&payload_bytes);
    Ok(buf)
}

/// Encode a `ClientMessage` to wire format.
pub fn encode_client_message(msg: &ClientMessage) -> Result<Vec<u8>, ProtocolError> {
    match msg {
        ClientMessage::MovementInput(m) => encode_message(MessageType::MovementInput, m),
        ClientMessage::JoinMatch(m) => encode_message(MessageType::JoinMatch, m),
    }
}

/// Encode a `ServerMessage` to wire format.
///
/// Payload-less messages carry a MessagePack nil so every frame has a body.
pub fn encode_server_message(msg: &ServerMessage) -> Result<Vec<u8>, ProtocolError> {
    let msg_type = msg.message_type();
    match msg {
        ServerMessage::InputEcho(m) => encode_message(msg_type, m),
        ServerMessage::StateUpdated(m) => encode_message(msg_type, m),
        ServerMessage::PlayerJoined(m) => encode_message(msg_type, m),
        ServerMessage::GameStarted | ServerMessage::GameUnpaused => encode_message(msg_type, &()),
        ServerMessage::GamePaused(m) => encode_message(msg_type, m),
        ServerMessage::GameCancelled(m) => encode_message(msg_type, m),
        ServerMessage::PlayerWon(m) | ServerMessage::PlayerResigned(m) => {
            encode_message(msg_type, m)
        },
    }
}

/// Extract the message type byte from raw wire data.
pub fn decode_message_type(data: &[u8]) -> Result<MessageType, ProtocolError> {
    let Some(&first) = data.first() else {
        return Err(ProtocolError::EmptyMessage);
    };
    MessageType::from_byte(first).ok_or(ProtocolError::UnknownMessageType(first))
}

/// Decode a MessagePack payload (bytes after the type prefix).
pub fn decode_payload<T: for<'de> Deserialize<'de>>(data: &[u8]) -> Result<T, ProtocolError> {
    if data.is_empty() {
        return Err(ProtocolError::EmptyMessage);
    }
    rmp_serde::from_slice(&data[1..]).map_err(|e| ProtocolError::DeserializeError(e.to_string()))
}

/// Decode raw wire data into a `ClientMessage`.
///
/// Frames above `MAX_MESSAGE_SIZE` are refused before any payload parsing.
/// Every rejection is logged at debug level with the offending type byte.
pub fn decode_client_message(data: &[u8]) -> Result<ClientMessage, ProtocolError> {
    decode_client_frame(data).inspect_err(|e| {
        tracing::debug!(
            len = data.len(),
            type_byte = data.first().copied(),
            error = %e,
            "Rejected client frame"
        );
    })
}

fn decode_client_frame(data: &[u8]) -> Result<ClientMessage, ProtocolError> {
    if data.len() > MAX_MESSAGE_SIZE {
        return Err(ProtocolError::PayloadTooLarge(data.len()));
    }
    let msg_type = decode_message_type(data)?;
    match msg_type {
        MessageType::MovementInput => Ok(ClientMessage::MovementInput(decode_payload::<
            MovementInputMsg,
        >(data)?)),
        MessageType::JoinMatch => Ok(ClientMessage::JoinMatch(decode_payload::<JoinMatchMsg>(
            data,
        )?)),
        other => Err(ProtocolError::UnexpectedMessageType(other)),
    }
}

/// Decode raw wire data into a `ServerMessage`.
pub fn decode_server_message(data: &[u8]) -> Result<ServerMessage, ProtocolError> {
    let msg_type = decode_message_type(data)?;
    match msg_type {
        MessageType::InputEcho => Ok(ServerMessage::InputEcho(decode_payload::<
            MovementInputMsg,
        >(data)?)),
        MessageType::StateUpdated => Ok(ServerMessage::StateUpdated(decode_payload::<
            StateUpdatedMsg,
        >(data)?)),
        MessageType::PlayerJoined => Ok(ServerMessage::PlayerJoined(decode_payload::<
            PlayerJoinedMsg,
        >(data)?)),
        MessageType::GameStarted => Ok(ServerMessage::GameStarted),
        MessageType::GameUnpaused => Ok(ServerMessage::GameUnpaused),
        MessageType::GamePaused => Ok(ServerMessage::GamePaused(decode_payload::<
            GamePausedMsg,
        >(data)?)),
        MessageType::GameCancelled => Ok(ServerMessage::GameCancelled(decode_payload::<
            GameCancelledMsg,
        >(data)?)),
        MessageType::PlayerWon => Ok(ServerMessage::PlayerWon(decode_payload::<
            MatchResultMsg,
        >(data)?)),
        MessageType::PlayerResigned => Ok(ServerMessage::PlayerResigned(decode_payload::<
            MatchResultMsg,
        >(data)?)),
        other => Err(ProtocolError::UnexpectedMessageType(other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::net::messages::{
        BallStateMsg, BumperStateMsg, MatchStateMsg, MoveAction, Vec2Msg,
    };

    fn sample_state() -> StateUpdatedMsg {
        StateUpdatedMsg {
            tick: 412,
            state: MatchStateMsg {
                ball: BallStateMsg {
                    x: 1.5,
                    z: -3.25,
                    velocity: Vec2Msg { x: 0.08, z: -0.2 },
                    temporal_speed: Vec2Msg { x: 1.1, z: 1.0 },
                },
                bumper_1: BumperStateMsg { x: -2.0, score: 3 },
                bumper_2: BumperStateMsg { x: 4.0, score: 1 },
                pickup: Vec2Msg { x: 0.5, z: 0.0 },
                current_buff_or_debuff: -4,
                last_bumper_collided: Some(2),
            },
        }
    }

    #[test]
    fn roundtrip_movement_input() {
        let msg = ClientMessage::MovementInput(MovementInputMsg::new(
            MoveAction::MoveRight,
            12,
            false,
            77,
        ));
        let encoded = encode_client_message(&msg).unwrap();
        assert_eq!(encoded[0], 0x01);
        let decoded = decode_client_message(&encoded).unwrap();
        assert_eq!(msg, decoded);
    }

    #[test]
    fn roundtrip_join_match() {
        let msg = ClientMessage::JoinMatch(JoinMatchMsg {
            match_id: "m-42".to_string(),
            player_id: 7,
            display_name: "Alice".to_string(),
            protocol_version: PROTOCOL_VERSION,
        });
        let encoded = encode_client_message(&msg).unwrap();
        let decoded = decode_client_message(&encoded).unwrap();
        assert_eq!(msg, decoded);
    }

    #[test]
    fn roundtrip_state_updated() {
        let msg = ServerMessage::StateUpdated(sample_state());
        let encoded = encode_server_message(&msg).unwrap();
        assert_eq!(encoded[0], 0x11);
        let decoded = decode_server_message(&encoded).unwrap();
        assert_eq!(msg, decoded);
    }

    #[test]
    fn payloadless_messages_roundtrip() {
        for msg in [ServerMessage::GameStarted, ServerMessage::GameUnpaused] {
            let encoded = encode_server_message(&msg).unwrap();
            assert_eq!(encoded.len(), 2, "type byte plus nil");
            assert_eq!(decode_server_message(&encoded).unwrap(), msg);
        }
    }

    #[test]
    fn won_and_resigned_share_payload_but_not_type() {
        let result = MatchResultMsg {
            winner: 1,
            loser: 2,
            score: [5, 3],
        };
        let won = encode_server_message(&ServerMessage::PlayerWon(result)).unwrap();
        let resigned = encode_server_message(&ServerMessage::PlayerResigned(result)).unwrap();
        assert_eq!(won[1..], resigned[1..]);
        assert_ne!(won[0], resigned[0]);
        assert_eq!(
            decode_server_message(&resigned).unwrap(),
            ServerMessage::PlayerResigned(result)
        );
    }

    #[test]
    fn empty_message_error() {
        assert!(matches!(
            decode_message_type(&[]),
            Err(ProtocolError::EmptyMessage)
        ));
    }

    #[test]
    fn unknown_type_byte_error() {
        assert!(matches!(
            decode_message_type(&[0xFF]),
            Err(ProtocolError::UnknownMessageType(0xFF))
        ));
    }

    #[test]
    fn server_type_rejected_by_client_decoder() {
        let encoded = encode_server_message(&ServerMessage::GameStarted).unwrap();
        assert!(matches!(
            decode_client_message(&encoded),
            Err(ProtocolError::UnexpectedMessageType(MessageType::GameStarted))
        ));
    }

    #[test]
    fn oversized_client_frame_rejected_before_parsing() {
        let mut frame = encode_client_message(&ClientMessage::MovementInput(
            MovementInputMsg::new(MoveAction::MoveLeft, 1, true, 1),
        ))
        .unwrap();
        frame.resize(MAX_MESSAGE_SIZE + 1, 0);
        assert!(matches!(
            decode_client_message(&frame),
            Err(ProtocolError::PayloadTooLarge(n)) if n == MAX_MESSAGE_SIZE + 1
        ));
        assert!(matches!(
            decode_client_message(&[]),
            Err(ProtocolError::EmptyMessage)
        ));
    }

    #[test]
    fn truncated_payload_is_deserialize_error() {
        let encoded = encode_server_message(&ServerMessage::StateUpdated(sample_state())).unwrap();
        let truncated = &encoded[..encoded.len() / 2];
        assert!(matches!(
            decode_server_message(truncated),
            Err(ProtocolError::DeserializeError(_))
        ));
    }

    #[test]
    fn oversized_payload_rejected() {
        let big = vec![0u8; MAX_MESSAGE_SIZE];
        assert!(matches!(
            encode_message(MessageType::StateUpdated, &big),
            Err(ProtocolError::PayloadTooLarge(_))
        ));
    }
}
