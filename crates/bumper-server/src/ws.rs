use std::sync::Arc;
use std::sync::atomic::Ordering;

use axum::extract::FromRequest;
use axum::extract::ws::{CloseFrame, Message, Utf8Bytes, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;

use bumper_core::net::close_codes;
use bumper_core::net::messages::{ClientMessage, JoinMatchMsg};
use bumper_core::net::protocol::{
    MAX_MESSAGE_SIZE, PROTOCOL_VERSION, ProtocolError, decode_client_message,
};
use bumper_core::player::PlayerId;

use crate::game_loop::MatchCommand;
use crate::match_manager::Outbound;
use crate::state::{AppState, ConnectionGuard};

const MAX_DISPLAY_NAME_LEN: usize = 32;
const MAX_MATCH_ID_LEN: usize = 64;

pub async fn ws_handler(
    State(state): State<AppState>,
    request: axum::extract::Request,
) -> Result<axum::response::Response, StatusCode> {
    let max_ws = state.config.limits.max_ws_connections;
    let current = state.ws_connection_count.load(Ordering::Relaxed);
    if current >= max_ws {
        tracing::warn!(current, max = max_ws, "WS connection limit reached");
        return Err(StatusCode::SERVICE_UNAVAILABLE);
    }

    let ws = WebSocketUpgrade::from_request(request, &state)
        .await
        .map_err(|_| StatusCode::BAD_REQUEST)?;

    Ok(ws
        .max_message_size(MAX_MESSAGE_SIZE)
        .on_upgrade(move |socket| handle_socket(socket, state))
        .into_response())
}

async fn close_with(
    ws_sender: &mut SplitSink<WebSocket, Message>,
    code: u16,
    reason: &'static str,
) {
    let frame = CloseFrame {
        code,
        reason: Utf8Bytes::from_static(reason),
    };
    if let Err(e) = ws_sender.send(Message::Close(Some(frame))).await {
        tracing::debug!(code, error = %e, "Failed to send close frame");
    }
}

/// Checks on the first frame that need no shared state.
fn validate_join(join: &JoinMatchMsg) -> Result<(), &'static str> {
    if join.protocol_version != PROTOCOL_VERSION {
        return Err("protocol version mismatch");
    }
    if join.match_id.is_empty()
        || join.match_id.len() > MAX_MATCH_ID_LEN
        || join.match_id.chars().any(|c| c.is_control())
    {
        return Err("invalid match id");
    }
    let name = join.display_name.trim();
    if name.is_empty()
        || name.len() > MAX_DISPLAY_NAME_LEN
        || name.chars().any(|c| c.is_control())
    {
        return Err("invalid display name");
    }
    Ok(())
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let _guard = ConnectionGuard::new(Arc::clone(&state.ws_connection_count));
    let (mut ws_sender, mut ws_receiver) = socket.split();

    // The first message must be a JoinMatch.
    let join = match ws_receiver.next().await {
        Some(Ok(Message::Binary(data))) => match decode_client_message(&data) {
            Ok(ClientMessage::JoinMatch(join)) => join,
            Ok(other) => {
                tracing::debug!(
                    msg_type = ?other.message_type(),
                    "First frame was not a join"
                );
                close_with(&mut ws_sender, close_codes::PROTOCOL_VIOLATION, "expected join").await;
                return;
            },
            Err(e) => {
                tracing::debug!(error = %e, "Undecodable first frame");
                close_with(&mut ws_sender, close_codes::PROTOCOL_VIOLATION, "bad frame").await;
                return;
            },
        },
        Some(Ok(Message::Close(_))) | None => return,
        _ => {
            close_with(&mut ws_sender, close_codes::PROTOCOL_VIOLATION, "expected binary").await;
            return;
        },
    };

    if let Err(reason) = validate_join(&join) {
        tracing::info!(
            player_id = join.player_id,
            version = join.protocol_version,
            reason,
            "Rejected join"
        );
        close_with(&mut ws_sender, close_codes::PROTOCOL_VIOLATION, reason).await;
        return;
    }

    let (tx, rx) = mpsc::channel::<Outbound>(state.config.limits.player_message_buffer);
    let accepted = {
        let mut matches = state.matches.write().await;
        matches.join(
            &join.match_id,
            join.player_id,
            join.display_name.trim(),
            tx,
            &state.matches,
        )
    };
    let accepted = match accepted {
        Ok(accepted) => accepted,
        Err(e) => {
            tracing::info!(
                player_id = join.player_id,
                match_id = %join.match_id,
                error = %e,
                "Join refused"
            );
            close_with(&mut ws_sender, e.close_code(), "").await;
            return;
        },
    };
    tracing::info!(
        player_id = join.player_id,
        match_id = %join.match_id,
        player_number = accepted.number,
        rejoin = accepted.rejoin,
        "Player joined match"
    );

    spawn_writer(ws_sender, rx);

    read_loop(&mut ws_receiver, &state, &accepted.commands, join.player_id).await;

    state
        .matches
        .write()
        .await
        .leave(&join.match_id, join.player_id);
    tracing::info!(
        player_id = join.player_id,
        match_id = %join.match_id,
        "Player disconnected"
    );
}

fn spawn_writer(mut ws_sender: SplitSink<WebSocket, Message>, mut rx: mpsc::Receiver<Outbound>) {
    tokio::spawn(async move {
        while let Some(out) = rx.recv().await {
            match out {
                Outbound::Frame(data) => {
                    if ws_sender.send(Message::Binary(data)).await.is_err() {
                        break;
                    }
                },
                Outbound::Close(code) => {
                    close_with(&mut ws_sender, code, "").await;
                    break;
                },
            }
        }
    });
}

/// Per-connection rate limiter (token bucket).
struct RateLimiter {
    tokens: f64,
    last_refill: tokio::time::Instant,
    max_tokens: f64,
    refill_rate: f64, // tokens per second
}

impl RateLimiter {
    fn new(max_tokens: f64, refill_rate: f64) -> Self {
        Self {
            tokens: max_tokens,
            last_refill: tokio::time::Instant::now(),
            max_tokens,
            refill_rate,
        }
    }

    /// Returns true if the message is allowed; false if rate-limited.
    fn allow(&mut self) -> bool {
        let now = tokio::time::Instant::now();
        let elapsed = now.duration_since(self.last_refill).as_secs_f64();
        self.tokens = (self.tokens + elapsed * self.refill_rate).min(self.max_tokens);
        self.last_refill = now;

        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }
}

async fn read_loop(
    ws_receiver: &mut SplitStream<WebSocket>,
    state: &AppState,
    commands: &mpsc::UnboundedSender<MatchCommand>,
    player_id: PlayerId,
) {
    let rate = state.config.limits.ws_rate_limit_per_sec;
    let mut rate_limiter = RateLimiter::new(rate, rate);

    while let Some(Ok(msg)) = ws_receiver.next().await {
        let data = match msg {
            Message::Binary(d) => d,
            Message::Close(_) => break,
            _ => continue,
        };

        if !rate_limiter.allow() {
            tracing::warn!(player_id, "Rate limited");
            continue;
        }
        match decode_client_message(&data) {
            Ok(ClientMessage::MovementInput(input)) => {
                // Reject spoofed inputs
                if input.player_id != player_id {
                    tracing::warn!(
                        player_id,
                        claimed = input.player_id,
                        "Rejected input for another player"
                    );
                    continue;
                }
                if commands
                    .send(MatchCommand::Input { player_id, input })
                    .is_err()
                {
                    break;
                }
            },
            Ok(ClientMessage::JoinMatch(_)) => {
                tracing::debug!(player_id, "Ignoring repeated join");
            },
            Err(ProtocolError::UnexpectedMessageType(t)) => {
                tracing::warn!(player_id, msg_type = ?t, "Client sent server-only message type");
            },
            Err(e) => {
                tracing::debug!(player_id, error = %e, "Dropping undecodable frame");
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn join() -> JoinMatchMsg {
        JoinMatchMsg {
            match_id: "m-1".to_string(),
            player_id: 1,
            display_name: "ann".to_string(),
            protocol_version: PROTOCOL_VERSION,
        }
    }

    #[test]
    fn well_formed_join_passes() {
        assert_eq!(validate_join(&join()), Ok(()));
    }

    #[test]
    fn version_mismatch_is_rejected() {
        let j = JoinMatchMsg {
            protocol_version: PROTOCOL_VERSION + 1,
            ..join()
        };
        assert!(validate_join(&j).is_err());
    }

    #[test]
    fn bad_names_and_ids_are_rejected() {
        for name in ["", "   ", "a\u{7}b", &"x".repeat(33)] {
            let j = JoinMatchMsg {
                display_name: name.to_string(),
                ..join()
            };
            assert!(validate_join(&j).is_err(), "{name:?}");
        }
        let j = JoinMatchMsg {
            match_id: String::new(),
            ..join()
        };
        assert!(validate_join(&j).is_err());
    }

    #[tokio::test]
    async fn rate_limiter_drains_then_refuses() {
        let mut limiter = RateLimiter::new(3.0, 0.0);
        assert!(limiter.allow());
        assert!(limiter.allow());
        assert!(limiter.allow());
        assert!(!limiter.allow());
    }
}
