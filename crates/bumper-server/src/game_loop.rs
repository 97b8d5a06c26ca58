use std::time::Duration;

use bytes::Bytes;
use tokio::sync::mpsc;
use tokio::time::Instant;

use bumper_core::game_trait::MatchSimulation;
use bumper_core::net::messages::{
    GameCancelledMsg, GamePausedMsg, MatchResultMsg, MovementInputMsg, PlayerJoinedMsg,
    ServerMessage,
};
use bumper_core::net::protocol::encode_server_message;
use bumper_core::player::{Player, PlayerId, paddle_index};
use bumper_pong::BumperMatch;
use bumper_pong::config::PongConfig;

/// Commands sent from the WebSocket handlers to a match loop.
#[derive(Debug)]
pub enum MatchCommand {
    /// A player took their seat, or came back to it.
    Join { player: Player },
    Leave { player_id: PlayerId },
    Input {
        player_id: PlayerId,
        input: MovementInputMsg,
    },
    Stop,
}

/// Broadcasts sent from a match loop to the connection forwarder.
#[derive(Debug, Clone)]
pub enum MatchBroadcast {
    /// Encoded `ServerMessage` for every connected player.
    /// Uses `Bytes` for zero-copy cloning across player channels.
    All(Bytes),
    /// Encoded `ServerMessage` for one player only.
    To { player_id: PlayerId, data: Bytes },
    /// The match is over and the loop has exited.
    Ended,
}

/// Per-match settings taken from the server config.
#[derive(Debug, Clone)]
pub struct MatchSettings {
    pub tick_rate_hz: f32,
    pub pause_timeout: Duration,
    pub pong: PongConfig,
}

impl Default for MatchSettings {
    fn default() -> Self {
        Self {
            tick_rate_hz: 60.0,
            pause_timeout: Duration::from_secs(30),
            pong: PongConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Phase {
    Waiting,
    Playing,
    Paused {
        absent: usize,
        deadline: Instant,
        next_notice: Instant,
    },
}

/// Seats and connection flags, indexed by paddle.
#[derive(Default)]
struct Seats {
    players: [Option<Player>; 2],
    connected: [bool; 2],
}

impl Seats {
    fn index_of(&self, player_id: PlayerId) -> Option<usize> {
        self.players
            .iter()
            .position(|p| p.as_ref().is_some_and(|p| p.id == player_id))
    }

    fn is_full(&self) -> bool {
        self.players.iter().all(Option::is_some)
    }

    fn anyone_connected(&self) -> bool {
        self.connected.iter().any(|&c| c)
    }

    fn seated(&self) -> Vec<Player> {
        self.players.iter().flatten().cloned().collect()
    }

    fn id(&self, index: usize) -> PlayerId {
        self.players[index].as_ref().map_or(0, |p| p.id)
    }

    fn name(&self, index: usize) -> String {
        self.players[index]
            .as_ref()
            .map(|p| p.display_name.clone())
            .unwrap_or_default()
    }
}

/// Spawn a match loop as a tokio task.
/// Returns the command sender and broadcast receiver.
pub fn spawn_match(
    match_id: String,
    settings: MatchSettings,
) -> (
    mpsc::UnboundedSender<MatchCommand>,
    mpsc::UnboundedReceiver<MatchBroadcast>,
    tokio::task::JoinHandle<()>,
) {
    let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
    let (broadcast_tx, broadcast_rx) = mpsc::unbounded_channel();
    let game = BumperMatch::with_config(settings.pong.clone());
    let handle = tokio::spawn(async move {
        run_match_loop(&match_id, game, settings, cmd_rx, broadcast_tx).await;
    });
    (cmd_tx, broadcast_rx, handle)
}

fn send(tx: &mpsc::UnboundedSender<MatchBroadcast>, to: Option<PlayerId>, msg: &ServerMessage) {
    match encode_server_message(msg) {
        Ok(data) => {
            let data = Bytes::from(data);
            let broadcast = match to {
                Some(player_id) => MatchBroadcast::To { player_id, data },
                None => MatchBroadcast::All(data),
            };
            let _ = tx.send(broadcast);
        },
        Err(e) => tracing::error!(
            msg_type = ?msg.message_type(), error = %e, "Failed to encode server message"
        ),
    }
}

fn paused_msg(seats: &Seats, absent: usize, deadline: Instant) -> ServerMessage {
    let remaining = deadline.saturating_duration_since(Instant::now());
    ServerMessage::GamePaused(GamePausedMsg {
        name: seats.name(absent),
        remaining_time: remaining.as_secs_f32().ceil() as u32,
    })
}

/// The server-authoritative loop for one match.
///
/// Waits for both seats, runs the simulation at the tick rate while both
/// players are connected, and ends on a win, a forfeit after the pause
/// timeout, both players leaving, or `Stop`.
pub async fn run_match_loop(
    match_id: &str,
    mut game: BumperMatch,
    settings: MatchSettings,
    mut cmd_rx: mpsc::UnboundedReceiver<MatchCommand>,
    broadcast_tx: mpsc::UnboundedSender<MatchBroadcast>,
) {
    let tick_rate = settings.tick_rate_hz.max(1.0);
    let tick_interval = Duration::from_secs_f32(1.0 / tick_rate);
    let mut interval = tokio::time::interval(tick_interval);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    let mut seats = Seats::default();
    let mut phase = Phase::Waiting;

    loop {
        tokio::select! {
            _ = interval.tick() => {
                match phase {
                    Phase::Waiting => {},
                    Phase::Playing => {
                        game.update(1.0 / tick_rate);
                        send(&broadcast_tx, None, &ServerMessage::StateUpdated(game.snapshot()));

                        if game.is_complete() {
                            let Some(winner) = game.winner().and_then(paddle_index) else {
                                break;
                            };
                            let result = MatchResultMsg {
                                winner: seats.id(winner),
                                loser: seats.id(1 - winner),
                                score: game.scores(),
                            };
                            tracing::info!(
                                match_id, winner = result.winner, score = ?result.score,
                                "Match won"
                            );
                            send(&broadcast_tx, None, &ServerMessage::PlayerWon(result));
                            break;
                        }
                    },
                    Phase::Paused { absent, deadline, next_notice } => {
                        let now = Instant::now();
                        if now >= deadline {
                            game.forfeit(bumper_core::player::player_number(absent));
                            let result = MatchResultMsg {
                                winner: seats.id(1 - absent),
                                loser: seats.id(absent),
                                score: game.scores(),
                            };
                            tracing::info!(match_id, loser = result.loser, "Player forfeited");
                            send(&broadcast_tx, None, &ServerMessage::PlayerResigned(result));
                            break;
                        }
                        if now >= next_notice {
                            send(&broadcast_tx, None, &paused_msg(&seats, absent, deadline));
                            phase = Phase::Paused {
                                absent,
                                deadline,
                                next_notice: next_notice + Duration::from_secs(1),
                            };
                        }
                    },
                }
            }
            cmd = cmd_rx.recv() => {
                match cmd {
                    Some(MatchCommand::Join { player }) => {
                        let Some(index) = paddle_index(player.number) else {
                            tracing::warn!(match_id, number = player.number, "Join with bad seat");
                            continue;
                        };
                        let player_id = player.id;
                        let joined = ServerMessage::PlayerJoined(PlayerJoinedMsg {
                            player_number: player.number,
                            player_id,
                        });
                        let returning = seats.players[index].is_some();
                        game.player_joined(player.number);
                        seats.players[index] = Some(player);
                        seats.connected[index] = true;

                        // The newcomer hears about every seat, the others
                        // about the newcomer.
                        for seated in seats.seated() {
                            let msg = ServerMessage::PlayerJoined(PlayerJoinedMsg {
                                player_number: seated.number,
                                player_id: seated.id,
                            });
                            send(&broadcast_tx, Some(player_id), &msg);
                            if !returning && seated.id != player_id {
                                send(&broadcast_tx, Some(seated.id), &joined);
                            }
                        }

                        match phase {
                            Phase::Waiting if seats.is_full() => {
                                game.init(&seats.seated());
                                phase = Phase::Playing;
                                tracing::info!(match_id, "Match started");
                                send(&broadcast_tx, None, &ServerMessage::GameStarted);
                            },
                            Phase::Paused { absent, .. } if absent == index => {
                                game.resume();
                                phase = Phase::Playing;
                                tracing::info!(match_id, player_id, "Player returned");
                                send(&broadcast_tx, None, &ServerMessage::GameUnpaused);
                            },
                            Phase::Playing => {
                                send(&broadcast_tx, Some(player_id), &ServerMessage::GameStarted);
                            },
                            _ => {},
                        }
                    },
                    Some(MatchCommand::Leave { player_id }) => {
                        let Some(index) = seats.index_of(player_id) else {
                            continue;
                        };
                        seats.connected[index] = false;
                        game.player_left(bumper_core::player::player_number(index));
                        if !seats.anyone_connected() {
                            tracing::info!(match_id, "Everyone left, match cancelled");
                            send(
                                &broadcast_tx,
                                None,
                                &ServerMessage::GameCancelled(GameCancelledMsg {
                                    tournament_id: None,
                                }),
                            );
                            break;
                        }
                        if phase == Phase::Playing {
                            game.pause();
                            let now = Instant::now();
                            let deadline = now + settings.pause_timeout;
                            tracing::info!(match_id, player_id, "Player dropped, match paused");
                            send(&broadcast_tx, None, &paused_msg(&seats, index, deadline));
                            phase = Phase::Paused {
                                absent: index,
                                deadline,
                                next_notice: now + Duration::from_secs(1),
                            };
                        }
                    },
                    Some(MatchCommand::Input { player_id, input }) => {
                        if phase != Phase::Playing || input.player_id != player_id {
                            continue;
                        }
                        let Some(index) = seats.index_of(player_id) else {
                            continue;
                        };
                        let number = bumper_core::player::player_number(index);
                        if let Some(echo) = game.apply_input(number, &input) {
                            send(&broadcast_tx, Some(player_id), &ServerMessage::InputEcho(echo));
                        }
                    },
                    Some(MatchCommand::Stop) | None => {
                        break;
                    },
                }
            }
        }
    }

    let _ = broadcast_tx.send(MatchBroadcast::Ended);
}
