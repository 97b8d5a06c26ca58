use std::time::Duration;

use bumper_core::net::close_codes::CloseReason;
use bumper_core::net::messages::{
    ClientMessage, GamePausedMsg, JoinMatchMsg, MatchResultMsg, MoveAction, ServerMessage,
    StateUpdatedMsg,
};
use bumper_core::net::protocol::{PROTOCOL_VERSION, decode_server_message};
use bumper_core::player::{PlayerId, PlayerNumber, paddle_index};
use bumper_pong::clock::SimulationClock;
use bumper_pong::config::PongConfig;
use bumper_pong::effects::Effect;
use bumper_pong::{MatchState, arena, physics};

use crate::ClientError;
use crate::config::SyncConfig;
use crate::extrapolation::BallExtrapolator;
use crate::interpolation::RemoteInterpolator;
use crate::net_client::NetClient;
use crate::reconcile::InputReconciler;

/// What the player is told when the connection ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CloseOutcome {
    pub reason: CloseReason,
    pub message: Option<&'static str>,
    /// Return to the lobby after this long. `None` stays put.
    pub redirect_after: Option<Duration>,
}

impl CloseOutcome {
    pub fn from_code(code: Option<u16>) -> Self {
        let reason = CloseReason::from_code(code);
        Self {
            reason,
            message: reason.user_message(),
            redirect_after: reason.redirect_delay(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SessionPhase {
    /// Joined, waiting for the opponent or the start signal.
    Waiting,
    Playing,
    Paused { name: String, remaining_secs: u32 },
    Finished { result: MatchResultMsg, resigned: bool },
    Cancelled { tournament_id: Option<u64> },
    Disconnected(CloseOutcome),
}

impl SessionPhase {
    /// No further match messages change a terminal phase.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Finished { .. } | Self::Cancelled { .. } | Self::Disconnected(_)
        )
    }
}

/// Positions to draw this frame.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderView {
    pub paddles: [f32; 2],
    pub half_lengths: [f32; 2],
    pub ball: (f32, f32),
    pub pickup: (f32, f32),
    pub scores: [u8; 2],
    pub effect: Option<(Effect, usize)>,
}

/// One player's view of a networked match.
///
/// The local paddle is predicted from the reconciler's keys, the opponent
/// is interpolated, and the ball is extrapolated from the last snapshot.
pub struct ClientSession {
    player_id: PlayerId,
    local_index: Option<usize>,
    state: MatchState,
    pong_config: PongConfig,
    reconciler: InputReconciler,
    interpolator: RemoteInterpolator,
    extrapolator: BallExtrapolator,
    clock: SimulationClock,
    phase: SessionPhase,
    last_tick: Option<u32>,
}

impl ClientSession {
    /// Session tuned from `PongConfig::load` and `SyncConfig::load`.
    pub fn with_loaded_config(player_id: PlayerId) -> Self {
        Self::new(player_id, PongConfig::load(), &SyncConfig::load())
    }

    pub fn new(player_id: PlayerId, pong_config: PongConfig, sync: &SyncConfig) -> Self {
        Self {
            player_id,
            local_index: None,
            state: MatchState::new(&pong_config),
            reconciler: InputReconciler::new(player_id, sync),
            interpolator: RemoteInterpolator::new(
                sync.interpolation_capacity,
                sync.interpolation_delay_ms,
            ),
            extrapolator: BallExtrapolator::new(sync.extrapolation_horizon_ms),
            clock: SimulationClock::new(),
            phase: SessionPhase::Waiting,
            last_tick: None,
            pong_config,
        }
    }

    /// First frame to send on a fresh connection.
    pub fn join_message(&self, match_id: &str, display_name: &str) -> ClientMessage {
        ClientMessage::JoinMatch(JoinMatchMsg {
            match_id: match_id.to_string(),
            player_id: self.player_id,
            display_name: display_name.to_string(),
            protocol_version: PROTOCOL_VERSION,
        })
    }

    pub fn phase(&self) -> &SessionPhase {
        &self.phase
    }

    pub fn state(&self) -> &MatchState {
        &self.state
    }

    pub fn local_index(&self) -> Option<usize> {
        self.local_index
    }

    pub fn local_number(&self) -> Option<PlayerNumber> {
        self.local_index.map(bumper_core::player::player_number)
    }

    pub fn reconciler(&self) -> &InputReconciler {
        &self.reconciler
    }

    pub fn last_tick(&self) -> Option<u32> {
        self.last_tick
    }

    /// A local key change. Returns the message to send, or `None` when the
    /// player has no seat or the match is not running.
    pub fn press(
        &mut self,
        action: MoveAction,
        pressed: bool,
        now_ms: f64,
    ) -> Option<ClientMessage> {
        if self.local_index.is_none() || self.phase != SessionPhase::Playing {
            return None;
        }
        let msg = self.reconciler.submit(action, pressed, now_ms);
        Some(ClientMessage::MovementInput(msg))
    }

    pub fn handle_frame(&mut self, data: &[u8], now_ms: f64) -> Result<(), ClientError> {
        let msg = decode_server_message(data)?;
        self.handle_message(msg, now_ms);
        Ok(())
    }

    pub fn handle_message(&mut self, msg: ServerMessage, now_ms: f64) {
        match msg {
            ServerMessage::InputEcho(echo) => {
                if echo.player_id == self.player_id {
                    self.reconciler.on_echo(echo.action, echo.content);
                }
            },
            ServerMessage::StateUpdated(update) => {
                self.apply_snapshot(&update, now_ms);
            },
            ServerMessage::PlayerJoined(joined) => {
                if joined.player_id == self.player_id {
                    // Buffered samples belong to the previous seat's opponent.
                    self.interpolator.clear();
                    self.local_index = paddle_index(joined.player_number);
                    tracing::debug!(player_number = joined.player_number, "Seated");
                }
            },
            ServerMessage::GameStarted | ServerMessage::GameUnpaused => {
                self.set_phase(SessionPhase::Playing);
            },
            ServerMessage::GamePaused(GamePausedMsg {
                name,
                remaining_time,
            }) => {
                self.set_phase(SessionPhase::Paused {
                    name,
                    remaining_secs: remaining_time,
                });
            },
            ServerMessage::GameCancelled(cancelled) => {
                self.set_phase(SessionPhase::Cancelled {
                    tournament_id: cancelled.tournament_id,
                });
            },
            ServerMessage::PlayerWon(result) => {
                self.set_phase(SessionPhase::Finished {
                    result,
                    resigned: false,
                });
            },
            ServerMessage::PlayerResigned(result) => {
                self.set_phase(SessionPhase::Finished {
                    result,
                    resigned: true,
                });
            },
        }
    }

    fn set_phase(&mut self, phase: SessionPhase) {
        if self.phase.is_terminal() {
            return;
        }
        tracing::debug!(from = ?self.phase, to = ?phase, "Session phase");
        self.phase = phase;
    }

    /// Take an authoritative snapshot. Older or repeated ticks are ignored.
    /// Returns whether it was applied.
    pub fn apply_snapshot(&mut self, update: &StateUpdatedMsg, now_ms: f64) -> bool {
        if let Some(last) = self.last_tick
            && update.tick <= last
        {
            return false;
        }
        self.last_tick = Some(update.tick);

        let predicted_x = self.local_index.map(|i| self.state.paddles[i].x);
        self.state.apply_msg(&update.state, &self.pong_config);
        self.state.tick = update.tick;
        self.extrapolator.update(self.state.ball.clone(), now_ms);

        if let Some(local) = self.local_index {
            let paddle = &mut self.state.paddles[local];
            self.reconciler.set_authoritative_x(paddle.x);
            if let Some(x) = predicted_x {
                paddle.x = x;
                arena::clamp_paddle_x(paddle, &self.pong_config);
            }
            let opponent = 1 - local;
            self.interpolator
                .push(self.state.paddles[opponent].x, now_ms);
        }
        true
    }

    /// Called once per render frame: advance the local prediction, blend in
    /// corrections and return what to draw.
    pub fn frame(&mut self, dt_secs: f32, now_ms: f64) -> RenderView {
        let frames = self.clock.advance(dt_secs);
        if let Some(local) = self.local_index
            && self.phase == SessionPhase::Playing
        {
            let paddle = &mut self.state.paddles[local];
            paddle.intent = self.reconciler.intent();
            for _ in 0..frames {
                physics::move_paddle(paddle, 1.0, &self.pong_config);
            }
            if self.reconciler.soft_reconcile(&mut paddle.x, now_ms) {
                arena::clamp_paddle_x(paddle, &self.pong_config);
            }
        }
        self.reconciler.prune(now_ms);
        self.view(now_ms)
    }

    pub fn view(&self, now_ms: f64) -> RenderView {
        let mut paddles = [self.state.paddles[0].x, self.state.paddles[1].x];
        if let Some(local) = self.local_index
            && let Some(x) = self.interpolator.sample(now_ms)
        {
            paddles[1 - local] = x;
        }
        let ball = self
            .extrapolator
            .position(now_ms, &self.pong_config)
            .unwrap_or((self.state.ball.x, self.state.ball.z));
        RenderView {
            paddles,
            half_lengths: [
                self.state.paddles[0].half_length,
                self.state.paddles[1].half_length,
            ],
            ball,
            pickup: (self.state.pickup.x, self.state.pickup.z),
            scores: self.state.scores(),
            effect: self.state.effect.current(),
        }
    }

    /// The socket closed. A normal close after the result keeps the result
    /// on screen; anything else becomes `Disconnected`.
    pub fn handle_close(&mut self, code: Option<u16>) -> CloseOutcome {
        let outcome = CloseOutcome::from_code(code);
        let keep = outcome.reason == CloseReason::Normal && self.phase.is_terminal();
        if !keep && !matches!(self.phase, SessionPhase::Disconnected(_)) {
            tracing::debug!(?code, "Match connection lost");
            self.phase = SessionPhase::Disconnected(outcome);
        }
        outcome
    }

    /// Drain the connection, apply what arrived, and render. Incoming
    /// messages are consumed at the start of the frame.
    pub fn poll(&mut self, net: &NetClient, dt_secs: f32, now_ms: f64) -> RenderView {
        for msg in net.drain_decoded() {
            self.handle_message(msg, now_ms);
        }
        if let Some(code) = net.close_code() {
            self.handle_close(code);
        }
        self.frame(dt_secs, now_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bumper_core::game_trait::FRAME_SECS;
    use bumper_core::net::messages::{MovementInputMsg, PlayerJoinedMsg};
    use bumper_core::net::protocol::encode_server_message;

    fn session() -> ClientSession {
        let mut s = ClientSession::new(42, PongConfig::default(), &SyncConfig::default());
        s.handle_message(
            ServerMessage::PlayerJoined(PlayerJoinedMsg {
                player_number: 1,
                player_id: 42,
            }),
            0.0,
        );
        s.handle_message(ServerMessage::GameStarted, 0.0);
        s
    }

    fn snapshot(tick: u32, indicator: i8) -> StateUpdatedMsg {
        let config = PongConfig::default();
        let mut state = MatchState::new(&config);
        state.ball.x = 1.0;
        state.ball.z = 2.0;
        state.paddles[1].x = 3.0;
        state.paddles[0].score = 2;
        state.effect_indicator = indicator;
        state.last_bumper_collided = Some(0);
        StateUpdatedMsg {
            tick,
            state: state.to_msg(),
        }
    }

    #[test]
    fn seat_comes_from_player_joined() {
        let s = session();
        assert_eq!(s.local_index(), Some(0));
        assert_eq!(s.local_number(), Some(1));
        assert_eq!(*s.phase(), SessionPhase::Playing);
    }

    #[test]
    fn other_players_join_does_not_seat_us() {
        let mut s = ClientSession::new(42, PongConfig::default(), &SyncConfig::default());
        s.handle_message(
            ServerMessage::PlayerJoined(PlayerJoinedMsg {
                player_number: 2,
                player_id: 7,
            }),
            0.0,
        );
        assert_eq!(s.local_index(), None);
        assert_eq!(s.press(MoveAction::MoveLeft, true, 0.0), None);
    }

    #[test]
    fn applying_same_snapshot_twice_changes_nothing() {
        let mut s = session();
        let update = snapshot(10, 2);
        assert!(s.apply_snapshot(&update, 100.0));
        let after_first = s.state().clone();
        assert_eq!(after_first.paddles[1].half_length, 1.25);

        assert!(!s.apply_snapshot(&update, 100.0));
        assert_eq!(*s.state(), after_first);
    }

    #[test]
    fn older_snapshot_is_ignored() {
        let mut s = session();
        s.apply_snapshot(&snapshot(10, 0), 0.0);
        let mut old = snapshot(9, 0);
        old.state.ball.x = -5.0;
        assert!(!s.apply_snapshot(&old, 10.0));
        assert_eq!(s.state().ball.x, 1.0);
        assert_eq!(s.last_tick(), Some(10));
    }

    #[test]
    fn effect_transitions_follow_indicator() {
        let mut s = session();
        s.apply_snapshot(&snapshot(1, 3), 0.0);
        assert!(s.state().paddles[1].control_reverse);
        s.apply_snapshot(&snapshot(2, 3), 16.0);
        s.apply_snapshot(&snapshot(3, -3), 33.0);
        assert!(!s.state().paddles[1].control_reverse);
        assert_eq!(s.view(33.0).effect, None);
    }

    #[test]
    fn local_paddle_is_predicted_not_snapped() {
        let mut s = session();
        let msg = s.press(MoveAction::MoveRight, true, 0.0).unwrap();
        assert!(matches!(msg, ClientMessage::MovementInput(m) if m.content == 1));

        let mut now = 0.0;
        for _ in 0..4 {
            now += 1000.0 / 60.0;
            s.frame(FRAME_SECS, now);
        }
        let predicted = s.state().paddles[0].x;
        assert!((predicted - 1.0).abs() < 1e-4, "moved {predicted}");

        // Server has not seen the press yet; its x is still 0.
        s.apply_snapshot(&snapshot(1, 0), now);
        assert_eq!(s.state().paddles[0].x, predicted);
        assert_eq!(s.reconciler().authoritative_x(), Some(0.0));
    }

    #[test]
    fn soft_correction_pulls_toward_authority() {
        let mut s = session();
        s.apply_snapshot(&snapshot(1, 0), 0.0);
        s.state.paddles[0].x = 2.0;
        s.frame(FRAME_SECS, 200.0);
        let x = s.state().paddles[0].x;
        assert!((x - 1.4).abs() < 1e-4, "x = {x}");
    }

    #[test]
    fn echo_from_server_confirms_input() {
        let mut s = session();
        s.press(MoveAction::MoveLeft, true, 0.0);
        s.press(MoveAction::MoveLeft, false, 10.0);
        let echo = MovementInputMsg::new(MoveAction::MoveLeft, 1, true, 42);
        let frame = encode_server_message(&ServerMessage::InputEcho(echo)).unwrap();
        s.handle_frame(&frame, 20.0).unwrap();
        assert_eq!(s.reconciler().pending_sequences(), vec![2]);
        assert!(!s.reconciler().intent().moves_left);
    }

    #[test]
    fn opponent_is_drawn_from_interpolator() {
        let mut s = session();
        let mut a = snapshot(1, 0);
        a.state.bumper_2.x = 0.0;
        let mut b = snapshot(2, 0);
        b.state.bumper_2.x = 4.0;
        s.apply_snapshot(&a, 0.0);
        s.apply_snapshot(&b, 200.0);
        assert_eq!(s.view(200.0).paddles[1], 2.0);
    }

    #[test]
    fn reseating_drops_stale_opponent_samples() {
        let mut s = session();
        let mut a = snapshot(1, 0);
        a.state.bumper_2.x = 0.0;
        let mut b = snapshot(2, 0);
        b.state.bumper_2.x = 4.0;
        s.apply_snapshot(&a, 0.0);
        s.apply_snapshot(&b, 200.0);

        s.handle_message(
            ServerMessage::PlayerJoined(PlayerJoinedMsg {
                player_number: 2,
                player_id: 42,
            }),
            200.0,
        );
        assert_eq!(s.local_index(), Some(1));
        let view = s.view(200.0);
        assert_eq!(view.paddles[0], s.state().paddles[0].x);
        assert_eq!(view.paddles[1], 4.0);
    }

    #[test]
    fn loaded_config_session_starts_unseated() {
        let s = ClientSession::with_loaded_config(42);
        assert_eq!(s.local_index(), None);
        assert_eq!(*s.phase(), SessionPhase::Waiting);
        assert_eq!(s.last_tick(), None);
    }

    #[test]
    fn pause_and_resume() {
        let mut s = session();
        s.handle_message(
            ServerMessage::GamePaused(GamePausedMsg {
                name: "bob".into(),
                remaining_time: 30,
            }),
            0.0,
        );
        assert_eq!(
            *s.phase(),
            SessionPhase::Paused {
                name: "bob".into(),
                remaining_secs: 30
            }
        );
        assert_eq!(s.press(MoveAction::MoveLeft, true, 0.0), None);
        s.handle_message(ServerMessage::GameUnpaused, 0.0);
        assert_eq!(*s.phase(), SessionPhase::Playing);
    }

    #[test]
    fn normal_close_keeps_result() {
        let mut s = session();
        let result = MatchResultMsg {
            winner: 42,
            loser: 7,
            score: [5, 3],
        };
        s.handle_message(ServerMessage::PlayerWon(result), 0.0);
        let outcome = s.handle_close(Some(1000));
        assert_eq!(outcome.message, None);
        assert_eq!(outcome.redirect_after, None);
        assert_eq!(
            *s.phase(),
            SessionPhase::Finished {
                result,
                resigned: false
            }
        );
    }

    #[test]
    fn already_in_game_close_redirects() {
        let mut s = session();
        let outcome = s.handle_close(Some(4001));
        assert_eq!(outcome.message, Some("You are already playing in another game."));
        assert_eq!(outcome.redirect_after, Some(Duration::from_secs(3)));
        assert_eq!(*s.phase(), SessionPhase::Disconnected(outcome));
    }

    #[test]
    fn poll_drains_network_and_closes() {
        let net = NetClient::new();
        let socket = net.socket_handle();
        socket.on_open();
        let mut s = ClientSession::new(42, PongConfig::default(), &SyncConfig::default());
        socket.on_message(
            encode_server_message(&ServerMessage::PlayerJoined(PlayerJoinedMsg {
                player_number: 2,
                player_id: 42,
            }))
            .unwrap(),
        );
        socket.on_message(encode_server_message(&ServerMessage::GameStarted).unwrap());
        s.poll(&net, FRAME_SECS, 0.0);
        assert_eq!(s.local_index(), Some(1));
        assert_eq!(*s.phase(), SessionPhase::Playing);

        socket.on_close(Some(4000));
        s.poll(&net, FRAME_SECS, 16.0);
        assert!(matches!(
            s.phase(),
            SessionPhase::Disconnected(CloseOutcome {
                reason: CloseReason::MatchGone,
                ..
            })
        ));
    }
}
