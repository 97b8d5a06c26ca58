pub mod arena;
pub mod bot;
pub mod clock;
pub mod collision;
pub mod config;
pub mod effects;
pub mod physics;
pub mod scoring;

use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};

use bumper_core::game_trait::{MatchEvent, MatchSimulation};
use bumper_core::match_simulation_boilerplate;
use bumper_core::net::messages::{
    BallStateMsg, BumperStateMsg, MatchStateMsg, MoveAction, MovementInputMsg, StateUpdatedMsg,
    Vec2Msg,
};
use bumper_core::player::{Player, PlayerNumber, opponent_of, paddle_index, player_number};
use bumper_core::powerup::{PowerUpKind, frames_for};

use clock::SimulationClock;
use config::PongConfig;
use effects::EffectState;

/// A 2D vector on the board plane.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: f32,
    pub z: f32,
}

impl Vec2 {
    pub fn new(x: f32, z: f32) -> Self {
        Self { x, z }
    }

    pub fn length(self) -> f32 {
        self.x.hypot(self.z)
    }
}

impl From<Vec2> for Vec2Msg {
    fn from(v: Vec2) -> Self {
        Self { x: v.x, z: v.z }
    }
}

impl From<Vec2Msg> for Vec2 {
    fn from(v: Vec2Msg) -> Self {
        Self { x: v.x, z: v.z }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BallState {
    pub x: f32,
    pub z: f32,
    /// Units per frame, before temporal speed.
    pub velocity: Vec2,
    /// Per-axis multiplier, never below 1.0.
    pub temporal_speed: Vec2,
    pub radius: f32,
}

impl BallState {
    pub fn new(radius: f32) -> Self {
        Self {
            x: 0.0,
            z: 0.0,
            velocity: Vec2::default(),
            temporal_speed: Vec2::new(1.0, 1.0),
            radius,
        }
    }

    /// Displacement over one whole frame.
    pub fn frame_velocity(&self) -> Vec2 {
        Vec2::new(
            self.velocity.x * self.temporal_speed.x,
            self.velocity.z * self.temporal_speed.z,
        )
    }

    pub fn to_msg(&self) -> BallStateMsg {
        BallStateMsg {
            x: self.x,
            z: self.z,
            velocity: self.velocity.into(),
            temporal_speed: self.temporal_speed.into(),
        }
    }

    pub fn apply_msg(&mut self, msg: &BallStateMsg) {
        self.x = msg.x;
        self.z = msg.z;
        self.velocity = msg.velocity.into();
        self.temporal_speed = msg.temporal_speed.into();
    }
}

/// Movement keys currently held for a paddle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct InputIntent {
    pub moves_left: bool,
    pub moves_right: bool,
}

impl InputIntent {
    pub fn set(&mut self, action: MoveAction, pressed: bool) {
        match action {
            MoveAction::MoveLeft => self.moves_left = pressed,
            MoveAction::MoveRight => self.moves_right = pressed,
        }
    }

    pub fn is_pressed(&self, action: MoveAction) -> bool {
        match action {
            MoveAction::MoveLeft => self.moves_left,
            MoveAction::MoveRight => self.moves_right,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaddleState {
    pub x: f32,
    pub z: f32,
    /// +1.0 when the paddle faces +z, -1.0 when it faces -z.
    pub dir_z: f32,
    pub half_length: f32,
    pub half_width: f32,
    pub speed: f32,
    pub control_reverse: bool,
    pub intent: InputIntent,
    pub score: u8,
}

impl PaddleState {
    pub fn new(index: usize, config: &PongConfig) -> Self {
        let (z, dir_z) = arena::paddle_line(index, config);
        Self {
            x: 0.0,
            z,
            dir_z,
            half_length: config.paddle_half_length,
            half_width: config.paddle_half_width,
            speed: config.paddle_speed,
            control_reverse: false,
            intent: InputIntent::default(),
            score: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PickupState {
    pub x: f32,
    pub z: f32,
    pub velocity_x: f32,
    pub half_extent: f32,
    /// Frames left off the board. Zero while the pickup is in play.
    pub cooldown_frames: u32,
}

impl PickupState {
    /// A pickup parked off the board, due after the configured cooldown.
    pub fn new(config: &PongConfig) -> Self {
        Self {
            x: 0.0,
            z: config.pickup_offboard_z,
            velocity_x: config.pickup_drift,
            half_extent: config.pickup_half_extent,
            cooldown_frames: frames_for(config.pickup_cooldown_secs),
        }
    }

    pub fn is_on_board(&self) -> bool {
        self.cooldown_frames == 0
    }
}

/// Complete simulation state of one match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchState {
    pub ball: BallState,
    pub paddles: [PaddleState; 2],
    pub pickup: PickupState,
    pub effect: EffectState,
    /// Wire value of `current_buff_or_debuff` for the latest frame.
    pub effect_indicator: i8,
    /// Paddle index that last touched the ball.
    pub last_bumper_collided: Option<usize>,
    pub tick: u32,
    pub complete: bool,
    /// Paddle index of the winner once complete.
    pub winner: Option<usize>,
}

impl MatchState {
    pub fn new(config: &PongConfig) -> Self {
        Self {
            ball: BallState::new(config.ball_radius),
            paddles: [PaddleState::new(0, config), PaddleState::new(1, config)],
            pickup: PickupState::new(config),
            effect: EffectState::Inactive,
            effect_indicator: 0,
            last_bumper_collided: None,
            tick: 0,
            complete: false,
            winner: None,
        }
    }

    pub fn scores(&self) -> [u8; 2] {
        [self.paddles[0].score, self.paddles[1].score]
    }

    pub fn to_msg(&self) -> MatchStateMsg {
        MatchStateMsg {
            ball: self.ball.to_msg(),
            bumper_1: BumperStateMsg {
                x: self.paddles[0].x,
                score: self.paddles[0].score,
            },
            bumper_2: BumperStateMsg {
                x: self.paddles[1].x,
                score: self.paddles[1].score,
            },
            pickup: Vec2Msg {
                x: self.pickup.x,
                z: self.pickup.z,
            },
            current_buff_or_debuff: self.effect_indicator,
            last_bumper_collided: self.last_bumper_collided.map(player_number),
        }
    }

    /// Overwrite with an authoritative snapshot. Effect transitions encoded in
    /// the indicator are applied at most once, so re-applying is a no-op.
    pub fn apply_msg(&mut self, msg: &MatchStateMsg, config: &PongConfig) {
        self.last_bumper_collided = msg.last_bumper_collided.and_then(paddle_index);
        effects::apply_indicator(
            &mut self.effect,
            &mut self.paddles,
            msg.current_buff_or_debuff,
            self.last_bumper_collided,
            config,
        );
        self.effect_indicator = msg.current_buff_or_debuff;
        self.ball.apply_msg(&msg.ball);
        self.paddles[0].x = msg.bumper_1.x;
        self.paddles[0].score = msg.bumper_1.score;
        self.paddles[1].x = msg.bumper_2.x;
        self.paddles[1].score = msg.bumper_2.score;
        self.pickup.x = msg.pickup.x;
        self.pickup.z = msg.pickup.z;
        if let Some(winner) = scoring::winner(&self.paddles, config.win_score) {
            self.complete = true;
            self.winner = Some(winner);
        }
    }
}

/// The authoritative bumper pong match.
pub struct BumperMatch {
    state: MatchState,
    players: Vec<Player>,
    /// Highest accepted sequence per paddle, per action.
    last_sequence: [[u32; 2]; 2],
    clock: SimulationClock,
    rng: StdRng,
    paused: bool,
    game_config: PongConfig,
}

fn action_slot(action: MoveAction) -> usize {
    match action {
        MoveAction::MoveLeft => 0,
        MoveAction::MoveRight => 1,
    }
}

impl BumperMatch {
    pub fn new() -> Self {
        Self::with_config(PongConfig::load())
    }

    pub fn with_config(config: PongConfig) -> Self {
        Self::with_seed(config, rand::random())
    }

    /// Deterministic match: the same seed and inputs give the same frames.
    pub fn with_seed(config: PongConfig, seed: u64) -> Self {
        Self {
            state: MatchState::new(&config),
            players: Vec::new(),
            last_sequence: [[0; 2]; 2],
            clock: SimulationClock::new(),
            rng: StdRng::seed_from_u64(seed),
            paused: false,
            game_config: config,
        }
    }

    pub fn state(&self) -> &MatchState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut MatchState {
        &mut self.state
    }

    pub fn config(&self) -> &PongConfig {
        &self.game_config
    }

    pub fn players(&self) -> &[Player] {
        &self.players
    }

    /// Replace a paddle's intent directly, bypassing sequence checks.
    /// Used for locally driven paddles such as the bot.
    pub fn set_intent(&mut self, index: usize, intent: InputIntent) {
        if let Some(paddle) = self.state.paddles.get_mut(index) {
            paddle.intent = intent;
        }
    }

    /// Advance exactly one fixed frame.
    pub fn step_frame(&mut self) -> Vec<MatchEvent> {
        let mut events = Vec::new();
        let config = &self.game_config;
        let state = &mut self.state;

        state.tick = state.tick.wrapping_add(1);
        state.effect_indicator = 0;

        if let Some((effect, target)) = effects::tick(&mut state.effect, &mut state.paddles, config)
        {
            state.effect_indicator = -(effect.wire_id() as i8);
            tracing::debug!(tick = state.tick, ?effect, target, "Effect expired");
            events.push(MatchEvent::EffectExpired {
                effect_id: effect.wire_id(),
                target: player_number(target),
            });
        }

        physics::update_pickup(&mut state.pickup, config, &mut self.rng);
        let outcome = physics::step_frame(state, config, &mut self.rng);

        for &index in &outcome.paddle_hits {
            events.push(MatchEvent::PaddleHit {
                number: player_number(index),
            });
        }

        if let Some((effect, target)) = outcome.effect_started {
            state.effect_indicator = effect.wire_id() as i8;
            tracing::debug!(tick = state.tick, ?effect, target, "Effect started");
            events.push(MatchEvent::EffectStarted {
                effect_id: effect.wire_id(),
                target: player_number(target),
            });
        } else if state.effect_indicator == 0
            && let Some((effect, _)) = state.effect.current()
        {
            state.effect_indicator = effect.wire_id() as i8;
        }

        if let Some(scorer) = outcome.scored {
            let score = state.scores();
            tracing::debug!(tick = state.tick, scorer, ?score, "Point scored");
            events.push(MatchEvent::Scored {
                scorer: player_number(scorer),
                score,
            });
            if let Some(winner) = scoring::winner(&state.paddles, config.win_score) {
                state.complete = true;
                state.winner = Some(winner);
                tracing::debug!(tick = state.tick, winner, ?score, "Match won");
                events.push(MatchEvent::MatchWon {
                    winner: player_number(winner),
                    score,
                });
            }
        }

        events
    }
}

impl Default for BumperMatch {
    fn default() -> Self {
        Self::with_config(PongConfig::default())
    }
}

impl MatchSimulation for BumperMatch {
    fn init(&mut self, players: &[Player]) {
        self.state = MatchState::new(&self.game_config);
        self.players = players.to_vec();
        self.last_sequence = [[0; 2]; 2];
        self.clock = SimulationClock::new();
        self.paused = false;

        let dir_z = if rand::Rng::random_bool(&mut self.rng, 0.5) {
            1.0
        } else {
            -1.0
        };
        scoring::serve(&mut self.state.ball, dir_z, &self.game_config, &mut self.rng);
    }

    fn update(&mut self, dt: f32) -> Vec<MatchEvent> {
        if self.paused || self.state.complete {
            return Vec::new();
        }

        let frames = self.clock.advance(dt);
        let mut events = Vec::new();
        for _ in 0..frames {
            events.extend(self.step_frame());
            if self.state.complete {
                break;
            }
        }
        events
    }

    fn apply_input(
        &mut self,
        number: PlayerNumber,
        input: &MovementInputMsg,
    ) -> Option<MovementInputMsg> {
        let Some(index) = paddle_index(number) else {
            tracing::debug!(number, "Dropped input for unknown seat");
            return None;
        };
        let sequence = input.sequence();
        let slot = action_slot(input.action);
        if sequence == 0 || sequence <= self.last_sequence[index][slot] {
            tracing::debug!(
                number,
                sequence,
                last = self.last_sequence[index][slot],
                "Dropped stale movement input"
            );
            return None;
        }
        self.last_sequence[index][slot] = sequence;
        self.state.paddles[index]
            .intent
            .set(input.action, input.pressed());
        Some(*input)
    }

    fn player_left(&mut self, number: PlayerNumber) {
        let Some(index) = paddle_index(number) else {
            return;
        };
        self.state.paddles[index].intent = InputIntent::default();
    }

    fn player_joined(&mut self, number: PlayerNumber) {
        let Some(index) = paddle_index(number) else {
            return;
        };
        self.last_sequence[index] = [0; 2];
        self.state.paddles[index].intent = InputIntent::default();
        tracing::debug!(number, "Seat input state reset");
    }

    fn snapshot(&self) -> StateUpdatedMsg {
        StateUpdatedMsg {
            tick: self.state.tick,
            state: self.state.to_msg(),
        }
    }

    fn apply_snapshot(&mut self, snapshot: &StateUpdatedMsg) {
        self.state.apply_msg(&snapshot.state, &self.game_config);
        self.state.tick = snapshot.tick;
    }

    match_simulation_boilerplate!(state_type: MatchState);

    fn scores(&self) -> [u8; 2] {
        self.state.scores()
    }

    fn winner(&self) -> Option<PlayerNumber> {
        self.state.winner.map(player_number)
    }

    fn forfeit(&mut self, loser: PlayerNumber) {
        if self.state.complete {
            return;
        }
        let Some(winner) = paddle_index(opponent_of(loser)) else {
            return;
        };
        self.state.complete = true;
        self.state.winner = Some(winner);
        tracing::debug!(loser, "Match forfeited");
    }
}
