use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::config::PongConfig;
use crate::{BallState, InputIntent, MatchState, arena, collision};

/// Wall reflections followed before the prediction gives up.
const MAX_PREDICTED_BOUNCES: usize = 32;

/// How the bot leans off its predicted intercept.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AimBias {
    Exact,
    Under,
    Over,
}

/// Single-player opponent. Decides which movement keys its paddle holds.
#[derive(Debug, Clone)]
pub struct BotBrain {
    paddle_index: usize,
    bias: AimBias,
    offset: f32,
    was_approaching: bool,
    rng: StdRng,
}

/// Where the ball will cross `line_z`, following wall reflections on a copy
/// of its motion. `None` if the ball is not heading for that line.
pub fn predict_intercept_x(ball: &BallState, line_z: f32, config: &PongConfig) -> Option<f32> {
    let velocity = ball.frame_velocity();
    if velocity.z == 0.0 {
        return None;
    }
    let mut remaining = (line_z - ball.z) / velocity.z;
    if !remaining.is_finite() || remaining < 0.0 {
        return None;
    }

    let limit = arena::ball_x_limit(ball.radius, config);
    let mut x = ball.x.clamp(-limit, limit);
    let mut vx = velocity.x;
    for _ in 0..MAX_PREDICTED_BOUNCES {
        if vx == 0.0 {
            break;
        }
        let wall = if vx > 0.0 { limit } else { -limit };
        let to_wall = (wall - x) / vx;
        if to_wall >= remaining {
            break;
        }
        x = wall;
        remaining -= to_wall;
        vx = -vx;
    }
    Some((x + vx * remaining).clamp(-limit, limit))
}

impl BotBrain {
    pub fn new(paddle_index: usize, seed: u64) -> Self {
        Self {
            paddle_index,
            bias: AimBias::Exact,
            offset: 0.0,
            was_approaching: false,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn paddle_index(&self) -> usize {
        self.paddle_index
    }

    pub fn bias(&self) -> (AimBias, f32) {
        (self.bias, self.offset)
    }

    fn redraw_bias(&mut self, config: &PongConfig) {
        self.bias = match self.rng.random_range(0..3) {
            0 => AimBias::Exact,
            1 => AimBias::Under,
            _ => AimBias::Over,
        };
        self.offset = if config.bot_offset_max > config.bot_offset_min {
            self.rng.random_range(config.bot_offset_min..config.bot_offset_max)
        } else {
            config.bot_offset_min
        };
    }

    fn bias_shift(&self) -> f32 {
        match self.bias {
            AimBias::Exact => 0.0,
            AimBias::Under => -self.offset,
            AimBias::Over => self.offset,
        }
    }

    /// Choose this frame's keys. The bias is re-drawn only when the ball
    /// turns toward the bot's paddle; a receding ball sends it back to center.
    pub fn think(&mut self, state: &MatchState, config: &PongConfig) -> InputIntent {
        let Some(paddle) = state.paddles.get(self.paddle_index) else {
            return InputIntent::default();
        };
        let approaching = collision::ball_approaches(&state.ball, paddle);
        if approaching && !self.was_approaching {
            self.redraw_bias(config);
            tracing::trace!(bias = ?self.bias, offset = self.offset, "Bot re-aimed");
        }
        self.was_approaching = approaching;

        let target = if approaching {
            let line_z = collision::leading_edge_z(&state.ball, paddle);
            predict_intercept_x(&state.ball, line_z, config)
                .map_or(0.0, |x| x + self.bias_shift())
        } else {
            0.0
        };
        let limit = arena::paddle_x_limit(paddle.half_length, config);
        let diff = target.clamp(-limit, limit) - paddle.x;
        if diff.abs() <= config.bot_dead_zone {
            return InputIntent::default();
        }

        // Same keys a player would press; a reversed-controls debuff still
        // applies in the shared movement code.
        let want_right = (diff > 0.0) == (paddle.dir_z > 0.0);
        InputIntent {
            moves_left: !want_right,
            moves_right: want_right,
        }
    }
}
