use rand::Rng;

use crate::config::PongConfig;
use crate::{BallState, MatchState, PaddleState, Vec2};

/// Paddle index that scores when the ball has crossed a goal line.
///
/// Crossing +z is paddle 1's goal, so paddle 0 scores, and vice versa.
pub fn goal_scorer(ball: &BallState, config: &PongConfig) -> Option<usize> {
    if ball.z >= config.board_half_depth {
        Some(0)
    } else if ball.z <= -config.board_half_depth {
        Some(1)
    } else {
        None
    }
}

/// Center the ball and clear its temporal speed.
pub fn reset_ball(ball: &mut BallState) {
    ball.x = 0.0;
    ball.z = 0.0;
    ball.velocity = Vec2::default();
    ball.temporal_speed = Vec2::new(1.0, 1.0);
}

/// Serve from the center along `dir_z` with a random lateral sign.
pub fn serve<R: Rng + ?Sized>(
    ball: &mut BallState,
    dir_z: f32,
    config: &PongConfig,
    rng: &mut R,
) {
    reset_ball(ball);
    let sign = if rng.random_bool(0.5) { 1.0 } else { -1.0 };
    ball.velocity = Vec2::new(config.serve_speed_x * sign, config.serve_speed_z * dir_z);
}

/// Credit a point and serve away from the side that conceded.
pub fn award_point<R: Rng + ?Sized>(
    state: &mut MatchState,
    scorer: usize,
    config: &PongConfig,
    rng: &mut R,
) {
    let loser = 1 - scorer;
    state.paddles[scorer].score = state.paddles[scorer].score.saturating_add(1);
    state.last_bumper_collided = None;
    let dir_z = state.paddles[loser].dir_z;
    serve(&mut state.ball, dir_z, config, rng);
}

/// Paddle index that has reached `win_score`, if any.
pub fn winner(paddles: &[PaddleState; 2], win_score: u8) -> Option<usize> {
    paddles.iter().position(|p| p.score >= win_score)
}
