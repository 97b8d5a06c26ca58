use rand::Rng;

use bumper_core::powerup::frames_for;

use crate::config::PongConfig;
use crate::effects::{self, Effect};
use crate::{BallState, MatchState, PaddleState, PickupState, arena, collision, scoring};

/// What happened during one frame.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrameOutcome {
    pub sub_ticks: u32,
    /// Paddle indices that hit the ball, in order.
    pub paddle_hits: Vec<usize>,
    pub effect_started: Option<(Effect, usize)>,
    /// Paddle index that scored. Sub-ticking stops on a goal.
    pub scored: Option<usize>,
}

/// World-space x direction a paddle's intent drives it in: -1, 0 or +1.
///
/// Left and right are relative to the paddle's facing, and `control_reverse`
/// swaps them.
pub fn movement_direction(paddle: &PaddleState) -> f32 {
    let (left, right) = if paddle.control_reverse {
        (paddle.intent.moves_right, paddle.intent.moves_left)
    } else {
        (paddle.intent.moves_left, paddle.intent.moves_right)
    };
    let facing = match (left, right) {
        (true, false) => -1.0,
        (false, true) => 1.0,
        _ => 0.0,
    };
    facing * paddle.dir_z
}

/// Number of sub-ticks for this frame, based on the fastest mover.
pub fn sub_tick_count(state: &MatchState, config: &PongConfig) -> u32 {
    let ball_distance = state.ball.frame_velocity().length();
    let total_frame_distance = state
        .paddles
        .iter()
        .filter(|p| movement_direction(p) != 0.0)
        .map(|p| p.speed)
        .fold(ball_distance, f32::max);

    if config.sub_tick_size <= 0.0 || !total_frame_distance.is_finite() {
        return 1;
    }
    ((total_frame_distance / config.sub_tick_size).ceil() as u32)
        .clamp(1, config.max_sub_ticks.max(1))
}

/// Keep the ball between the side walls, bouncing x-velocity back inward.
/// Returns whether the ball touched a wall.
pub fn clamp_ball_to_walls(ball: &mut BallState, config: &PongConfig) -> bool {
    let limit = arena::ball_x_limit(ball.radius, config);
    if ball.x < -limit {
        ball.x = -limit;
        ball.velocity.x = ball.velocity.x.abs();
        true
    } else if ball.x > limit {
        ball.x = limit;
        ball.velocity.x = -ball.velocity.x.abs();
        true
    } else {
        false
    }
}

/// Move a paddle by `fraction` of its per-frame speed along its intent.
pub fn move_paddle(paddle: &mut PaddleState, fraction: f32, config: &PongConfig) {
    let direction = movement_direction(paddle);
    if direction != 0.0 {
        paddle.x += direction * paddle.speed * fraction;
    }
    arena::clamp_paddle_x(paddle, config);
}

/// Pull temporal speed toward 1.0 on both axes.
pub fn decay_temporal_speed(ball: &mut BallState, amount: f32) {
    ball.temporal_speed.x = (ball.temporal_speed.x - amount).max(1.0);
    ball.temporal_speed.z = (ball.temporal_speed.z - amount).max(1.0);
}

/// Park a consumed pickup off the board for the cooldown.
pub fn relocate_pickup(pickup: &mut PickupState, config: &PongConfig) {
    pickup.z = config.pickup_offboard_z;
    pickup.cooldown_frames = frames_for(config.pickup_cooldown_secs);
}

/// Drift the pickup along the center line, or count down its cooldown and
/// bring it back at a random x.
pub fn update_pickup<R: Rng + ?Sized>(
    pickup: &mut PickupState,
    config: &PongConfig,
    rng: &mut R,
) {
    let limit = arena::pickup_x_limit(pickup.half_extent, config);
    if pickup.cooldown_frames > 0 {
        pickup.cooldown_frames -= 1;
        if pickup.cooldown_frames == 0 {
            pickup.x = if limit > 0.0 {
                rng.random_range(-limit..=limit)
            } else {
                0.0
            };
            pickup.z = 0.0;
            let sign = if rng.random_bool(0.5) { 1.0 } else { -1.0 };
            pickup.velocity_x = config.pickup_drift * sign;
            tracing::trace!(x = pickup.x, "Pickup respawned");
        }
        return;
    }

    pickup.x += pickup.velocity_x;
    if pickup.x > limit {
        pickup.x = limit;
        pickup.velocity_x = -pickup.velocity_x.abs();
    } else if pickup.x < -limit {
        pickup.x = -limit;
        pickup.velocity_x = pickup.velocity_x.abs();
    }
}

/// Advance ball and paddles by one frame in sub-ticks.
///
/// Each sub-tick moves the ball, clamps it to the walls, resolves paddle
/// hits, moves the paddles, checks the pickup, checks for a goal, and decays
/// temporal speed, in that order.
pub fn step_frame<R: Rng + ?Sized>(
    state: &mut MatchState,
    config: &PongConfig,
    rng: &mut R,
) -> FrameOutcome {
    let sub_ticks = sub_tick_count(state, config);
    let fraction = 1.0 / sub_ticks as f32;
    let mut outcome = FrameOutcome {
        sub_ticks,
        ..FrameOutcome::default()
    };

    for _ in 0..sub_ticks {
        let step = state.ball.frame_velocity();
        state.ball.x += step.x * fraction;
        state.ball.z += step.z * fraction;

        clamp_ball_to_walls(&mut state.ball, config);

        for (index, paddle) in state.paddles.iter().enumerate() {
            if collision::ball_approaches(&state.ball, paddle)
                && collision::paddle_overlap(&state.ball, paddle)
            {
                let hit = collision::resolve_paddle_hit(&mut state.ball, paddle, config);
                tracing::trace!(index, offset = hit.offset, "Paddle hit");
                state.last_bumper_collided = Some(index);
                outcome.paddle_hits.push(index);
            }
        }

        for paddle in &mut state.paddles {
            move_paddle(paddle, fraction, config);
        }

        if !state.effect.is_active()
            && state.pickup.is_on_board()
            && collision::pickup_overlap(&state.ball, &state.pickup)
        {
            let trigger = effects::resolve_trigger(state.last_bumper_collided, &state.ball);
            state.last_bumper_collided = Some(trigger);
            let effect = Effect::random(rng);
            if let Some(target) =
                effects::activate(&mut state.effect, &mut state.paddles, effect, trigger, config)
            {
                outcome.effect_started = Some((effect, target));
            }
            relocate_pickup(&mut state.pickup, config);
        }

        if let Some(scorer) = scoring::goal_scorer(&state.ball, config) {
            scoring::award_point(state, scorer, config, rng);
            outcome.scored = Some(scorer);
            return outcome;
        }

        decay_temporal_speed(&mut state.ball, config.temporal_decay_per_frame * fraction);
    }

    outcome
}
