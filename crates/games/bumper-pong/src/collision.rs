use crate::config::PongConfig;
use crate::{BallState, PaddleState, PickupState, Vec2};

/// Result of resolving a paddle hit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PaddleHit {
    /// Where along the paddle the ball struck, in [-1, 1].
    pub offset: f32,
    pub angle_deg: f32,
    /// Whether the ball center was inside the unexpanded paddle width.
    pub inside_width: bool,
}

/// Whether the ball travels toward the paddle's face.
pub fn ball_approaches(ball: &BallState, paddle: &PaddleState) -> bool {
    ball.velocity.z * paddle.dir_z < 0.0
}

/// Z of the paddle face the ball rests against after a hit.
pub fn leading_edge_z(ball: &BallState, paddle: &PaddleState) -> f32 {
    paddle.z + paddle.dir_z * (paddle.half_width + ball.radius)
}

/// Box test: paddle extents expanded by the ball radius on x and on the
/// leading z edge only.
pub fn paddle_overlap(ball: &BallState, paddle: &PaddleState) -> bool {
    if (ball.x - paddle.x).abs() > paddle.half_length + ball.radius {
        return false;
    }
    let lead = leading_edge_z(ball, paddle);
    let back = paddle.z - paddle.dir_z * paddle.half_width;
    ball.z >= lead.min(back) && ball.z <= lead.max(back)
}

pub fn bounce_offset(ball: &BallState, paddle: &PaddleState) -> f32 {
    ((paddle.x - ball.x) / (ball.radius + paddle.half_length)).clamp(-1.0, 1.0)
}

pub fn bounce_angle_deg(offset: f32, config: &PongConfig) -> f32 {
    config.max_bounce_angle_deg * offset
}

/// Reflect the ball off a paddle it overlaps.
pub fn resolve_paddle_hit(
    ball: &mut BallState,
    paddle: &PaddleState,
    config: &PongConfig,
) -> PaddleHit {
    let offset = bounce_offset(ball, paddle);
    let angle_deg = bounce_angle_deg(offset, config);

    let vz = (ball.velocity.z * config.bounce_speedup * ball.temporal_speed.z)
        .abs()
        .min(config.max_ball_speed_z)
        * paddle.dir_z;
    let mut vx = vz * -angle_deg.to_radians().tan() * paddle.dir_z;
    if vx.abs() < config.min_ball_speed_x {
        let sign = if vx != 0.0 {
            vx.signum()
        } else if ball.velocity.x != 0.0 {
            ball.velocity.x.signum()
        } else {
            1.0
        };
        vx = config.min_ball_speed_x * sign;
    }

    let inside_width = (ball.z - paddle.z).abs() <= paddle.half_width;
    if inside_width {
        ball.temporal_speed.x += config.temporal_speed_boost;
    }

    ball.velocity = Vec2::new(vx, vz);
    ball.z = leading_edge_z(ball, paddle);

    PaddleHit {
        offset,
        angle_deg,
        inside_width,
    }
}

pub fn pickup_overlap(ball: &BallState, pickup: &PickupState) -> bool {
    let reach = pickup.half_extent + ball.radius;
    (ball.x - pickup.x).abs() <= reach && (ball.z - pickup.z).abs() <= reach
}
