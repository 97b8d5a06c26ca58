use crate::PaddleState;
use crate::config::PongConfig;

/// Largest |x| the ball center may reach before touching a side wall.
pub fn ball_x_limit(radius: f32, config: &PongConfig) -> f32 {
    (config.board_half_width - config.wall_half_width - radius).max(0.0)
}

/// Largest |x| a paddle center may reach with the given half-length.
pub fn paddle_x_limit(half_length: f32, config: &PongConfig) -> f32 {
    (config.board_half_width - config.wall_half_width - half_length).max(0.0)
}

/// Largest |x| the pickup center may reach.
pub fn pickup_x_limit(half_extent: f32, config: &PongConfig) -> f32 {
    (config.board_half_width - config.wall_half_width - half_extent).max(0.0)
}

pub fn clamp_paddle_x(paddle: &mut PaddleState, config: &PongConfig) {
    let limit = paddle_x_limit(paddle.half_length, config);
    paddle.x = paddle.x.clamp(-limit, limit);
}

/// Center line and facing of a paddle. Index 0 guards -z and faces +z.
pub fn paddle_line(index: usize, config: &PongConfig) -> (f32, f32) {
    if index == 0 {
        (-config.paddle_z, 1.0)
    } else {
        (config.paddle_z, -1.0)
    }
}
