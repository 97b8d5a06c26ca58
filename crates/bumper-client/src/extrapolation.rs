use bumper_core::game_trait::FRAME_SECS;
use bumper_pong::config::PongConfig;
use bumper_pong::{BallState, arena};

/// Advances the displayed ball past its last authoritative snapshot, up
/// to a horizon.
#[derive(Debug, Clone)]
pub struct BallExtrapolator {
    last: Option<(BallState, f64)>,
    horizon_ms: f64,
}

impl BallExtrapolator {
    pub fn new(horizon_ms: f64) -> Self {
        Self {
            last: None,
            horizon_ms: horizon_ms.max(0.0),
        }
    }

    pub fn update(&mut self, ball: BallState, received_ms: f64) {
        self.last = Some((ball, received_ms));
    }

    /// Ball position `(x, z)` to draw at `now_ms`. Frozen once the
    /// horizon has passed.
    pub fn position(&self, now_ms: f64, config: &PongConfig) -> Option<(f32, f32)> {
        let (ball, received_ms) = self.last.as_ref()?;
        let elapsed_ms = (now_ms - received_ms).clamp(0.0, self.horizon_ms);
        let frames = (elapsed_ms / 1000.0) as f32 / FRAME_SECS;
        let velocity = ball.frame_velocity();

        let limit = arena::ball_x_limit(ball.radius, config);
        let x = (ball.x + velocity.x * frames).clamp(-limit, limit);
        let z = ball.z + velocity.z * frames;
        Some((x, z))
    }
}
