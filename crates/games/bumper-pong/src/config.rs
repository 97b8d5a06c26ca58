use serde::{Deserialize, Serialize};

use crate::effects::Effect;

/// Data-driven configuration for the pong simulation.
///
/// Distances are board units, velocities are board units per fixed frame.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PongConfig {
    /// Half the board extent on x. Side walls sit at ±this.
    pub board_half_width: f32,
    /// Half the board extent on z. Goal lines sit at ±this.
    pub board_half_depth: f32,
    /// Half thickness of the side walls.
    pub wall_half_width: f32,
    pub ball_radius: f32,
    /// Distance of each paddle's center line from z = 0.
    pub paddle_z: f32,
    pub paddle_half_length: f32,
    pub paddle_half_width: f32,
    /// Paddle travel per frame while a movement key is held.
    pub paddle_speed: f32,
    /// Bounce angle at the very edge of a paddle (degrees).
    pub max_bounce_angle_deg: f32,
    /// Z-velocity multiplier applied on every paddle hit.
    pub bounce_speedup: f32,
    /// Upper bound on |z-velocity| after a paddle hit.
    pub max_ball_speed_z: f32,
    /// Lower bound on |x-velocity| after a paddle hit.
    pub min_ball_speed_x: f32,
    /// Temporal speed gained on x for a hit inside the paddle's width.
    pub temporal_speed_boost: f32,
    /// Temporal speed lost per frame while above 1.0.
    pub temporal_decay_per_frame: f32,
    pub serve_speed_z: f32,
    pub serve_speed_x: f32,
    /// Largest distance any mover covers in one sub-tick.
    pub sub_tick_size: f32,
    /// Hard cap on sub-ticks per frame.
    pub max_sub_ticks: u32,
    pub pickup_half_extent: f32,
    /// Lateral pickup drift per frame.
    pub pickup_drift: f32,
    /// Z position used to park a consumed pickup.
    pub pickup_offboard_z: f32,
    /// Seconds a consumed pickup stays off the board.
    pub pickup_cooldown_secs: f32,
    pub enlarge_secs: f32,
    pub shrink_secs: f32,
    pub reverse_secs: f32,
    pub slow_secs: f32,
    pub widen_secs: f32,
    pub enlarge_factor: f32,
    pub shrink_factor: f32,
    pub widen_factor: f32,
    pub slow_factor: f32,
    /// Points needed to win.
    pub win_score: u8,
    /// Bot stops steering within this distance of its target.
    pub bot_dead_zone: f32,
    pub bot_offset_min: f32,
    pub bot_offset_max: f32,
}

impl Default for PongConfig {
    fn default() -> Self {
        Self {
            board_half_width: 10.0,
            board_half_depth: 10.0,
            wall_half_width: 0.5,
            ball_radius: 0.5,
            paddle_z: 9.0,
            paddle_half_length: 2.5,
            paddle_half_width: 0.5,
            paddle_speed: 0.25,
            max_bounce_angle_deg: 55.0,
            bounce_speedup: 1.025,
            max_ball_speed_z: 1.0,
            min_ball_speed_x: 0.05,
            temporal_speed_boost: 0.1,
            temporal_decay_per_frame: 0.002,
            serve_speed_z: 0.2,
            serve_speed_x: 0.08,
            sub_tick_size: 0.04,
            max_sub_ticks: 256,
            pickup_half_extent: 1.0,
            pickup_drift: 0.04,
            pickup_offboard_z: 100.0,
            pickup_cooldown_secs: 8.0,
            enlarge_secs: 10.0,
            shrink_secs: 10.0,
            reverse_secs: 6.0,
            slow_secs: 8.0,
            widen_secs: 10.0,
            enlarge_factor: 1.5,
            shrink_factor: 0.5,
            widen_factor: 2.0,
            slow_factor: 0.5,
            win_score: 5,
            bot_dead_zone: 0.2,
            bot_offset_min: 0.5,
            bot_offset_max: 2.0,
        }
    }
}

impl PongConfig {
    /// Load config from environment or TOML file, falling back to defaults.
    pub fn load() -> Self {
        if let Ok(path) = std::env::var("BUMPER_PONG_CONFIG")
            && let Ok(contents) = std::fs::read_to_string(&path)
        {
            match toml::from_str::<Self>(&contents) {
                Ok(config) => return config,
                Err(e) => tracing::warn!(path = %path, error = %e, "Ignoring invalid pong config"),
            }
        }
        if let Ok(contents) = std::fs::read_to_string("config/pong.toml")
            && let Ok(config) = toml::from_str::<Self>(&contents)
        {
            return config;
        }
        Self::default()
    }

    /// Configured duration of an effect in seconds.
    pub fn effect_duration(&self, effect: Effect) -> f32 {
        match effect {
            Effect::EnlargeSelf => self.enlarge_secs,
            Effect::ShrinkOpponent => self.shrink_secs,
            Effect::ReverseOpponentControls => self.reverse_secs,
            Effect::SlowOpponent => self.slow_secs,
            Effect::WidenSelf => self.widen_secs,
        }
    }
}
