use rand::Rng;
use serde::{Deserialize, Serialize};

use bumper_core::powerup::{ActivePowerUp, PowerUpKind};

use crate::config::PongConfig;
use crate::{BallState, PaddleState, arena};

/// The five pickup effects, in wire-id order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Effect {
    EnlargeSelf,
    ShrinkOpponent,
    ReverseOpponentControls,
    SlowOpponent,
    WidenSelf,
}

impl Effect {
    pub const ALL: [Effect; 5] = [
        Effect::EnlargeSelf,
        Effect::ShrinkOpponent,
        Effect::ReverseOpponentControls,
        Effect::SlowOpponent,
        Effect::WidenSelf,
    ];

    pub fn from_wire_id(id: u8) -> Option<Self> {
        Self::ALL.get(usize::from(id).checked_sub(1)?).copied()
    }

    /// Whether the effect lands on the paddle that triggered it.
    pub fn targets_self(self) -> bool {
        matches!(self, Effect::EnlargeSelf | Effect::WidenSelf)
    }

    /// Paddle index the effect lands on when `trigger` consumed the pickup.
    pub fn target_for(self, trigger: usize) -> usize {
        if self.targets_self() {
            trigger
        } else {
            1 - trigger
        }
    }

    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self::ALL[rng.random_range(0..Self::ALL.len())]
    }
}

impl PowerUpKind for Effect {
    fn wire_id(&self) -> u8 {
        match self {
            Effect::EnlargeSelf => 1,
            Effect::ShrinkOpponent => 2,
            Effect::ReverseOpponentControls => 3,
            Effect::SlowOpponent => 4,
            Effect::WidenSelf => 5,
        }
    }
}

/// At most one effect is ever active.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub enum EffectState {
    #[default]
    Inactive,
    Active {
        power_up: ActivePowerUp<Effect>,
        target: usize,
    },
}

impl EffectState {
    pub fn is_active(&self) -> bool {
        matches!(self, EffectState::Active { .. })
    }

    /// The active effect and its target paddle.
    pub fn current(&self) -> Option<(Effect, usize)> {
        match self {
            EffectState::Inactive => None,
            EffectState::Active { power_up, target } => Some((power_up.kind, *target)),
        }
    }
}

/// Paddle credited with a pickup: the last paddle to touch the ball, or the
/// paddle the ball is travelling away from when nobody has touched it yet.
pub fn resolve_trigger(last_collided: Option<usize>, ball: &BallState) -> usize {
    last_collided.unwrap_or(if ball.velocity.z >= 0.0 { 0 } else { 1 })
}

pub fn apply_modifier(paddle: &mut PaddleState, effect: Effect, config: &PongConfig) {
    match effect {
        Effect::EnlargeSelf => {
            paddle.half_length = config.paddle_half_length * config.enlarge_factor;
        },
        Effect::ShrinkOpponent => {
            paddle.half_length = config.paddle_half_length * config.shrink_factor;
        },
        Effect::ReverseOpponentControls => paddle.control_reverse = true,
        Effect::SlowOpponent => paddle.speed = config.paddle_speed * config.slow_factor,
        Effect::WidenSelf => {
            paddle.half_width = config.paddle_half_width * config.widen_factor;
        },
    }
    arena::clamp_paddle_x(paddle, config);
}

/// Put every effect-mutable attribute back to its default.
pub fn restore_defaults(paddle: &mut PaddleState, config: &PongConfig) {
    paddle.half_length = config.paddle_half_length;
    paddle.half_width = config.paddle_half_width;
    paddle.speed = config.paddle_speed;
    paddle.control_reverse = false;
    arena::clamp_paddle_x(paddle, config);
}

/// Start `effect` from the Inactive state. Returns the target paddle, or
/// `None` when an effect is already running.
pub fn activate(
    state: &mut EffectState,
    paddles: &mut [PaddleState; 2],
    effect: Effect,
    trigger: usize,
    config: &PongConfig,
) -> Option<usize> {
    if state.is_active() {
        return None;
    }
    let target = effect.target_for(trigger);
    apply_modifier(&mut paddles[target], effect, config);
    *state = EffectState::Active {
        power_up: ActivePowerUp::with_duration(effect, config.effect_duration(effect)),
        target,
    };
    Some(target)
}

/// End the active effect now. No-op when inactive.
pub fn expire(
    state: &mut EffectState,
    paddles: &mut [PaddleState; 2],
    config: &PongConfig,
) -> Option<(Effect, usize)> {
    let expired = state.current()?;
    restore_defaults(&mut paddles[expired.1], config);
    *state = EffectState::Inactive;
    Some(expired)
}

/// Count down one frame, expiring the effect when its time is up.
pub fn tick(
    state: &mut EffectState,
    paddles: &mut [PaddleState; 2],
    config: &PongConfig,
) -> Option<(Effect, usize)> {
    let EffectState::Active { power_up, .. } = state else {
        return None;
    };
    if power_up.tick() {
        expire(state, paddles, config)
    } else {
        None
    }
}

/// Follow the authoritative `current_buff_or_debuff` value.
///
/// A positive id starts that effect unless it is already running, a negative
/// id expires it, and zero clears anything still active. Returns whether the
/// paddles changed.
pub fn apply_indicator(
    state: &mut EffectState,
    paddles: &mut [PaddleState; 2],
    indicator: i8,
    last_collided: Option<usize>,
    config: &PongConfig,
) -> bool {
    let current = state.current().map(|(effect, _)| effect);
    if indicator > 0 {
        let Some(effect) = Effect::from_wire_id(indicator.unsigned_abs()) else {
            tracing::debug!(indicator, "Ignoring unknown effect id");
            return false;
        };
        if current == Some(effect) {
            return false;
        }
        expire(state, paddles, config);
        let trigger = last_collided.unwrap_or(0);
        activate(state, paddles, effect, trigger, config);
        true
    } else if indicator < 0 {
        match current {
            Some(effect) if effect.wire_id() == indicator.unsigned_abs() => {
                expire(state, paddles, config);
                true
            },
            _ => false,
        }
    } else {
        expire(state, paddles, config).is_some()
    }
}
