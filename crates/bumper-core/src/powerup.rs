use serde::{Deserialize, Serialize, de::DeserializeOwned};

use crate::game_trait::FRAME_SECS;

/// Trait for game-specific timed effect enums.
///
/// Durations are owned by the game's configuration and passed to
/// [`ActivePowerUp::with_duration`].
pub trait PowerUpKind: Clone + Copy + PartialEq + Serialize + DeserializeOwned {
    /// Stable non-zero id used on the wire.
    fn wire_id(&self) -> u8;
}

/// Whole number of fixed frames covering `secs`. Never less than one.
pub fn frames_for(secs: f32) -> u32 {
    ((secs / FRAME_SECS).round() as u32).max(1)
}

/// An active timed effect counting down in fixed frames.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct ActivePowerUp<K: PowerUpKind> {
    pub kind: K,
    pub remaining_frames: u32,
}

impl<K: PowerUpKind> ActivePowerUp<K> {
    pub fn with_duration(kind: K, secs: f32) -> Self {
        Self {
            kind,
            remaining_frames: frames_for(secs),
        }
    }

    /// Advance one frame. Returns `true` only on the frame the countdown
    /// reaches zero; further ticks return `false`.
    pub fn tick(&mut self) -> bool {
        if self.remaining_frames == 0 {
            return false;
        }
        self.remaining_frames -= 1;
        self.remaining_frames == 0
    }

    pub fn is_expired(&self) -> bool {
        self.remaining_frames == 0
    }

    pub fn remaining_secs(&self) -> f32 {
        self.remaining_frames as f32 * FRAME_SECS
    }
}
