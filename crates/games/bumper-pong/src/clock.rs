use bumper_core::game_trait::FRAME_SECS;

/// Frames run per `advance` call at most. Time beyond this is dropped.
pub const MAX_CATCH_UP_FRAMES: u32 = 8;

/// Slack for accumulated float error when comparing against a frame.
const FRAME_EPSILON: f32 = 1e-6;

/// Turns wall-clock deltas into whole fixed frames.
#[derive(Debug, Clone, Default)]
pub struct SimulationClock {
    accumulator: f32,
    frames: u64,
}

impl SimulationClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `dt` seconds and return how many whole frames are due.
    pub fn advance(&mut self, dt: f32) -> u32 {
        if dt.is_finite() && dt > 0.0 {
            self.accumulator += dt;
        }
        let mut due = 0;
        while self.accumulator + FRAME_EPSILON >= FRAME_SECS {
            self.accumulator -= FRAME_SECS;
            due += 1;
            if due == MAX_CATCH_UP_FRAMES {
                self.accumulator = 0.0;
                break;
            }
        }
        self.accumulator = self.accumulator.max(0.0);
        self.frames += u64::from(due);
        due
    }

    /// Total frames produced so far.
    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Fraction of the next frame already accumulated, in [0, 1).
    pub fn alpha(&self) -> f32 {
        (self.accumulator / FRAME_SECS).clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_frame_per_frame_duration() {
        let mut clock = SimulationClock::new();
        for _ in 0..120 {
            assert_eq!(clock.advance(FRAME_SECS), 1);
        }
        assert_eq!(clock.frames(), 120);
    }

    #[test]
    fn partial_frames_accumulate() {
        let mut clock = SimulationClock::new();
        assert_eq!(clock.advance(FRAME_SECS * 0.5), 0);
        assert!((clock.alpha() - 0.5).abs() < 1e-3);
        assert_eq!(clock.advance(FRAME_SECS * 0.6), 1);
    }

    #[test]
    fn catch_up_is_capped() {
        let mut clock = SimulationClock::new();
        assert_eq!(clock.advance(1.0), MAX_CATCH_UP_FRAMES);
        assert_eq!(clock.advance(0.0), 0, "excess time is dropped");
    }

    #[test]
    fn invalid_deltas_are_ignored() {
        let mut clock = SimulationClock::new();
        assert_eq!(clock.advance(-1.0), 0);
        assert_eq!(clock.advance(f32::NAN), 0);
        assert_eq!(clock.frames(), 0);
    }
}
