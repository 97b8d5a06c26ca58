use serde::{Deserialize, Serialize};

use crate::net::messages::{MovementInputMsg, StateUpdatedMsg};
use crate::player::{Player, PlayerNumber};

/// Duration of one fixed simulation frame. Velocities are per frame.
pub const FRAME_SECS: f32 = 1.0 / 60.0;

/// Core trait for an authoritative two-player match.
///
/// The server drives it with wall-clock deltas and broadcasts its snapshots;
/// clients may run the same type locally for prediction or offline play.
pub trait MatchSimulation: Send + Sync {
    /// Seat the players. Resets scores and the board.
    fn init(&mut self, players: &[Player]);

    /// Advance by `dt` seconds of wall-clock time. Returns what happened.
    fn update(&mut self, dt: f32) -> Vec<MatchEvent>;

    /// Apply a movement input from the given seat. Returns the echo to send
    /// back to that player, or `None` when the input was stale or invalid.
    fn apply_input(
        &mut self,
        number: PlayerNumber,
        input: &MovementInputMsg,
    ) -> Option<MovementInputMsg>;

    /// Called when a seated player disconnects. Releases their keys.
    fn player_left(&mut self, number: PlayerNumber);

    /// Called when a player takes or retakes a seat. A new client session
    /// numbers its inputs from 1 again, so the seat's sequences restart.
    fn player_joined(&mut self, number: PlayerNumber);

    /// Authoritative snapshot for broadcast.
    fn snapshot(&self) -> StateUpdatedMsg;

    /// Apply an authoritative snapshot.
    fn apply_snapshot(&mut self, snapshot: &StateUpdatedMsg);

    /// Full serialized state, used to compare simulations in tests and logs.
    fn serialize_state(&self) -> Vec<u8>;

    /// Simulation tick rate in Hz.
    fn tick_rate(&self) -> f32 {
        60.0
    }

    fn pause(&mut self);

    fn resume(&mut self);

    fn is_paused(&self) -> bool;

    /// Whether a side has won or the match was forfeited.
    fn is_complete(&self) -> bool;

    /// Scores as `[bumper_1, bumper_2]`.
    fn scores(&self) -> [u8; 2];

    fn winner(&self) -> Option<PlayerNumber>;

    /// End the match with `loser` resigning. No-op once complete.
    fn forfeit(&mut self, loser: PlayerNumber);
}

/// Events emitted by a match during update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MatchEvent {
    Scored {
        scorer: PlayerNumber,
        score: [u8; 2],
    },
    PaddleHit {
        number: PlayerNumber,
    },
    EffectStarted {
        effect_id: u8,
        target: PlayerNumber,
    },
    EffectExpired {
        effect_id: u8,
        target: PlayerNumber,
    },
    MatchWon {
        winner: PlayerNumber,
        score: [u8; 2],
    },
}

/// Generates the `MatchSimulation` methods shared by every implementation:
/// `serialize_state`, `pause`, `resume`, `is_paused`, `is_complete`.
///
/// Requires the implementing struct to have `state: $StateType` and `paused: bool` fields,
/// and `$StateType` to have a `complete: bool` field.
#[macro_export]
macro_rules! match_simulation_boilerplate {
    (state_type: $StateType:ty) => {
        fn serialize_state(&self) -> Vec<u8> {
            rmp_serde::to_vec::<$StateType>(&self.state).unwrap_or_default()
        }

        fn pause(&mut self) {
            self.paused = true;
        }

        fn resume(&mut self) {
            self.paused = false;
        }

        fn is_paused(&self) -> bool {
            self.paused
        }

        fn is_complete(&self) -> bool {
            self.state.complete
        }
    };
}
