use serde::{Deserialize, Serialize};

/// Unique identifier for a player, assigned by the external lobby.
pub type PlayerId = u64;

/// Seat in a match as it appears on the wire: 1 (`bumper_1`) or 2 (`bumper_2`).
pub type PlayerNumber = u8;

/// A player seated in a match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    pub id: PlayerId,
    pub display_name: String,
    pub number: PlayerNumber,
}

/// Paddle index (0 or 1) for a wire player number, `None` for anything else.
pub fn paddle_index(number: PlayerNumber) -> Option<usize> {
    match number {
        1 => Some(0),
        2 => Some(1),
        _ => None,
    }
}

/// Wire player number for a paddle index.
pub fn player_number(index: usize) -> PlayerNumber {
    if index == 0 { 1 } else { 2 }
}

/// The other seat.
pub fn opponent_of(number: PlayerNumber) -> PlayerNumber {
    if number == 1 { 2 } else { 1 }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_and_number_are_inverse() {
        for idx in 0..2 {
            assert_eq!(paddle_index(player_number(idx)), Some(idx));
        }
        assert_eq!(paddle_index(0), None);
        assert_eq!(paddle_index(3), None);
    }

    #[test]
    fn opponent_swaps_seats() {
        assert_eq!(opponent_of(1), 2);
        assert_eq!(opponent_of(2), 1);
    }
}
