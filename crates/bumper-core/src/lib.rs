pub mod game_trait;
pub mod net;
pub mod player;
pub mod powerup;

#[cfg(any(test, feature = "test-helpers"))]
pub mod test_helpers {
    use crate::game_trait::{FRAME_SECS, MatchEvent, MatchSimulation};
    use crate::net::messages::{MoveAction, MovementInputMsg};
    use crate::player::{Player, PlayerId, player_number};

    /// Create the two seated test players with ids 1 and 2.
    pub fn make_players() -> Vec<Player> {
        (0..2)
            .map(|i| Player {
                id: i as PlayerId + 1,
                display_name: format!("Player{}", i + 1),
                number: player_number(i),
            })
            .collect()
    }

    /// Run `n` fixed frames, returning all accumulated events.
    pub fn run_frames(game: &mut dyn MatchSimulation, n: usize) -> Vec<MatchEvent> {
        let mut all_events = Vec::new();
        for _ in 0..n {
            all_events.extend(game.update(FRAME_SECS));
        }
        all_events
    }

    /// Press input for seat 1 with the given sequence.
    pub fn press(action: MoveAction, sequence: u32) -> MovementInputMsg {
        MovementInputMsg::new(action, sequence, true, 1)
    }

    // ================================================================
    // Simulation Contract Tests
    // ================================================================
    // Every MatchSimulation implementation must pass these. Game crates
    // call them from their own #[cfg(test)] modules.

    /// After init(), serialize_state() is non-empty and scores are zero.
    pub fn contract_init_resets_match(game: &mut dyn MatchSimulation) {
        game.init(&make_players());
        assert!(
            !game.serialize_state().is_empty(),
            "serialize_state() must return non-empty bytes after init"
        );
        assert_eq!(game.scores(), [0, 0]);
        assert!(!game.is_complete());
        assert_eq!(game.winner(), None);
    }

    /// update() with a whole frame must move the simulation.
    pub fn contract_update_advances_state(game: &mut dyn MatchSimulation) {
        let before = game.serialize_state();
        game.update(FRAME_SECS);
        let after = game.serialize_state();
        assert_ne!(before, after, "update(FRAME_SECS) must advance state");
    }

    /// A fresh press is echoed back, a replayed one is not.
    pub fn contract_apply_input_echoes_once(game: &mut dyn MatchSimulation) {
        let input = press(MoveAction::MoveLeft, 1);
        let echo = game.apply_input(1, &input);
        assert_eq!(echo, Some(input), "first input must be echoed");
        assert_eq!(
            game.apply_input(1, &input),
            None,
            "replayed sequence must be dropped"
        );
    }

    /// A returning seat accepts sequence 1 again and starts with no keys held.
    pub fn contract_rejoin_restarts_sequences(game: &mut dyn MatchSimulation) {
        assert!(game.apply_input(1, &press(MoveAction::MoveLeft, 5)).is_some());
        game.player_left(1);
        game.player_joined(1);
        let fresh = press(MoveAction::MoveLeft, 1);
        assert_eq!(
            game.apply_input(1, &fresh),
            Some(fresh),
            "first input of a new session must be accepted"
        );
    }

    /// pause() freezes state, resume() unfreezes it.
    pub fn contract_pause_stops_updates(game: &mut dyn MatchSimulation) {
        game.pause();
        assert!(game.is_paused());
        let before = game.serialize_state();
        run_frames(game, 10);
        assert_eq!(before, game.serialize_state(), "state must not change while paused");

        game.resume();
        run_frames(game, 10);
        assert_ne!(before, game.serialize_state(), "state must change after resume");
    }

    /// Applying the same snapshot twice is the same as applying it once.
    pub fn contract_snapshot_is_idempotent(game: &mut dyn MatchSimulation) {
        run_frames(game, 30);
        let snap = game.snapshot();
        game.apply_snapshot(&snap);
        let once = game.serialize_state();
        game.apply_snapshot(&snap);
        assert_eq!(once, game.serialize_state(), "second application must be a no-op");
        assert_eq!(game.snapshot(), snap);
    }

    /// forfeit() completes the match in favour of the other seat.
    pub fn contract_forfeit_completes(game: &mut dyn MatchSimulation) {
        game.forfeit(2);
        assert!(game.is_complete());
        assert_eq!(game.winner(), Some(1));
        game.forfeit(1);
        assert_eq!(game.winner(), Some(1), "forfeit after completion is a no-op");
    }
}
