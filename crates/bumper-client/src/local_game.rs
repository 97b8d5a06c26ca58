use bumper_core::game_trait::{MatchEvent, MatchSimulation};
use bumper_core::net::messages::MoveAction;
use bumper_core::player::Player;
use bumper_pong::bot::BotBrain;
use bumper_pong::config::PongConfig;
use bumper_pong::{BumperMatch, InputIntent, MatchState};

/// Seat the bot plays from (`bumper_2`).
const BOT_INDEX: usize = 1;

/// Single-player match run entirely on the client against the bot.
pub struct LocalMatch {
    game: BumperMatch,
    bot: BotBrain,
    human: InputIntent,
}

impl LocalMatch {
    pub fn new(display_name: &str, config: PongConfig) -> Self {
        Self::with_seed(display_name, config, rand::random())
    }

    pub fn with_seed(display_name: &str, config: PongConfig, seed: u64) -> Self {
        let mut game = BumperMatch::with_seed(config, seed);
        game.init(&[
            Player {
                id: 1,
                display_name: display_name.to_string(),
                number: 1,
            },
            Player {
                id: 2,
                display_name: "Bot".to_string(),
                number: 2,
            },
        ]);
        Self {
            game,
            bot: BotBrain::new(BOT_INDEX, seed.wrapping_add(1)),
            human: InputIntent::default(),
        }
    }

    /// Local keys need no sequencing, so they go straight to the paddle.
    pub fn press(&mut self, action: MoveAction, pressed: bool) {
        self.human.set(action, pressed);
        self.game.set_intent(0, self.human);
    }

    /// Let the bot pick its keys, then advance by `dt` seconds.
    pub fn update(&mut self, dt: f32) -> Vec<MatchEvent> {
        if self.game.is_complete() || self.game.is_paused() {
            return Vec::new();
        }
        let intent = self.bot.think(self.game.state(), self.game.config());
        self.game.set_intent(BOT_INDEX, intent);
        self.game.update(dt)
    }

    pub fn pause(&mut self) {
        self.game.pause();
    }

    pub fn resume(&mut self) {
        self.game.resume();
    }

    pub fn state(&self) -> &MatchState {
        self.game.state()
    }

    pub fn scores(&self) -> [u8; 2] {
        self.game.scores()
    }

    pub fn is_complete(&self) -> bool {
        self.game.is_complete()
    }

    /// True once the human has won; `None` while the match runs.
    pub fn human_won(&self) -> Option<bool> {
        self.game.winner().map(|number| number == 1)
    }

    #[cfg(test)]
    fn game_mut(&mut self) -> &mut BumperMatch {
        &mut self.game
    }
}
