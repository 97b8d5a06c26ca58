use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use tokio::sync::RwLock;

use bumper_pong::config::PongConfig;

use crate::config::ServerConfig;
use crate::game_loop::MatchSettings;
use crate::match_manager::MatchManager;

pub type SharedMatchManager = Arc<RwLock<MatchManager>>;

#[derive(Clone)]
pub struct AppState {
    pub matches: SharedMatchManager,
    pub config: Arc<ServerConfig>,
    pub ws_connection_count: Arc<AtomicUsize>,
}

impl AppState {
    pub fn new(config: ServerConfig) -> Self {
        let mut pong = PongConfig::load();
        pong.win_score = config.matches.win_score;
        let settings = MatchSettings {
            tick_rate_hz: config.matches.tick_rate_hz,
            pause_timeout: Duration::from_secs(config.matches.pause_timeout_secs),
            pong,
        };
        Self {
            matches: Arc::new(RwLock::new(MatchManager::new(
                settings,
                config.limits.max_ended_matches,
            ))),
            config: Arc::new(config),
            ws_connection_count: Arc::new(AtomicUsize::new(0)),
        }
    }
}

/// Counts a live WebSocket connection for as long as it is held.
pub struct ConnectionGuard {
    count: Arc<AtomicUsize>,
}

impl ConnectionGuard {
    pub fn new(count: Arc<AtomicUsize>) -> Self {
        count.fetch_add(1, Ordering::Relaxed);
        Self { count }
    }
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        self.count.fetch_sub(1, Ordering::Relaxed);
    }
}
