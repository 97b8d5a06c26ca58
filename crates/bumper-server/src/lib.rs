pub mod config;
pub mod game_loop;
pub mod health;
pub mod match_manager;
pub mod state;
pub mod ws;

use axum::Router;
use axum::routing::get;

use config::ServerConfig;
use state::AppState;

/// Build the Axum router and application state from a config.
pub fn build_app(config: ServerConfig) -> (Router<()>, AppState) {
    let state = AppState::new(config);

    let app = Router::new()
        .route("/ws", get(ws::ws_handler))
        .route("/health", get(health::health_check))
        .with_state(state.clone());

    (app, state)
}
