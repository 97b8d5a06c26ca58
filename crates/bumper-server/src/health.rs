use std::sync::atomic::Ordering;

use axum::Json;
use axum::extract::State;
use serde::Serialize;

use crate::state::AppState;

/// Structured health check response.
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub protocol_version: u8,
    pub connections: usize,
    pub matches: MatchInfo,
}

#[derive(Serialize)]
pub struct MatchInfo {
    pub active: usize,
    pub players: usize,
}

/// Returns server status, connection count and live match info as JSON.
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let connections = state.ws_connection_count.load(Ordering::Relaxed);
    let (active, players) = state.matches.read().await.stats();

    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        protocol_version: bumper_core::net::protocol::PROTOCOL_VERSION,
        connections,
        matches: MatchInfo { active, players },
    })
}
