use serde::{Deserialize, Serialize};

/// Client-side sync tuning. Times are in milliseconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// How far in the past the opponent paddle is rendered.
    pub interpolation_delay_ms: f64,
    pub interpolation_capacity: usize,
    /// Longest stretch the ball is extrapolated past its last snapshot.
    pub extrapolation_horizon_ms: f64,
    pub soft_sync_interval_ms: f64,
    /// Local/authoritative paddle gap tolerated without correction.
    pub soft_sync_threshold: f32,
    /// Share of the gap closed per correction.
    pub soft_sync_blend: f32,
    /// Unconfirmed inputs older than this are abandoned.
    pub pending_timeout_ms: f64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            interpolation_delay_ms: 100.0,
            interpolation_capacity: 10,
            extrapolation_horizon_ms: 100.0,
            soft_sync_interval_ms: 100.0,
            soft_sync_threshold: 0.15,
            soft_sync_blend: 0.3,
            pending_timeout_ms: 1000.0,
        }
    }
}

impl SyncConfig {
    /// Load from `$BUMPER_SYNC_CONFIG` or `config/sync.toml`, else defaults.
    pub fn load() -> Self {
        if let Ok(path) = std::env::var("BUMPER_SYNC_CONFIG")
            && let Some(config) = Self::from_file(&path)
        {
            return config;
        }
        Self::from_file("config/sync.toml").unwrap_or_default()
    }

    /// Parse one TOML file. Missing files and invalid TOML give `None`;
    /// the latter is logged.
    pub fn from_file(path: &str) -> Option<Self> {
        let contents = std::fs::read_to_string(path).ok()?;
        toml::from_str::<Self>(&contents)
            .inspect_err(|e| tracing::warn!(path, error = %e, "Ignoring invalid sync config"))
            .ok()
    }
}
