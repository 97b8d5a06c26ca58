use serde::Deserialize;

/// Top-level server configuration, loaded from `bumper.toml`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub listen_addr: String,
    pub limits: LimitsConfig,
    pub matches: MatchesConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:8080".to_string(),
            limits: LimitsConfig::default(),
            matches: MatchesConfig::default(),
        }
    }
}

/// Infrastructure limits (connection caps, buffer sizes, rate limits).
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    pub max_ws_connections: usize,
    pub player_message_buffer: usize,
    pub ws_rate_limit_per_sec: f64,
    /// Ended match ids remembered so late joins are told the match is gone.
    pub max_ended_matches: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_ws_connections: 200,
            player_message_buffer: 256,
            ws_rate_limit_per_sec: 50.0,
            max_ended_matches: 1024,
        }
    }
}

/// Match lifecycle configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MatchesConfig {
    pub tick_rate_hz: f32,
    /// How long a dropped player has to come back before forfeiting.
    pub pause_timeout_secs: u64,
    pub win_score: u8,
}

impl Default for MatchesConfig {
    fn default() -> Self {
        Self {
            tick_rate_hz: 60.0,
            pause_timeout_secs: 30,
            win_score: 5,
        }
    }
}

impl ServerConfig {
    /// Validate configuration, exiting on values the server cannot run with.
    pub fn validate(&self) {
        if self.listen_addr.parse::<std::net::SocketAddr>().is_err() {
            tracing::error!(
                addr = %self.listen_addr,
                "listen_addr is not a valid socket address"
            );
            std::process::exit(1);
        }
        if self.limits.max_ws_connections == 0 {
            tracing::error!("limits.max_ws_connections must be > 0");
            std::process::exit(1);
        }
        if self.limits.player_message_buffer == 0 {
            tracing::error!("limits.player_message_buffer must be > 0");
            std::process::exit(1);
        }
        if self.limits.ws_rate_limit_per_sec <= 0.0 {
            tracing::error!("limits.ws_rate_limit_per_sec must be > 0");
            std::process::exit(1);
        }
        if self.limits.max_ended_matches == 0 {
            tracing::warn!("limits.max_ended_matches is 0; late joins will recreate ended matches");
        }
        if !(self.matches.tick_rate_hz > 0.0 && self.matches.tick_rate_hz <= 240.0) {
            tracing::error!(
                tick_rate_hz = self.matches.tick_rate_hz,
                "matches.tick_rate_hz must be in (0, 240]"
            );
            std::process::exit(1);
        }
        if self.matches.win_score == 0 {
            tracing::error!("matches.win_score must be > 0");
            std::process::exit(1);
        }
    }

    /// Load config from `bumper.toml` if it exists, then apply env var overrides.
    pub fn load() -> Self {
        let mut config = match std::fs::read_to_string("bumper.toml") {
            Ok(content) => match toml::from_str::<ServerConfig>(&content) {
                Ok(cfg) => {
                    tracing::info!("Loaded configuration from bumper.toml");
                    cfg
                },
                Err(e) => {
                    tracing::warn!("Failed to parse bumper.toml: {e}, using defaults");
                    ServerConfig::default()
                },
            },
            Err(_) => {
                tracing::info!("No bumper.toml found, using defaults");
                ServerConfig::default()
            },
        };

        if let Ok(addr) = std::env::var("BUMPER_LISTEN_ADDR")
            && !addr.is_empty()
        {
            config.listen_addr = addr;
        }
        if let Ok(val) = std::env::var("BUMPER_MAX_WS_CONNECTIONS")
            && let Ok(n) = val.parse::<usize>()
        {
            config.limits.max_ws_connections = n;
        }
        if let Ok(val) = std::env::var("BUMPER_WS_RATE_LIMIT")
            && let Ok(n) = val.parse::<f64>()
        {
            config.limits.ws_rate_limit_per_sec = n;
        }
        if let Ok(val) = std::env::var("BUMPER_PAUSE_TIMEOUT_SECS")
            && let Ok(n) = val.parse::<u64>()
        {
            config.matches.pause_timeout_secs = n;
        }
        if let Ok(val) = std::env::var("BUMPER_WIN_SCORE")
            && let Ok(n) = val.parse::<u8>()
        {
            config.matches.win_score = n;
        }

        config
    }
}
