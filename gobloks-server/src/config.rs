//! Game and server configuration

use gobloks_core::MAX_DEGREE;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Most seats a single game can have
pub const MAX_PLAYERS: u16 = 16;

/// Largest board tightening factor accepted
const MAX_DENSITY: f64 = 4.0;

/// Longest per-player clock, and longest per-move bonus
pub const MAX_TIME_CONTROL_SECONDS: u64 = 7 * 24 * 60 * 60;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("players must be between 1 and {MAX_PLAYERS}, got {0}")]
    Players(u16),
    #[error("block degree must be between 1 and {MAX_DEGREE}, got {0}")]
    BlockDegree(usize),
    #[error("density must be in (0, {MAX_DENSITY}], got {0}")]
    Density(f64),
    #[error("time control must be at most {MAX_TIME_CONTROL_SECONDS} seconds, got {0}")]
    TimeControl(u64),
    #[error("time bonus must be at most {MAX_TIME_CONTROL_SECONDS} seconds, got {0}")]
    TimeBonus(u64),
}

/// Settings chosen by whoever creates a game
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GameConfig {
    pub players: u16,
    /// Largest piece size handed out
    pub block_degree: usize,
    /// Fraction of the board the full piece sets would cover
    pub density: f64,
    pub turn_based: bool,
    /// Per-player clock budget; zero disables time control
    pub time_control_seconds: u64,
    /// Credited back on every move
    pub time_bonus_seconds: u64,
    pub hints: u32,
    /// Listed in the lobby
    pub public: bool,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            players: 4,
            block_degree: 5,
            density: 1.0,
            turn_based: true,
            time_control_seconds: 0,
            time_bonus_seconds: 0,
            hints: 0,
            public: true,
        }
    }
}

impl GameConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.players == 0 || self.players > MAX_PLAYERS {
            return Err(ConfigError::Players(self.players));
        }
        if self.block_degree == 0 || self.block_degree > MAX_DEGREE {
            return Err(ConfigError::BlockDegree(self.block_degree));
        }
        if !self.density.is_finite() || self.density <= 0.0 || self.density > MAX_DENSITY {
            return Err(ConfigError::Density(self.density));
        }
        if self.time_control_seconds > MAX_TIME_CONTROL_SECONDS {
            return Err(ConfigError::TimeControl(self.time_control_seconds));
        }
        if self.time_bonus_seconds > MAX_TIME_CONTROL_SECONDS {
            return Err(ConfigError::TimeBonus(self.time_bonus_seconds));
        }
        Ok(())
    }

    pub fn is_timed(&self) -> bool {
        self.time_control_seconds > 0
    }

    pub fn time_control(&self) -> Duration {
        Duration::from_secs(self.time_control_seconds)
    }

    pub fn time_bonus(&self) -> Duration {
        Duration::from_secs(self.time_bonus_seconds)
    }

    /// Idle time after which the game is swept
    pub fn stale_after(&self) -> Duration {
        if self.is_timed() {
            let secs = (5 * u64::from(self.players)).saturating_mul(self.time_control_seconds);
            Duration::from_secs(secs)
        } else {
            Duration::from_secs(7 * 24 * 60 * 60)
        }
    }
}

/// Server configuration
#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub static_dir: String,
    /// How long a disconnected player keeps their seat
    pub disconnect_grace_ms: u64,
    pub stale_sweep_secs: u64,
    /// Disables permissive CORS
    pub production: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            static_dir: "client/dist".to_string(),
            disconnect_grace_ms: 15_000,
            stale_sweep_secs: 300,
            production: false,
        }
    }
}

impl ServerConfig {
    /// Defaults overridden by `GOBLOKS_*` environment variables
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(host) = std::env::var("GOBLOKS_HOST") {
            config.host = host;
        }
        if let Some(port) = env_parse("GOBLOKS_PORT") {
            config.port = port;
        }
        if let Ok(dir) = std::env::var("GOBLOKS_STATIC_DIR") {
            config.static_dir = dir;
        }
        if let Some(ms) = env_parse("GOBLOKS_GRACE_MS") {
            config.disconnect_grace_ms = ms;
        }
        if let Some(secs) = env_parse("GOBLOKS_SWEEP_SECS") {
            config.stale_sweep_secs = secs;
        }
        if let Some(production) = env_parse("GOBLOKS_PRODUCTION") {
            config.production = production;
        }
        config
    }

    pub fn disconnect_grace(&self) -> Duration {
        Duration::from_millis(self.disconnect_grace_ms)
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    let raw = std::env::var(key).ok()?;
    match raw.parse() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!(key, value = %raw, "ignoring unparseable environment variable");
            None
        }
    }
}
