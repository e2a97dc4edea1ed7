//! Configuration module - environment variable parsing

use std::env;
use std::net::SocketAddr;
use std::str::FromStr;

/// Application configuration loaded from environment variables
#[derive(Clone, Debug)]
pub struct Config {
    /// Server binding address
    pub server_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Emit logs as JSON lines instead of human readable text
    pub log_json: bool,
    /// Allowed client origins for CORS (comma-separated)
    pub client_origin: String,

    /// Keep progress in memory only (no Supabase)
    pub offline_mode: bool,
    /// Supabase project URL
    pub supabase_url: Option<String>,
    /// Supabase service role key (bypasses RLS - server only!)
    pub supabase_service_role_key: Option<String>,
    /// Secret for HS256 bearer tokens; guests only when unset
    pub jwt_secret: Option<String>,

    /// Simulation tuning
    pub game: GameConfig,
}

/// Gameplay tuning that operators may override per deployment
#[derive(Clone, Debug)]
pub struct GameConfig {
    /// Size of the idle bot pool kept alive for backfill
    pub bot_count: usize,
    /// Countdown phase length (ms)
    pub countdown_ms: u64,
    /// Active phase length (ms)
    pub match_length_ms: u64,
    /// Maximum ships in a match roster (humans + bots)
    pub roster_size: usize,
    /// Minimum ships needed to start a match
    pub min_players_to_start: usize,
    /// Largest RP spread accepted for a ranked group
    pub ranked_max_rp_gap: i64,
    /// Normal matches required before ranked queue is unlocked
    pub ranked_min_normal_matches: u32,
    /// RP removed when a player forfeits a ranked match
    pub ranked_forfeit_penalty: i64,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            bot_count: 19,
            countdown_ms: 30_000,
            match_length_ms: 5 * 60_000,
            roster_size: 10,
            min_players_to_start: 2,
            ranked_max_rp_gap: 400,
            ranked_min_normal_matches: 5,
            ranked_forfeit_penalty: 75,
        }
    }
}

impl GameConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        Ok(Self {
            bot_count: parse_or("BOT_COUNT", defaults.bot_count)?,
            countdown_ms: parse_or("MATCH_COUNTDOWN_SECS", defaults.countdown_ms / 1000)? * 1000,
            match_length_ms: parse_or("MATCH_LENGTH_SECS", defaults.match_length_ms / 1000)?
                * 1000,
            roster_size: parse_or("ROSTER_SIZE", defaults.roster_size)?,
            min_players_to_start: parse_or("MIN_PLAYERS_TO_START", defaults.min_players_to_start)?,
            ranked_max_rp_gap: parse_or("RANKED_MAX_RP_GAP", defaults.ranked_max_rp_gap)?,
            ranked_min_normal_matches: parse_or(
                "RANKED_MIN_NORMAL_MATCHES",
                defaults.ranked_min_normal_matches,
            )?,
            ranked_forfeit_penalty: parse_or(
                "RANKED_FORFEIT_PENALTY",
                defaults.ranked_forfeit_penalty,
            )?,
        })
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        // Hosting platforms provide PORT, fall back to SERVER_ADDR or default
        let server_addr = if let Ok(port) = env::var("PORT") {
            format!("0.0.0.0:{}", port)
        } else {
            env::var("SERVER_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string())
        };

        let supabase_url = non_empty("SUPABASE_URL");
        let supabase_service_role_key = non_empty("SUPABASE_SERVICE_ROLE_KEY");

        // Offline unless explicitly disabled
        let offline_flag = env::var("OFFLINE_MODE")
            .map(|v| v.trim().eq_ignore_ascii_case("true"))
            .unwrap_or(true);

        if !offline_flag && (supabase_url.is_none() || supabase_service_role_key.is_none()) {
            return Err(ConfigError::Missing("SUPABASE_URL / SUPABASE_SERVICE_ROLE_KEY"));
        }

        Ok(Self {
            server_addr: server_addr
                .parse()
                .map_err(|_| ConfigError::InvalidAddress)?,

            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            log_json: env::var("LOG_FORMAT")
                .map(|v| v.eq_ignore_ascii_case("json"))
                .unwrap_or(false),
            client_origin: env::var("CLIENT_ORIGIN")
                .unwrap_or_else(|_| "http://localhost:3000".to_string()),

            offline_mode: offline_flag,
            supabase_url,
            supabase_service_role_key,
            jwt_secret: non_empty("JWT_SECRET"),

            game: GameConfig::from_env()?,
        })
    }
}

fn non_empty(key: &'static str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_or<T: FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    match non_empty(key) {
        Some(raw) => raw.parse().map_err(|_| ConfigError::Invalid(key)),
        None => Ok(default),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for environment variable: {0}")]
    Invalid(&'static str),

    #[error("Invalid server address format")]
    InvalidAddress,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_game_defaults() {
        let game = GameConfig::default();
        assert_eq!(game.roster_size, 10);
        assert_eq!(game.min_players_to_start, 2);
        assert_eq!(game.ranked_min_normal_matches, 5);
        assert_eq!(game.ranked_forfeit_penalty, 75);
        assert_eq!(game.countdown_ms, 30_000);
        assert_eq!(game.match_length_ms, 300_000);
    }
}
