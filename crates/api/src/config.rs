use makerlink_shared::constants;
use std::env;

#[derive(Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub database_path: String,
    /// Base URL of the realtime broker, e.g. `http://127.0.0.1:4001`.
    pub broker_url: String,
    pub bridge_timeout_ms: u64,
    pub rate_limit_window_secs: u64,
    pub rate_limit_max_messages: usize,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            port: env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(4000),
            database_path: env::var("DATABASE_PATH").unwrap_or_else(|_| "./makerlink.db".into()),
            broker_url: env::var("BROKER_URL")
                .unwrap_or_else(|_| "http://127.0.0.1:4001".into()),
            bridge_timeout_ms: env::var("BRIDGE_TIMEOUT_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(constants::BRIDGE_TIMEOUT_MS),
            rate_limit_window_secs: env::var("RATE_LIMIT_WINDOW_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(constants::RATE_LIMIT_WINDOW_SECS),
            rate_limit_max_messages: env::var("RATE_LIMIT_MAX_MESSAGES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(constants::RATE_LIMIT_MAX_MESSAGES),
        }
    }
}
