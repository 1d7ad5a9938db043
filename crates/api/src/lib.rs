pub mod bridge;
pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod ratelimit;
pub mod routes;

use bridge::DeliveryBridge;
use config::Config;
use ratelimit::RateLimiter;
use std::time::Duration;

pub struct AppState {
    pub db: sqlx::SqlitePool,
    pub config: Config,
    pub bridge: DeliveryBridge,
    pub rate_limiter: RateLimiter,
}

impl AppState {
    pub fn new(db: sqlx::SqlitePool, config: Config) -> Self {
        let bridge = DeliveryBridge::new(&config.broker_url, config.bridge_timeout_ms);
        let rate_limiter = RateLimiter::new(
            Duration::from_secs(config.rate_limit_window_secs),
            config.rate_limit_max_messages,
        );
        Self {
            db,
            config,
            bridge,
            rate_limiter,
        }
    }
}
