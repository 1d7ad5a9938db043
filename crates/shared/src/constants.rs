pub const APP_NAME: &str = "MakerLink";

// Limits
pub const MAX_MESSAGE_LENGTH: usize = 4000;
pub const MAX_EMOJI_LENGTH: usize = 32;

pub const MESSAGE_PAGE_SIZE: i64 = 50;
pub const MAX_MESSAGE_PAGE_SIZE: i64 = 100;

// Request tier -> broker bridge
pub const BRIDGE_TIMEOUT_MS: u64 = 2_000;

// Rate limiting (messages per window)
pub const RATE_LIMIT_WINDOW_SECS: u64 = 60;
pub const RATE_LIMIT_MAX_MESSAGES: usize = 30;

// WebSocket client runtime
pub const WS_RECONNECT_BASE_DELAY_MS: u64 = 500;
pub const WS_RECONNECT_MAX_DELAY_MS: u64 = 10_000;
