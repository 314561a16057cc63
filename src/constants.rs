//! Application-wide constants and defaults
//!
//! Centralizes the tunable values so config defaults and tests agree.

use std::time::Duration;

/// Duplicate-signal suppression
pub mod dedup {
    /// Identical signals arriving within this many seconds of the last
    /// admission are dropped.
    pub const DEFAULT_WINDOW_SECS: u64 = 5;

    /// Number of admitted signals remembered at once.
    pub const DEFAULT_SLOTS: usize = 1;
}

/// HTTP server
pub mod server {
    pub const DEFAULT_HOST: &str = "0.0.0.0";
    pub const DEFAULT_PORT: u16 = 10000;
}

/// Completion API
pub mod llm {
    pub const DEFAULT_MODEL: &str = "gpt-4o";
    pub const DEFAULT_TIMEOUT_SECS: u64 = 60;
}

/// Telegram Bot API
pub mod telegram {
    use super::*;

    pub const DEFAULT_API_BASE: &str = "https://api.telegram.org";

    /// Hard limit for a single sendMessage text.
    pub const MESSAGE_MAX_CHARS: usize = 4096;

    pub const PARSE_MODE: &str = "Markdown";

    pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
}

/// Self-ping used to keep free-tier hosts awake
pub mod keep_alive {
    use super::*;

    /// Every 10 minutes (sec min hour dom mon dow)
    pub const DEFAULT_CRON: &str = "0 */10 * * * *";

    pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
}

/// Response status strings
pub mod status {
    pub const RELAYED: &str = "relayed";
    pub const IGNORED: &str = "ignored";
    pub const ERROR: &str = "error";
    pub const OK: &str = "ok";

    pub const DUPLICATE_REASON: &str = "duplicate signal";
}
