use once_cell::sync::Lazy;
use std::env;
use std::time::Duration;

/// Configuration constants for the bot

/// Cached yt-dlp binary path
/// Read once at startup from YTDL_BIN environment variable or defaults to "yt-dlp"
pub static YTDL_BIN: Lazy<String> = Lazy::new(|| env::var("YTDL_BIN").unwrap_or_else(|_| "yt-dlp".to_string()));

/// Sticker shown as a progress placeholder while a download job runs
/// Read from STICKER_ID environment variable; when unset a plain text
/// placeholder message is used instead
pub static STICKER_ID: Lazy<Option<String>> = Lazy::new(|| env::var("STICKER_ID").ok().filter(|s| !s.is_empty()));

/// Authorized user IDs, comma-separated in the SUDO_USERS environment variable
pub static SUDO_USERS: Lazy<Vec<u64>> = Lazy::new(|| parse_id_list(&env::var("SUDO_USERS").unwrap_or_default()));

/// Authorized group chat IDs, comma-separated in the SUDO_GROUPS environment variable
/// Group IDs are negative in the Bot API, hence i64
pub static SUDO_GROUPS: Lazy<Vec<i64>> = Lazy::new(|| parse_id_list(&env::var("SUDO_GROUPS").unwrap_or_default()));

/// Hard ceiling on artifact size in bytes
/// Read from MAX_FILE_SIZE_BYTES, defaults to 500 MiB
pub static MAX_FILE_SIZE_BYTES: Lazy<u64> = Lazy::new(|| {
    env::var("MAX_FILE_SIZE_BYTES")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(500 * 1024 * 1024)
});

/// Log file path for the combined console + file logger
pub static LOG_FILE_PATH: Lazy<String> = Lazy::new(|| env::var("LOG_FILE").unwrap_or_else(|_| "fetchka.log".to_string()));

fn parse_id_list<T: std::str::FromStr>(raw: &str) -> Vec<T> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .filter_map(|s| s.parse().ok())
        .collect()
}

/// Session lifetime configuration
pub mod session {
    use super::{env, Duration, Lazy};

    /// Seconds an unfinished selection may sit in the registry before the
    /// background sweep removes it. Read from SESSION_TTL_SECS, default 15 minutes.
    pub static TTL_SECS: Lazy<u64> = Lazy::new(|| {
        env::var("SESSION_TTL_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(900)
    });

    /// Interval between sweep passes (in seconds)
    pub const SWEEP_INTERVAL_SECS: u64 = 60;

    /// Session time-to-live duration
    pub fn ttl() -> Duration {
        Duration::from_secs(*TTL_SECS)
    }

    /// Sweep interval duration
    pub fn sweep_interval() -> Duration {
        Duration::from_secs(SWEEP_INTERVAL_SECS)
    }
}

/// Network configuration
pub mod network {
    use super::Duration;

    /// Request timeout for HTTP requests (in seconds)
    /// Generous because artifact uploads of hundreds of megabytes go
    /// through the same client
    pub const REQUEST_TIMEOUT_SECS: u64 = 900; // 15 minutes

    /// Request timeout duration
    pub fn timeout() -> Duration {
        Duration::from_secs(REQUEST_TIMEOUT_SECS)
    }
}

/// Download configuration
pub mod download {
    /// Maximum characters kept from an extracted title when naming the
    /// output file; keeps filenames under filesystem and Bot API limits
    pub const TITLE_MAX_CHARS: usize = 64;

    /// Length of generated session tokens
    pub const TOKEN_LEN: usize = 12;
}
