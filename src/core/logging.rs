//! Logging initialization
//!
//! Console + file logger used by the bot binary. Library code logs through
//! the `log` macro facade and stays agnostic of the backend.

use anyhow::Result;
use simplelog::*;
use std::fs::File;

/// Initialize logger for both console and file output
///
/// # Arguments
/// * `log_file_path` - Path to the log file
///
/// # Returns
/// * `Ok(())` - Logger initialized successfully
/// * `Err(anyhow::Error)` - Failed to initialize logger
pub fn init_logger(log_file_path: &str) -> Result<()> {
    let log_file = File::create(log_file_path).map_err(|e| anyhow::anyhow!("Failed to create log file: {}", e))?;

    CombinedLogger::init(vec![
        TermLogger::new(
            LevelFilter::Info,
            Config::default(),
            TerminalMode::Mixed,
            ColorChoice::Auto,
        ),
        WriteLogger::new(LevelFilter::Info, Config::default(), log_file),
    ])
    .map_err(|e| anyhow::anyhow!("Failed to initialize logger: {}", e))?;

    Ok(())
}

/// Logs the allow-list configuration at startup
///
/// The bot silently ignores everyone who is not listed, so an empty
/// allow-list means it answers nobody; that is worth a loud warning.
pub fn log_auth_configuration() {
    use crate::core::config;

    log::info!(
        "Authorized users: {}, authorized groups: {}",
        config::SUDO_USERS.len(),
        config::SUDO_GROUPS.len()
    );

    if config::SUDO_USERS.is_empty() && config::SUDO_GROUPS.is_empty() {
        log::warn!("SUDO_USERS and SUDO_GROUPS are both empty - the bot will ignore every message");
    }

    if config::STICKER_ID.is_none() {
        log::info!("STICKER_ID not set - using a text placeholder while downloads run");
    }

    log::info!("Artifact size ceiling: {} bytes", *config::MAX_FILE_SIZE_BYTES);
}
