use anyhow::Result;
use dotenvy::dotenv;
use std::sync::Arc;
use teloxide::prelude::*;

use fetchka::core::logging::{self, init_logger};
use fetchka::core::config;
use fetchka::session::SessionRegistry;
use fetchka::telegram::{create_bot, schema, setup_bot_commands, HandlerDeps};

/// Main entry point for the bot
///
/// # Errors
/// Returns an error if initialization fails (logging, bot creation).
#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env if present
    let _ = dotenv();

    // Initialize logger (console + file)
    init_logger(&config::LOG_FILE_PATH)?;
    logging::log_auth_configuration();

    log::info!("Starting bot...");
    let bot = create_bot()?;

    let me = bot.get_me().await?;
    log::info!("Bot username: @{}", me.user.username.as_deref().unwrap_or("<unknown>"));

    setup_bot_commands(&bot).await?;

    let registry = Arc::new(SessionRegistry::new());
    // Background sweep removes selections nobody ever finished
    let _sweep_handle = Arc::clone(&registry).spawn_sweep_task();

    let deps = HandlerDeps::new(registry);

    Dispatcher::builder(bot, schema(deps))
        .dependencies(DependencyMap::new())
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    log::info!("Dispatcher shutdown gracefully");
    Ok(())
}
