//! Bot instance creation and command setup

use reqwest::ClientBuilder;
use teloxide::prelude::*;
use teloxide::utils::command::BotCommands;

use crate::core::config;

/// Bot commands enum with descriptions
#[derive(BotCommands, Clone, Debug)]
#[command(rename_rule = "lowercase", description = "I can:")]
pub enum Command {
    #[command(description = "show the welcome message")]
    Start,
}

/// Creates a Bot instance with a long-timeout HTTP client
///
/// The token comes from the TELEGRAM_BOT_TOKEN environment variable (the
/// standard teloxide lookup). The client timeout is generous because
/// artifact uploads of hundreds of megabytes go through it.
///
/// # Returns
/// * `Ok(Bot)` - Successfully created bot instance
/// * `Err(anyhow::Error)` - Failed to build the HTTP client
pub fn create_bot() -> anyhow::Result<Bot> {
    let client = ClientBuilder::new().timeout(config::network::timeout()).build()?;
    Ok(Bot::from_env_with_client(client))
}

/// Sets up bot commands in the Telegram UI
///
/// # Arguments
/// * `bot` - Bot instance to configure
///
/// # Returns
/// * `Ok(())` - Commands set successfully
/// * `Err(RequestError)` - Failed to set commands
pub async fn setup_bot_commands(bot: &Bot) -> Result<(), teloxide::RequestError> {
    use teloxide::types::BotCommand;

    bot.set_my_commands(vec![BotCommand::new("start", "show the welcome message")])
        .await?;

    Ok(())
}
