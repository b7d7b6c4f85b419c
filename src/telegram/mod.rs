//! Telegram bot integration: bot setup, handler tree, delivery coordinator

pub mod bot;
pub mod callback;
pub mod delivery;
pub mod handlers;
pub mod keyboard;

// Re-exports for convenience
pub use bot::{create_bot, setup_bot_commands, Command};
pub use callback::CallbackAction;
pub use handlers::{schema, HandlerDeps, HandlerError};
