//! Fetchka - Telegram bot for downloading video and audio from a link
//!
//! The bot accepts a media URL from an allow-listed operator, walks the
//! requester through media-type and quality selection via inline keyboards,
//! runs a size-capped yt-dlp job in a scoped temporary workspace and sends
//! the result back, cleaning up UI placeholders and session state on every
//! exit path.
//!
//! # Module Structure
//!
//! - `core`: configuration, errors, logging, authorization and validation
//! - `session`: the token-keyed session registry and selection state machine
//! - `download`: yt-dlp execution engine and job types
//! - `telegram`: bot integration, handler tree and delivery coordinator

pub mod core;
pub mod download;
pub mod session;
pub mod telegram;

// Re-export commonly used types for convenience
pub use crate::core::error::{AppError, AppResult};
pub use crate::session::{MediaKind, QualityTier, Session, SessionRegistry, SessionState};
pub use crate::telegram::{create_bot, schema, HandlerDeps};
