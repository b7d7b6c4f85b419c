//! Core utilities: configuration, errors, logging, authorization, validation

pub mod auth;
pub mod config;
pub mod error;
pub mod logging;
pub mod validation;

pub use auth::{authorize, is_authorized, Principal};
pub use error::{AppError, AppResult};
pub use logging::init_logger;
