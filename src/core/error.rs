use thiserror::Error;

/// Centralized error types for the application
///
/// All errors in the dispatcher are converted to this enum for consistent
/// handling. Uses `thiserror` for automatic conversion and display formatting.
#[derive(Error, Debug)]
pub enum AppError {
    /// The inbound text did not match the URL grammar; no session is created
    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    /// Principal is not on the allow-list; the event is silently dropped
    #[error("unauthorized principal")]
    Unauthorized,

    /// Token is unknown, malformed or refers to a finished session
    #[error("session expired or unknown")]
    SessionExpired,

    /// The stream or extracted artifact exceeds the configured byte ceiling
    #[error("artifact exceeds the {limit} byte size limit")]
    SizeLimitExceeded { limit: u64 },

    /// yt-dlp could not resolve or download a matching stream
    #[error("extraction failed: {0}")]
    Extraction(String),

    /// Transport error while talking to Telegram, including artifact uploads
    #[error("delivery failed: {0}")]
    DeliverySend(#[from] teloxide::RequestError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// URL parsing errors
    #[error("URL parsing error: {0}")]
    Url(#[from] url::ParseError),
}

/// Type alias for Result with AppError
pub type AppResult<T> = Result<T, AppError>;
