//! Session model and selection state machine
//!
//! A `Session` correlates one inbound URL with the button events that follow
//! it. State transitions are monotonic: a session never skips a required
//! selection and never leaves a terminal state.

pub mod registry;

pub use registry::SessionRegistry;

use std::time::Instant;

use teloxide::types::MessageId;
use url::Url;

use crate::core::auth::Principal;
use crate::core::error::{AppError, AppResult};
use crate::download::DownloadJob;

/// What the requester wants out of the link
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Video,
    Audio,
}

impl MediaKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaKind::Video => "video",
            MediaKind::Audio => "audio",
        }
    }
}

/// A discrete quality option offered to the requester
///
/// Video tiers are vertical resolutions, audio tiers are bitrates in kbps.
/// The set is closed; callback payloads referencing anything else are
/// rejected at the parse boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QualityTier {
    Video720,
    Video480,
    Video360,
    Audio192,
    Audio128,
    Audio64,
}

impl QualityTier {
    /// The media kind this tier belongs to
    pub fn kind(&self) -> MediaKind {
        match self {
            QualityTier::Video720 | QualityTier::Video480 | QualityTier::Video360 => MediaKind::Video,
            QualityTier::Audio192 | QualityTier::Audio128 | QualityTier::Audio64 => MediaKind::Audio,
        }
    }

    /// Numeric value of the tier (height in pixels or bitrate in kbps)
    pub fn value(&self) -> u32 {
        match self {
            QualityTier::Video720 => 720,
            QualityTier::Video480 => 480,
            QualityTier::Video360 => 360,
            QualityTier::Audio192 => 192,
            QualityTier::Audio128 => 128,
            QualityTier::Audio64 => 64,
        }
    }

    /// Button label shown to the requester
    pub fn label(&self) -> String {
        match self.kind() {
            MediaKind::Video => format!("{}p", self.value()),
            MediaKind::Audio => format!("{} kbps", self.value()),
        }
    }

    /// The three tiers offered for a media kind, best first
    pub fn offered_for(kind: MediaKind) -> [QualityTier; 3] {
        match kind {
            MediaKind::Video => [QualityTier::Video720, QualityTier::Video480, QualityTier::Video360],
            MediaKind::Audio => [QualityTier::Audio192, QualityTier::Audio128, QualityTier::Audio64],
        }
    }

    /// Resolves a tier from a kind and its numeric value, if it is one of
    /// the offered options
    pub fn from_kind_value(kind: MediaKind, value: u32) -> Option<QualityTier> {
        QualityTier::offered_for(kind).into_iter().find(|t| t.value() == value)
    }
}

/// Selection state machine states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Waiting for the video/audio choice
    AwaitingMediaType,
    /// Media kind chosen, waiting for the quality tier
    AwaitingQuality,
    /// Download job launched; further selection events are rejected
    Dispatched,
    Completed,
    Failed,
    Cancelled,
}

impl SessionState {
    /// Terminal states accept no further events
    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionState::Completed | SessionState::Failed | SessionState::Cancelled)
    }
}

/// Result of a cancel event against a live session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelOutcome {
    /// Session was still in selection and is now cancelled
    Cancelled,
    /// A download job is already in flight; it runs to completion
    AlreadyRunning,
}

/// One interactive download session, keyed by its token in the registry
#[derive(Debug, Clone)]
pub struct Session {
    pub token: String,
    pub url: Url,
    pub principal: Principal,
    pub state: SessionState,
    pub kind: Option<MediaKind>,
    pub tier: Option<QualityTier>,
    pub created_at: Instant,
    /// The selection-prompt message, deleted once it is no longer actionable
    pub prompt_message_id: Option<MessageId>,
}

impl Session {
    pub fn new(token: String, url: Url, principal: Principal) -> Self {
        Self {
            token,
            url,
            principal,
            state: SessionState::AwaitingMediaType,
            kind: None,
            tier: None,
            created_at: Instant::now(),
            prompt_message_id: None,
        }
    }

    /// Applies the media-kind choice: `AwaitingMediaType -> AwaitingQuality`
    ///
    /// Any other current state rejects the event with `SessionExpired` and
    /// leaves the session untouched.
    pub fn choose_kind(&mut self, kind: MediaKind) -> AppResult<()> {
        if self.state != SessionState::AwaitingMediaType {
            return Err(AppError::SessionExpired);
        }
        self.kind = Some(kind);
        self.state = SessionState::AwaitingQuality;
        Ok(())
    }

    /// Applies the quality choice: `AwaitingQuality -> Dispatched`
    ///
    /// The tier must belong to the previously chosen media kind; a mismatch
    /// or a wrong current state rejects with `SessionExpired` untouched.
    pub fn choose_tier(&mut self, tier: QualityTier) -> AppResult<()> {
        if self.state != SessionState::AwaitingQuality || self.kind != Some(tier.kind()) {
            return Err(AppError::SessionExpired);
        }
        self.tier = Some(tier);
        self.state = SessionState::Dispatched;
        Ok(())
    }

    /// Marks the session cancelled
    ///
    /// Allowed from any non-terminal, pre-dispatch state. Once a job is
    /// dispatched the in-flight download is not interruptible; the event is
    /// acknowledged as [`CancelOutcome::AlreadyRunning`] and the session is
    /// left untouched.
    pub fn cancel(&mut self) -> AppResult<CancelOutcome> {
        if self.state.is_terminal() {
            return Err(AppError::SessionExpired);
        }
        if self.state == SessionState::Dispatched {
            return Ok(CancelOutcome::AlreadyRunning);
        }
        self.state = SessionState::Cancelled;
        Ok(CancelOutcome::Cancelled)
    }

    /// Builds the ephemeral job value for the execution engine
    ///
    /// Only valid once the session is dispatched.
    pub fn to_job(&self, max_bytes: u64) -> AppResult<DownloadJob> {
        match (self.state, self.kind, self.tier) {
            (SessionState::Dispatched, Some(kind), Some(tier)) => Ok(DownloadJob {
                token: self.token.clone(),
                url: self.url.clone(),
                kind,
                tier,
                max_bytes,
            }),
            _ => Err(AppError::SessionExpired),
        }
    }
}
