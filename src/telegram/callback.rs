//! Callback payload grammar
//!
//! Button payloads are ASCII strings of the form `<action>|<token>` with
//! action one of `video`, `audio`, `cancel`, `video_<height>`,
//! `audio_<bitrate>`. The grammar is parsed exactly once, here, into a
//! tagged [`CallbackAction`]; everything malformed is `SessionExpired` so
//! stale or hand-crafted payloads get the same reply as a forgotten token.

use crate::core::error::{AppError, AppResult};
use crate::session::{MediaKind, QualityTier};

/// A parsed button press
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackAction {
    /// video/audio choice while awaiting the media type
    Media(MediaKind),
    /// Quality tier choice while awaiting the quality
    Quality(QualityTier),
    Cancel,
}

impl CallbackAction {
    /// Renders the action half of a payload
    pub fn key(&self) -> String {
        match self {
            CallbackAction::Media(kind) => kind.as_str().to_string(),
            CallbackAction::Quality(tier) => format!("{}_{}", tier.kind().as_str(), tier.value()),
            CallbackAction::Cancel => "cancel".to_string(),
        }
    }

    /// Renders the full `<action>|<token>` payload for a keyboard button
    pub fn encode(&self, token: &str) -> String {
        format!("{}|{}", self.key(), token)
    }
}

/// Parses a raw callback payload into an action and its token
///
/// # Returns
/// * `Ok((action, token))` - well-formed payload
/// * `Err(AppError::SessionExpired)` - anything else: non-ASCII data,
///   missing separator, empty token, unknown action, or a tier outside the
///   offered set
pub fn parse(data: &str) -> AppResult<(CallbackAction, &str)> {
    if !data.is_ascii() {
        return Err(AppError::SessionExpired);
    }

    let (action, token) = data.split_once('|').ok_or(AppError::SessionExpired)?;
    if token.is_empty() || token.contains('|') {
        return Err(AppError::SessionExpired);
    }

    let action = match action {
        "video" => CallbackAction::Media(MediaKind::Video),
        "audio" => CallbackAction::Media(MediaKind::Audio),
        "cancel" => CallbackAction::Cancel,
        other => {
            let (kind, value) = other.split_once('_').ok_or(AppError::SessionExpired)?;
            let kind = match kind {
                "video" => MediaKind::Video,
                "audio" => MediaKind::Audio,
                _ => return Err(AppError::SessionExpired),
            };
            let value: u32 = value.parse().map_err(|_| AppError::SessionExpired)?;
            let tier = QualityTier::from_kind_value(kind, value).ok_or(AppError::SessionExpired)?;
            CallbackAction::Quality(tier)
        }
    };

    Ok((action, token))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parses_media_choices() {
        assert_eq!(parse("video|tok1").unwrap(), (CallbackAction::Media(MediaKind::Video), "tok1"));
        assert_eq!(parse("audio|tok1").unwrap(), (CallbackAction::Media(MediaKind::Audio), "tok1"));
    }

    #[test]
    fn parses_quality_choices() {
        assert_eq!(
            parse("video_720|abc").unwrap(),
            (CallbackAction::Quality(QualityTier::Video720), "abc")
        );
        assert_eq!(
            parse("audio_64|abc").unwrap(),
            (CallbackAction::Quality(QualityTier::Audio64), "abc")
        );
    }

    #[test]
    fn parses_cancel() {
        assert_eq!(parse("cancel|xyz").unwrap(), (CallbackAction::Cancel, "xyz"));
    }

    #[test]
    fn rejects_malformed_payloads() {
        for bad in [
            "",
            "video",
            "video|",
            "|tok",
            "video_1080|tok",
            "audio_720|tok",
            "video_abc|tok",
            "dance|tok",
            "video|a|b",
            "vidéo|tok",
        ] {
            assert!(matches!(parse(bad), Err(AppError::SessionExpired)), "accepted {:?}", bad);
        }
    }

    #[test]
    fn encode_parse_agree_for_every_offered_tier() {
        for kind in [MediaKind::Video, MediaKind::Audio] {
            for tier in QualityTier::offered_for(kind) {
                let payload = CallbackAction::Quality(tier).encode("tok");
                assert_eq!(parse(&payload).unwrap(), (CallbackAction::Quality(tier), "tok"));
            }
        }
    }
}
