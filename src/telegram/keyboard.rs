//! Inline keyboards for the selection prompts

use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup};

use crate::session::{MediaKind, QualityTier};
use crate::telegram::callback::CallbackAction;

/// Keyboard for the media-type prompt: Video / Audio, plus Cancel
pub fn media_kind_keyboard(token: &str) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![
        vec![
            InlineKeyboardButton::callback("Video", CallbackAction::Media(MediaKind::Video).encode(token)),
            InlineKeyboardButton::callback("Audio", CallbackAction::Media(MediaKind::Audio).encode(token)),
        ],
        vec![InlineKeyboardButton::callback("Cancel", CallbackAction::Cancel.encode(token))],
    ])
}

/// Keyboard for the quality prompt: the three tiers for `kind`, plus Cancel
pub fn quality_keyboard(kind: MediaKind, token: &str) -> InlineKeyboardMarkup {
    let tiers = QualityTier::offered_for(kind)
        .into_iter()
        .map(|tier| InlineKeyboardButton::callback(tier.label(), CallbackAction::Quality(tier).encode(token)))
        .collect::<Vec<_>>();

    InlineKeyboardMarkup::new(vec![
        tiers,
        vec![InlineKeyboardButton::callback("Cancel", CallbackAction::Cancel.encode(token))],
    ])
}
