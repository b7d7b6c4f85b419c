//! Delivery and cleanup coordinator
//!
//! One spawned task per dispatched job: show the placeholder, retire the
//! selection prompt, run the engine, send the artifact (or the right error
//! message), then release everything the job held - placeholder message,
//! temporary workspace, session record. Cleanup runs on every path,
//! including delivery failure.

use std::sync::Arc;

use teloxide::prelude::*;
use teloxide::types::{FileId, InputFile, MessageId};

use crate::core::config;
use crate::core::error::{AppError, AppResult};
use crate::download::{self, Artifact, DownloadJob};
use crate::session::{MediaKind, SessionRegistry, SessionState};

const DELIVERY_FAILED_TEXT: &str =
    "The download finished but sending the file to Telegram failed. Please try again.";
const EXTRACTION_FAILED_TEXT: &str = "Sorry! Download failed. Please try another source.";
const PLACEHOLDER_TEXT: &str = "Downloading…";

/// Spawns the background task for one dispatched job
///
/// The event-handling path never blocks on this; the task owns the job to
/// completion and reports back to the chat itself.
pub fn spawn_job(
    bot: Bot,
    registry: Arc<SessionRegistry>,
    chat_id: ChatId,
    prompt_id: MessageId,
    job: DownloadJob,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        run_job(&bot, &registry, chat_id, prompt_id, job).await;
    })
}

/// Runs one job to completion and tears down its resources
async fn run_job(bot: &Bot, registry: &Arc<SessionRegistry>, chat_id: ChatId, prompt_id: MessageId, job: DownloadJob) {
    let placeholder_id = send_placeholder(bot, chat_id).await;
    remove_prompt(bot, chat_id, prompt_id).await;

    let outcome = match download::execute(&job).await {
        Ok(artifact) => {
            let sent = deliver(bot, chat_id, &artifact).await;
            if sent.is_ok() {
                log::info!("Delivered {} ({} bytes) for session {}", artifact.title, artifact.size_bytes, job.token);
            }
            sent
        }
        Err(e) => Err(e),
    };
    if let Err(e) = &outcome {
        log::warn!("Job for session {} failed: {}", job.token, e);
    }

    let report = report_for(&outcome);
    if let Some(text) = report.message {
        send_best_effort(bot, chat_id, text).await;
    }

    // Unconditional teardown: placeholder message and session record.
    // The workspace went away when the Artifact (or the engine error path)
    // dropped it.
    if let Some(id) = placeholder_id {
        if let Err(e) = bot.delete_message(chat_id, id).await {
            log::warn!("Failed to delete placeholder message: {}", e);
        }
    }
    finish_session(registry, &job.token, report.state);
}

/// Final session state and requester-facing message for one finished job
#[derive(Debug)]
pub(crate) struct JobReport {
    pub state: SessionState,
    pub message: Option<String>,
}

/// Translates a job's outcome into its report
///
/// A delivery failure is kept distinct from an extraction failure: the
/// artifact existed, so the requester is told to retry rather than to try
/// another source.
pub(crate) fn report_for(outcome: &AppResult<()>) -> JobReport {
    match outcome {
        Ok(()) => JobReport {
            state: SessionState::Completed,
            message: None,
        },
        Err(AppError::DeliverySend(_)) => JobReport {
            state: SessionState::Failed,
            message: Some(DELIVERY_FAILED_TEXT.to_string()),
        },
        Err(AppError::SizeLimitExceeded { limit }) => {
            let mib = limit / (1024 * 1024);
            JobReport {
                state: SessionState::Failed,
                message: Some(format!(
                    "The file exceeds the {} MB limit. Please pick a lower quality or another source.",
                    mib
                )),
            }
        }
        Err(AppError::Extraction(cause)) => JobReport {
            state: SessionState::Failed,
            message: Some(format!("{} Error: {}", EXTRACTION_FAILED_TEXT, cause)),
        },
        Err(_) => JobReport {
            state: SessionState::Failed,
            message: Some(EXTRACTION_FAILED_TEXT.to_string()),
        },
    }
}

/// Records the final state and drops the session record
///
/// Tolerates a record that is already gone, e.g. swept in the meantime.
pub(crate) fn finish_session(registry: &SessionRegistry, token: &str, state: SessionState) {
    let _ = registry.update(token, |session| {
        session.state = state;
        Ok(())
    });
    if registry.remove(token).is_err() {
        log::debug!("Session {} was already removed", token);
    }
}

/// Shows the transient progress indicator: the configured sticker, or a
/// plain text message when no sticker is configured
async fn send_placeholder(bot: &Bot, chat_id: ChatId) -> Option<MessageId> {
    let sent = if let Some(sticker_id) = config::STICKER_ID.as_ref() {
        bot.send_sticker(chat_id, InputFile::file_id(FileId(sticker_id.clone())))
            .await
    } else {
        bot.send_message(chat_id, PLACEHOLDER_TEXT).await
    };

    match sent {
        Ok(message) => Some(message.id),
        Err(e) => {
            log::warn!("Failed to send placeholder to chat {}: {}", chat_id, e);
            None
        }
    }
}

/// Removes the inline keyboard and deletes the prompt message
///
/// Clearing the markup first means a failed delete still leaves nothing
/// actionable on screen.
pub async fn remove_prompt(bot: &Bot, chat_id: ChatId, message_id: MessageId) {
    if let Err(e) = bot.edit_message_reply_markup(chat_id, message_id).await {
        log::debug!("Failed to clear prompt keyboard: {}", e);
    }
    if let Err(e) = bot.delete_message(chat_id, message_id).await {
        log::warn!("Error removing prompt message: {}", e);
    }
}

/// Sends the artifact back to the originating chat
///
/// Transport errors surface as [`AppError::DeliverySend`].
async fn deliver(bot: &Bot, chat_id: ChatId, artifact: &Artifact) -> AppResult<()> {
    match artifact.kind {
        MediaKind::Video => {
            bot.send_video(chat_id, InputFile::file(artifact.path.clone())).await?;
        }
        MediaKind::Audio => {
            bot.send_audio(chat_id, InputFile::file(artifact.path.clone())).await?;
        }
    }
    Ok(())
}

async fn send_best_effort(bot: &Bot, chat_id: ChatId, text: String) {
    if let Err(e) = bot.send_message(chat_id, text).await {
        log::error!("Failed to send message to chat {}: {}", chat_id, e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::auth::Principal;
    use crate::session::QualityTier;
    use pretty_assertions::assert_eq;
    use url::Url;

    fn send_failure() -> AppError {
        AppError::DeliverySend(teloxide::RequestError::from(std::sync::Arc::new(
            std::io::Error::other("connection reset by peer"),
        )))
    }

    fn dispatched_session() -> (SessionRegistry, String) {
        let registry = SessionRegistry::new();
        let url = Url::parse("https://example.com/watch?v=abc123").unwrap();
        let token = registry.create(url, Principal::new(Some(1), 1));
        registry
            .update(&token, |s| {
                s.choose_kind(MediaKind::Video)?;
                s.choose_tier(QualityTier::Video720)
            })
            .unwrap();
        (registry, token)
    }

    #[test]
    fn delivered_jobs_complete_without_a_message() {
        let report = report_for(&Ok(()));
        assert_eq!(report.state, SessionState::Completed);
        assert_eq!(report.message, None);
    }

    #[test]
    fn send_failure_asks_for_a_retry() {
        let report = report_for(&Err(send_failure()));
        assert_eq!(report.state, SessionState::Failed);
        assert_eq!(report.message.as_deref(), Some(DELIVERY_FAILED_TEXT));
    }

    #[test]
    fn extraction_failure_carries_the_cause() {
        let report = report_for(&Err(AppError::Extraction("Unsupported URL: https://example.com/x".to_string())));
        assert_eq!(report.state, SessionState::Failed);
        let message = report.message.unwrap();
        assert!(message.starts_with(EXTRACTION_FAILED_TEXT));
        assert!(message.contains("Unsupported URL"));
    }

    #[test]
    fn size_limit_is_reported_in_megabytes() {
        let report = report_for(&Err(AppError::SizeLimitExceeded { limit: 524_288_000 }));
        assert_eq!(report.state, SessionState::Failed);
        assert!(report.message.unwrap().contains("500 MB"));
    }

    #[test]
    fn failed_send_still_releases_the_session() {
        let (registry, token) = dispatched_session();
        let report = report_for(&Err(send_failure()));

        finish_session(&registry, &token, report.state);
        assert!(registry.is_empty());
        assert!(matches!(registry.get(&token), Err(AppError::SessionExpired)));
    }

    #[test]
    fn failed_extraction_still_releases_the_session() {
        let (registry, token) = dispatched_session();
        let report = report_for(&Err(AppError::Extraction("timed out".to_string())));

        finish_session(&registry, &token, report.state);
        assert!(registry.is_empty());
    }

    #[test]
    fn finish_tolerates_an_already_removed_session() {
        let (registry, token) = dispatched_session();
        registry.remove(&token).unwrap();

        finish_session(&registry, &token, SessionState::Completed);
        assert!(registry.is_empty());
    }
}
