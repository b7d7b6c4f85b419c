//! Handler tree for the dispatcher
//!
//! The same schema is used in production and by integration tests. Inbound
//! updates pass the allow-list gate first; unauthorized traffic is dropped
//! without any outbound message so the bot stays invisible to non-operators.

use std::sync::Arc;

use teloxide::dispatching::{UpdateFilterExt, UpdateHandler};
use teloxide::prelude::*;

use crate::core::auth::{authorize, Principal};
use crate::core::config;
use crate::core::validation::validate_url;
use crate::session::{CancelOutcome, SessionRegistry};
use crate::telegram::bot::Command;
use crate::telegram::callback::{self, CallbackAction};
use crate::telegram::delivery;
use crate::telegram::keyboard::{media_kind_keyboard, quality_keyboard};

/// Error type for handlers
pub type HandlerError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Dependencies required by handlers
#[derive(Clone)]
pub struct HandlerDeps {
    pub registry: Arc<SessionRegistry>,
}

impl HandlerDeps {
    pub fn new(registry: Arc<SessionRegistry>) -> Self {
        Self { registry }
    }
}

const WELCOME_TEXT: &str = "Welcome! Send me a link and I'll download the video or audio for you.";
const INVALID_URL_TEXT: &str = "Please send a valid link, e.g. https://example.com/watch?v=abc123";
const CHOOSE_KIND_TEXT: &str = "Choose what to download:";
const EXPIRED_TEXT: &str = "That selection has expired. Please send the link again.";
const CANCELLED_TEXT: &str = "Download cancelled.";
const ALREADY_RUNNING_TEXT: &str = "That download is already in progress.";

/// Creates the main dispatcher schema for the bot
///
/// # Arguments
/// * `deps` - Handler dependencies (session registry)
///
/// # Returns
/// The complete handler tree for the bot
pub fn schema(deps: HandlerDeps) -> UpdateHandler<HandlerError> {
    let deps_commands = deps.clone();
    let deps_messages = deps.clone();
    let deps_callbacks = deps;

    dptree::entry()
        .branch(command_handler(deps_commands))
        .branch(message_handler(deps_messages))
        .branch(callback_handler(deps_callbacks))
}

/// Handler for bot commands
fn command_handler(_deps: HandlerDeps) -> UpdateHandler<HandlerError> {
    Update::filter_message().branch(dptree::entry().filter_command::<Command>().endpoint(
        move |bot: Bot, msg: Message, cmd: Command| async move {
            if authorize(&principal_of(&msg)).is_err() {
                return Ok(());
            }
            match cmd {
                Command::Start => {
                    bot.send_message(msg.chat.id, WELCOME_TEXT).await?;
                }
            }
            Ok(())
        },
    ))
}

/// Handler for plain text messages carrying a link
fn message_handler(deps: HandlerDeps) -> UpdateHandler<HandlerError> {
    Update::filter_message().endpoint(move |bot: Bot, msg: Message| {
        let deps = deps.clone();
        async move {
            if let Err(e) = handle_url_message(&bot, &msg, &deps.registry).await {
                log::error!("Message handler failed for chat {}: {}", msg.chat.id, e);
            }
            Ok(())
        }
    })
}

/// Handler for callback queries (inline keyboard buttons)
fn callback_handler(deps: HandlerDeps) -> UpdateHandler<HandlerError> {
    Update::filter_callback_query().endpoint(move |bot: Bot, q: CallbackQuery| {
        let deps = deps.clone();
        async move {
            if let Err(e) = handle_selection_callback(&bot, &q, &deps.registry).await {
                log::error!("Callback handler failed: {}", e);
            }
            Ok(())
        }
    })
}

fn principal_of(msg: &Message) -> Principal {
    Principal::new(msg.from.as_ref().map(|u| u.id.0), msg.chat.id.0)
}

/// Processes an inbound text message: allow-list gate, URL validation,
/// session creation, media-type prompt
///
/// Order matters: authorization is checked before anything is created or
/// sent; invalid URLs from authorized senders get an in-line rejection and
/// never create a session.
async fn handle_url_message(bot: &Bot, msg: &Message, registry: &Arc<SessionRegistry>) -> ResponseResult<()> {
    let Some(text) = msg.text() else {
        return Ok(());
    };

    let principal = principal_of(msg);
    if let Err(e) = authorize(&principal) {
        log::debug!("Dropping message from chat {}: {}", msg.chat.id, e);
        return Ok(());
    }

    let url = match validate_url(text) {
        Ok(url) => url,
        Err(_) => {
            bot.send_message(msg.chat.id, INVALID_URL_TEXT).await?;
            return Ok(());
        }
    };

    let token = registry.create(url, principal);
    log::info!("Created session {} for chat {}", token, msg.chat.id);

    let prompt = bot
        .send_message(msg.chat.id, CHOOSE_KIND_TEXT)
        .reply_markup(media_kind_keyboard(&token))
        .await?;

    // Remember the prompt so cleanup can delete it later
    let _ = registry.update(&token, |session| {
        session.prompt_message_id = Some(prompt.id);
        Ok(())
    });

    Ok(())
}

/// Processes a button press: parse the payload once, apply the transition
/// through the registry, emit the next prompt or dispatch the job
async fn handle_selection_callback(bot: &Bot, q: &CallbackQuery, registry: &Arc<SessionRegistry>) -> ResponseResult<()> {
    // Always acknowledge so the button stops spinning
    let _ = bot.answer_callback_query(q.id.clone()).await;

    let Some(data) = q.data.as_deref() else {
        return Ok(());
    };
    let (Some(chat_id), Some(message_id)) = (
        q.message.as_ref().map(|m| m.chat().id),
        q.message.as_ref().map(|m| m.id()),
    ) else {
        return Ok(());
    };

    let principal = Principal::new(Some(q.from.id.0), chat_id.0);
    if let Err(e) = authorize(&principal) {
        log::debug!("Dropping callback from chat {}: {}", chat_id, e);
        return Ok(());
    }

    let Ok((action, token)) = callback::parse(data) else {
        bot.send_message(chat_id, EXPIRED_TEXT).await?;
        return Ok(());
    };

    match action {
        CallbackAction::Cancel => match registry.update(token, |session| session.cancel()) {
            Ok(CancelOutcome::Cancelled) => {
                // The stored prompt reference survives even when the button
                // arrives on an older copy of the prompt
                let prompt_id = registry
                    .remove(token)
                    .ok()
                    .and_then(|session| session.prompt_message_id)
                    .unwrap_or(message_id);
                delivery::remove_prompt(bot, chat_id, prompt_id).await;
                bot.send_message(chat_id, CANCELLED_TEXT).await?;
                log::info!("Session {} cancelled", token);
            }
            Ok(CancelOutcome::AlreadyRunning) => {
                bot.send_message(chat_id, ALREADY_RUNNING_TEXT).await?;
            }
            Err(_) => {
                bot.send_message(chat_id, EXPIRED_TEXT).await?;
            }
        },

        CallbackAction::Media(kind) => match registry.update(token, |session| session.choose_kind(kind)) {
            Ok(()) => {
                let text = format!("Choose the {} quality:", kind.as_str());
                bot.edit_message_text(chat_id, message_id, text)
                    .reply_markup(quality_keyboard(kind, token))
                    .await?;
            }
            Err(_) => {
                bot.send_message(chat_id, EXPIRED_TEXT).await?;
            }
        },

        CallbackAction::Quality(tier) => {
            let dispatched = registry.update(token, |session| {
                session.choose_tier(tier)?;
                let job = session.to_job(*config::MAX_FILE_SIZE_BYTES)?;
                Ok((job, session.prompt_message_id))
            });
            match dispatched {
                Ok((job, prompt_id)) => {
                    log::info!(
                        "Dispatching job for session {} (kind={}, tier={})",
                        token,
                        job.kind.as_str(),
                        tier.value()
                    );
                    let prompt_id = prompt_id.unwrap_or(message_id);
                    let _ = delivery::spawn_job(bot.clone(), Arc::clone(registry), chat_id, prompt_id, job);
                }
                Err(_) => {
                    bot.send_message(chat_id, EXPIRED_TEXT).await?;
                }
            }
        }
    }

    Ok(())
}
