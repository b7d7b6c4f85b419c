//! Integration tests for the download-session dispatch flow
//!
//! Exercises the registry, the selection state machine and the callback
//! grammar together, the way the handler tree drives them.
//!
//! Run with: cargo test --test dispatch_flow_test

use std::sync::Arc;

use pretty_assertions::assert_eq;
use teloxide::types::MessageId;

use fetchka::core::auth::{is_authorized, Principal};
use fetchka::core::validation::validate_url;
use fetchka::telegram::callback::{self, CallbackAction};
use fetchka::{AppError, MediaKind, QualityTier, SessionRegistry, SessionState};
use fetchka::session::CancelOutcome;

fn principal() -> Principal {
    Principal::new(Some(42), 42)
}

#[test]
fn valid_url_creates_one_session_awaiting_media_type() {
    let registry = SessionRegistry::new();
    let url = validate_url("https://example.com/watch?v=abc123").unwrap();

    let token = registry.create(url, principal());

    assert_eq!(registry.len(), 1);
    let session = registry.get(&token).unwrap();
    assert_eq!(session.state, SessionState::AwaitingMediaType);
    assert_eq!(session.kind, None);
    assert_eq!(session.tier, None);
}

#[test]
fn invalid_input_never_reaches_the_registry() {
    // The boundary rejects these before create() is ever called
    for input in ["not a url", "ftp://example.com/x", ""] {
        assert!(matches!(validate_url(input), Err(AppError::InvalidUrl(_))), "accepted {:?}", input);
    }
}

#[test]
fn video_720_selection_dispatches_a_matching_job() {
    let registry = SessionRegistry::new();
    let url = validate_url("https://example.com/watch?v=abc123").unwrap();
    let token = registry.create(url, principal());

    // Button press: "video|<token>"
    let payload = format!("video|{}", token);
    let (action, parsed_token) = callback::parse(&payload).unwrap();
    assert_eq!(parsed_token, token);
    let CallbackAction::Media(kind) = action else {
        panic!("expected a media choice");
    };
    registry.update(&token, |s| s.choose_kind(kind)).unwrap();
    assert_eq!(registry.get(&token).unwrap().state, SessionState::AwaitingQuality);

    // Button press: "video_720|<token>"
    let (action, _) = callback::parse(&format!("video_720|{}", token)).unwrap();
    let CallbackAction::Quality(tier) = action else {
        panic!("expected a quality choice");
    };
    let job = registry
        .update(&token, |s| {
            s.choose_tier(tier)?;
            s.to_job(500 * 1024 * 1024)
        })
        .unwrap();

    assert_eq!(job.kind, MediaKind::Video);
    assert_eq!(job.tier, QualityTier::Video720);
    assert_eq!(job.token, token);
    assert_eq!(job.max_bytes, 500 * 1024 * 1024);

    // Job completion removes the session
    registry.remove(&token).unwrap();
    assert!(registry.is_empty());
}

#[test]
fn stored_prompt_reference_survives_to_cleanup() {
    // The prompt message is recorded right after it is sent; both the
    // dispatch and cancel paths read that stored reference back when the
    // prompt has to be retired.
    let registry = SessionRegistry::new();
    let url = validate_url("https://example.com/watch?v=abc123").unwrap();
    let token = registry.create(url, principal());

    registry
        .update(&token, |s| {
            s.prompt_message_id = Some(MessageId(77));
            Ok(())
        })
        .unwrap();

    let (job, prompt_id) = registry
        .update(&token, |s| {
            s.choose_kind(MediaKind::Video)?;
            s.choose_tier(QualityTier::Video480)?;
            let job = s.to_job(1024)?;
            Ok((job, s.prompt_message_id))
        })
        .unwrap();
    assert_eq!(prompt_id, Some(MessageId(77)));
    assert_eq!(job.token, token);

    // Cancel-style teardown gets the same reference from the removed record
    let removed = registry.remove(&token).unwrap();
    assert_eq!(removed.prompt_message_id, Some(MessageId(77)));
}

#[test]
fn awaiting_media_type_rejects_quality_events_without_mutation() {
    let registry = SessionRegistry::new();
    let url = validate_url("https://example.com/watch?v=abc123").unwrap();
    let token = registry.create(url, principal());

    let (action, _) = callback::parse(&format!("audio_128|{}", token)).unwrap();
    let CallbackAction::Quality(tier) = action else {
        panic!("expected a quality choice");
    };
    let err = registry.update(&token, |s| s.choose_tier(tier));
    assert!(matches!(err, Err(AppError::SessionExpired)));

    let session = registry.get(&token).unwrap();
    assert_eq!(session.state, SessionState::AwaitingMediaType);
    assert_eq!(session.tier, None);
}

#[test]
fn cancel_removes_the_session_for_good() {
    let registry = SessionRegistry::new();
    let url = validate_url("https://example.com/watch?v=abc123").unwrap();
    let token = registry.create(url, principal());

    let outcome = registry.update(&token, |s| s.cancel()).unwrap();
    assert_eq!(outcome, CancelOutcome::Cancelled);
    registry.remove(&token).unwrap();

    // No further event referencing the token succeeds
    assert!(matches!(registry.get(&token), Err(AppError::SessionExpired)));
    assert!(matches!(
        registry.update(&token, |s| s.choose_kind(MediaKind::Video)),
        Err(AppError::SessionExpired)
    ));
    assert!(matches!(registry.remove(&token), Err(AppError::SessionExpired)));
}

#[test]
fn post_dispatch_cancel_leaves_the_job_running() {
    let registry = SessionRegistry::new();
    let url = validate_url("https://example.com/watch?v=abc123").unwrap();
    let token = registry.create(url, principal());

    registry
        .update(&token, |s| {
            s.choose_kind(MediaKind::Audio)?;
            s.choose_tier(QualityTier::Audio192)
        })
        .unwrap();

    let outcome = registry.update(&token, |s| s.cancel()).unwrap();
    assert_eq!(outcome, CancelOutcome::AlreadyRunning);
    assert_eq!(registry.get(&token).unwrap().state, SessionState::Dispatched);
}

#[test]
fn malformed_payloads_are_session_expired() {
    for bad in ["video", "best|tok", "video_1080|tok", "audio_|tok", ""] {
        assert!(matches!(callback::parse(bad), Err(AppError::SessionExpired)));
    }
}

#[tokio::test]
async fn concurrent_sessions_get_distinct_tokens() {
    let registry = Arc::new(SessionRegistry::new());
    let url = validate_url("https://example.com/watch?v=abc123").unwrap();

    let mut handles = Vec::new();
    for _ in 0..100 {
        let registry = Arc::clone(&registry);
        let url = url.clone();
        handles.push(tokio::spawn(async move { registry.create(url, Principal::new(Some(1), 1)) }));
    }

    let mut tokens = std::collections::HashSet::new();
    for handle in handles {
        assert!(tokens.insert(handle.await.unwrap()), "duplicate token");
    }
    assert_eq!(registry.len(), 100);
}

#[test]
fn empty_allow_list_authorizes_nobody() {
    // This test binary never sets SUDO_USERS / SUDO_GROUPS, so the
    // allow-list is empty and every principal is silently dropped before a
    // session could be created.
    assert!(!is_authorized(&Principal::new(Some(42), 42)));
    assert!(!is_authorized(&Principal::new(None, -100500)));
}
