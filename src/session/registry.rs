//! Token-keyed session registry
//!
//! The registry exclusively owns session records. Handlers and the download
//! engine read and mutate sessions only through the token-keyed accessors
//! here; each accessor holds the per-entry lock for the whole mutation, so
//! two concurrent events can never interleave on the same token.

use std::sync::Arc;
use std::time::Duration;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use rand::distributions::Alphanumeric;
use rand::Rng;
use url::Url;

use crate::core::auth::Principal;
use crate::core::config;
use crate::core::error::{AppError, AppResult};
use crate::session::{Session, SessionState};

/// Shared registry of live download sessions
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: DashMap<String, Session>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self {
            sessions: DashMap::new(),
        }
    }

    /// Creates a session in `AwaitingMediaType` and returns its token
    ///
    /// Tokens are random alphanumeric strings; the vacancy check and insert
    /// happen under one entry lock, so tokens are unique among live sessions
    /// even under concurrent creation.
    pub fn create(&self, url: Url, principal: Principal) -> String {
        loop {
            let token = generate_token();
            match self.sessions.entry(token.clone()) {
                Entry::Vacant(slot) => {
                    slot.insert(Session::new(token.clone(), url, principal));
                    return token;
                }
                // Collision with a live session; draw again
                Entry::Occupied(_) => continue,
            }
        }
    }

    /// Returns a snapshot of the session for a token
    pub fn get(&self, token: &str) -> AppResult<Session> {
        self.sessions
            .get(token)
            .map(|entry| entry.value().clone())
            .ok_or(AppError::SessionExpired)
    }

    /// Applies a mutation to the session atomically
    ///
    /// The closure runs under the entry lock. An unknown token fails with
    /// `SessionExpired` rather than creating one; a failing mutator leaves
    /// the session exactly as it was.
    pub fn update<T>(&self, token: &str, mutate: impl FnOnce(&mut Session) -> AppResult<T>) -> AppResult<T> {
        let mut entry = self.sessions.get_mut(token).ok_or(AppError::SessionExpired)?;
        mutate(entry.value_mut())
    }

    /// Removes a session, returning it if it was live
    pub fn remove(&self, token: &str) -> AppResult<Session> {
        self.sessions
            .remove(token)
            .map(|(_, session)| session)
            .ok_or(AppError::SessionExpired)
    }

    /// Number of live sessions
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Removes abandoned selections older than `ttl`
    ///
    /// Only sessions still waiting on a selection are swept; dispatched jobs
    /// remove their own session when they finish. No user message is sent
    /// for swept sessions. Returns the number of sessions removed.
    pub fn sweep_expired(&self, ttl: Duration) -> usize {
        // Counted inside the closure; a len() delta would race with
        // concurrent create() calls.
        let mut swept = 0;
        self.sessions.retain(|_, session| {
            let abandoned = matches!(
                session.state,
                SessionState::AwaitingMediaType | SessionState::AwaitingQuality
            ) && session.created_at.elapsed() >= ttl;
            if abandoned {
                swept += 1;
                log::info!("Sweeping abandoned session {} ({})", session.token, session.url);
            }
            !abandoned
        });
        swept
    }

    /// Spawns the periodic background sweep of abandoned sessions
    pub fn spawn_sweep_task(self: Arc<Self>) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(config::session::sweep_interval());
            loop {
                ticker.tick().await;
                let swept = self.sweep_expired(config::session::ttl());
                if swept > 0 {
                    log::info!("Session sweep removed {} abandoned session(s)", swept);
                }
            }
        })
    }
}

fn generate_token() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(config::download::TOKEN_LEN)
        .map(char::from)
        .collect()
}
