//! Static allow-list authorization
//!
//! Evaluated at the boundary before any session is created or mutated.
//! Unauthorized inbound events are dropped without an outbound message so
//! the bot never reveals its presence to non-operators.

use crate::core::config;
use crate::core::error::{AppError, AppResult};

/// Identity attached to an inbound message or button event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Principal {
    /// Telegram user ID of the sender, if the update carries one
    pub user_id: Option<u64>,
    /// Chat the event originated from (negative for groups)
    pub chat_id: i64,
}

impl Principal {
    pub fn new(user_id: Option<u64>, chat_id: i64) -> Self {
        Self { user_id, chat_id }
    }
}

/// Checks a principal against the configured allow-list
///
/// A principal is authorized when its user ID is in `SUDO_USERS` or its
/// enclosing chat is in `SUDO_GROUPS`.
pub fn is_authorized(principal: &Principal) -> bool {
    is_listed(principal, &config::SUDO_USERS, &config::SUDO_GROUPS)
}

/// Checked form of the allow-list gate
///
/// Handlers use this so a rejection carries [`AppError::Unauthorized`];
/// callers still drop the event silently.
pub fn authorize(principal: &Principal) -> AppResult<()> {
    if is_authorized(principal) {
        Ok(())
    } else {
        Err(AppError::Unauthorized)
    }
}

fn is_listed(principal: &Principal, users: &[u64], groups: &[i64]) -> bool {
    if let Some(user_id) = principal.user_id {
        if users.contains(&user_id) {
            return true;
        }
    }
    groups.contains(&principal.chat_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn listed_user_is_authorized() {
        let p = Principal::new(Some(42), 42);
        assert!(is_listed(&p, &[7, 42], &[]));
    }

    #[test]
    fn listed_group_authorizes_any_member() {
        let p = Principal::new(Some(999), -100500);
        assert!(is_listed(&p, &[], &[-100500]));
    }

    #[test]
    fn unlisted_principal_is_rejected() {
        let p = Principal::new(Some(999), 999);
        assert!(!is_listed(&p, &[7, 42], &[-100500]));
    }

    #[test]
    fn rejection_surfaces_as_unauthorized() {
        // Config-backed allow-lists are empty in the test environment
        let p = Principal::new(Some(999), 999);
        assert!(matches!(authorize(&p), Err(AppError::Unauthorized)));
    }

    #[test]
    fn missing_user_id_falls_back_to_group_check() {
        let p = Principal::new(None, -100500);
        assert!(is_listed(&p, &[7], &[-100500]));
        let q = Principal::new(None, 123);
        assert!(!is_listed(&q, &[7], &[-100500]));
    }
}
