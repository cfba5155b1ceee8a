//! Seam to the authentication provider.
//!
//! The engine never authenticates anyone itself; it only asks "who is
//! calling, if anyone?" and refuses to mutate state when the answer is
//! nobody.

use troc_shared::UserId;

use crate::error::{EngineError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Session {
    pub user_id: UserId,
}

impl Session {
    pub fn new(user_id: UserId) -> Self {
        Self { user_id }
    }
}

/// Anything that can answer `currentSession()`.
pub trait SessionProvider {
    fn current_session(&self) -> Option<Session>;
}

impl SessionProvider for Session {
    fn current_session(&self) -> Option<Session> {
        Some(*self)
    }
}

impl SessionProvider for Option<Session> {
    fn current_session(&self) -> Option<Session> {
        *self
    }
}

/// The signed-in user, or [`EngineError::Unauthenticated`].
pub fn require_user(provider: &impl SessionProvider) -> Result<UserId> {
    provider
        .current_session()
        .map(|s| s.user_id)
        .ok_or(EngineError::Unauthenticated)
}
