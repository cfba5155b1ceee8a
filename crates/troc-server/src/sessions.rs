//! Bearer-token sessions.
//!
//! Identity itself comes from an external provider; this registry only maps
//! the opaque tokens it hands out (through `/admin/sessions`) to user ids.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use axum::http::HeaderMap;
use troc_engine::Session;
use troc_shared::UserId;
use uuid::Uuid;

#[derive(Clone, Default)]
pub struct SessionRegistry {
    tokens: Arc<RwLock<HashMap<String, UserId>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mint a new token for `user`.
    pub fn issue(&self, user: UserId) -> String {
        let token = Uuid::new_v4().simple().to_string();
        match self.tokens.write() {
            Ok(mut tokens) => {
                tokens.insert(token.clone(), user);
            }
            Err(poisoned) => {
                poisoned.into_inner().insert(token.clone(), user);
            }
        }
        token
    }

    pub fn lookup(&self, token: &str) -> Option<UserId> {
        match self.tokens.read() {
            Ok(tokens) => tokens.get(token).copied(),
            Err(poisoned) => poisoned.into_inner().get(token).copied(),
        }
    }

    /// The session named by the request's `Authorization: Bearer` header.
    pub fn resolve(&self, headers: &HeaderMap) -> Option<Session> {
        let token = bearer_token(headers)?;
        self.lookup(token).map(Session::new)
    }
}

pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|auth| auth.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}
