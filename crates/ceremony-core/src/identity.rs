//! The identity provider collaborator: resolves an authenticated caller to
//! an [`AuthClaim`]. The real system's OAuth device-flow login is out of
//! scope here; [`AllowlistIdentityProvider`] mints claims from a static
//! table, which is all the rest of the engine needs to exercise the
//! authorization checks in every callable entry point.

use std::collections::HashMap;

use ceremony_primitives::AuthClaim;

use crate::errors::{CoordinatorError, CoordinatorResult};

pub trait IdentityProvider: Send + Sync {
    fn resolve(&self, bearer_token: &str) -> CoordinatorResult<AuthClaim>;
}

#[derive(Default)]
pub struct AllowlistIdentityProvider {
    tokens: HashMap<String, AuthClaim>,
}

impl AllowlistIdentityProvider {
    pub fn new() -> Self {
        Self { tokens: HashMap::new() }
    }

    pub fn with_participant(mut self, token: impl Into<String>, user_id: impl Into<String>, display_name: impl Into<String>) -> Self {
        self.tokens.insert(token.into(), AuthClaim::participant(user_id, display_name));
        self
    }

    pub fn with_coordinator(mut self, token: impl Into<String>, user_id: impl Into<String>, display_name: impl Into<String>) -> Self {
        self.tokens.insert(token.into(), AuthClaim::coordinator(user_id, display_name));
        self
    }
}

impl IdentityProvider for AllowlistIdentityProvider {
    fn resolve(&self, bearer_token: &str) -> CoordinatorResult<AuthClaim> {
        self.tokens.get(bearer_token).cloned().ok_or(CoordinatorError::Unauthenticated)
    }
}
