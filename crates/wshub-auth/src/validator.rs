//! The credential check performed during the WebSocket handshake.

use std::collections::HashMap;

/// Maps a bearer credential to the user identity it authenticates.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
pub trait TokenValidator: Send + Sync {
    /// The user id carried by `token`, or `None` if it is not acceptable.
    fn validate(&self, token: &str) -> Option<String>;
}

/// Validator backed by a fixed token table. Useful for local runs and tests.
#[derive(Clone, Debug, Default)]
pub struct StaticTokenValidator {
    tokens: HashMap<String, String>,
}

impl StaticTokenValidator {
    /// Empty table; rejects everything.
    pub fn new() -> Self {
        Self::default()
    }

    /// Accept `token` as `user_id`.
    #[must_use]
    pub fn with_token(mut self, token: impl Into<String>, user_id: impl Into<String>) -> Self {
        let _ = self.tokens.insert(token.into(), user_id.into());
        self
    }
}

impl TokenValidator for StaticTokenValidator {
    fn validate(&self, token: &str) -> Option<String> {
        self.tokens.get(token).cloned()
    }
}
