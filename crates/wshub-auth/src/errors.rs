//! Auth error types.

/// Errors that can occur while issuing or decoding tokens.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// Signing or decoding failed (bad signature, issuer, audience, format).
    #[error("JWT error: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),

    /// The token's `exp` is not after the current time.
    #[error("token expired at {0}")]
    Expired(i64),

    /// A token was requested for an empty account name.
    #[error("account must not be empty")]
    EmptyAccount,

    /// The configured signing key is shorter than the minimum length.
    #[error("security key must be at least {min} bytes (got {actual})")]
    WeakKey {
        /// Required minimum.
        min: usize,
        /// Configured length.
        actual: usize,
    },
}
