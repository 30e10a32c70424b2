//! Bearer token settings.

use serde::{Deserialize, Serialize};

/// Minimum accepted length of the HMAC signing key.
pub const MIN_SECURITY_KEY_LEN: usize = 32;

/// Signing key shipped in the compiled defaults. The binary warns when it
/// is still in use.
pub const DEVELOPMENT_SECURITY_KEY: &str = "wshub-development-signing-key-change-me";

/// Token issuance and validation settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TokenSettings {
    /// `iss` claim.
    pub issuer: String,
    /// `aud` claim.
    pub audience: String,
    /// HMAC-SHA256 signing key.
    pub security_key: String,
    /// Token lifetime in minutes.
    pub expiration_minutes: u64,
}

impl TokenSettings {
    /// Whether the compiled development key is still configured.
    pub fn uses_development_key(&self) -> bool {
        self.security_key == DEVELOPMENT_SECURITY_KEY
    }
}

impl Default for TokenSettings {
    fn default() -> Self {
        Self {
            issuer: "wshub".to_string(),
            audience: "wshub-clients".to_string(),
            security_key: DEVELOPMENT_SECURITY_KEY.to_string(),
            expiration_minutes: 60,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn development_key_is_long_enough() {
        assert!(DEVELOPMENT_SECURITY_KEY.len() >= MIN_SECURITY_KEY_LEN);
    }

    #[test]
    fn default_uses_development_key() {
        assert!(TokenSettings::default().uses_development_key());
    }

    #[test]
    fn custom_key_detected() {
        let s = TokenSettings {
            security_key: "x".repeat(40),
            ..TokenSettings::default()
        };
        assert!(!s.uses_development_key());
    }
}
