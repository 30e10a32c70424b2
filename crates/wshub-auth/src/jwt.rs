//! HS256 bearer tokens.
//!
//! [`JwtTokenProvider`] issues tokens for an account name and validates them
//! back into that name. Signature, issuer and audience are checked by
//! `jsonwebtoken`; expiry is checked against the injected [`Clock`] so tests
//! can move time.

use std::sync::Arc;

use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use wshub_core::{Clock, SystemClock};
use wshub_settings::{MIN_SECURITY_KEY_LEN, TokenSettings};

use crate::errors::AuthError;
use crate::validator::TokenValidator;

/// Token issuance parameters.
#[derive(Clone, Debug)]
pub struct TokenOptions {
    /// `iss` claim written and required.
    pub issuer: String,
    /// `aud` claim written and required.
    pub audience: String,
    /// HMAC-SHA256 secret.
    pub security_key: String,
    /// Lifetime of issued tokens.
    pub expiration_minutes: u64,
}

impl From<&TokenSettings> for TokenOptions {
    fn from(s: &TokenSettings) -> Self {
        Self {
            issuer: s.issuer.clone(),
            audience: s.audience.clone(),
            security_key: s.security_key.clone(),
            expiration_minutes: s.expiration_minutes,
        }
    }
}

/// Claims carried by an issued token.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (the account).
    pub sub: String,
    /// Account name; the identity returned by validation.
    pub name: String,
    /// Issuer.
    pub iss: String,
    /// Audience.
    pub aud: String,
    /// Issued-at (unix seconds).
    pub iat: i64,
    /// Expiry (unix seconds).
    pub exp: i64,
}

/// Issues and validates HS256 tokens.
pub struct JwtTokenProvider {
    options: TokenOptions,
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for JwtTokenProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtTokenProvider")
            .field("issuer", &self.options.issuer)
            .field("audience", &self.options.audience)
            .field("expiration_minutes", &self.options.expiration_minutes)
            .finish_non_exhaustive()
    }
}

impl JwtTokenProvider {
    /// Provider using the wall clock.
    pub fn new(options: TokenOptions) -> Result<Self, AuthError> {
        Self::with_clock(options, Arc::new(SystemClock))
    }

    /// Provider using `clock` for `iat`/`exp` and expiry checks.
    pub fn with_clock(options: TokenOptions, clock: Arc<dyn Clock>) -> Result<Self, AuthError> {
        let key_len = options.security_key.len();
        if key_len < MIN_SECURITY_KEY_LEN {
            return Err(AuthError::WeakKey {
                min: MIN_SECURITY_KEY_LEN,
                actual: key_len,
            });
        }

        let secret = options.security_key.as_bytes();
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[options.issuer.as_str()]);
        validation.set_audience(&[options.audience.as_str()]);
        validation.set_required_spec_claims(&["exp", "iss", "aud", "sub"]);
        validation.validate_exp = false;
        validation.leeway = 0;

        Ok(Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validation,
            options,
            clock,
        })
    }

    /// Issue a token naming `account`.
    pub fn generate(&self, account: &str) -> Result<String, AuthError> {
        if account.is_empty() {
            return Err(AuthError::EmptyAccount);
        }
        let now = self.clock.now().timestamp();
        let lifetime = i64::try_from(self.options.expiration_minutes)
            .unwrap_or(i64::MAX / 60)
            .saturating_mul(60);
        let claims = Claims {
            sub: account.to_owned(),
            name: account.to_owned(),
            iss: self.options.issuer.clone(),
            aud: self.options.audience.clone(),
            iat: now,
            exp: now.saturating_add(lifetime),
        };
        Ok(encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)?)
    }

    /// Decode and fully verify `token`.
    pub fn decode(&self, token: &str) -> Result<Claims, AuthError> {
        let data = decode::<Claims>(token, &self.decoding, &self.validation)?;
        let claims = data.claims;
        if claims.exp <= self.clock.now().timestamp() {
            return Err(AuthError::Expired(claims.exp));
        }
        Ok(claims)
    }
}

impl TokenValidator for JwtTokenProvider {
    fn validate(&self, token: &str) -> Option<String> {
        match self.decode(token) {
            Ok(claims) if !claims.name.is_empty() => Some(claims.name),
            Ok(_) => None,
            Err(e) => {
                tracing::debug!(error = %e, "token rejected");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};
    use wshub_core::FixedClock;

    const KEY: &str = "0123456789abcdef0123456789abcdef";

    fn options() -> TokenOptions {
        TokenOptions {
            issuer: "wshub-test".into(),
            audience: "wshub-test-clients".into(),
            security_key: KEY.into(),
            expiration_minutes: 10,
        }
    }

    fn fixed_clock() -> Arc<FixedClock> {
        Arc::new(FixedClock::new(
            Utc.with_ymd_and_hms(2026, 5, 1, 12, 0, 0).unwrap(),
        ))
    }

    #[test]
    fn generate_then_validate_returns_account() {
        let provider = JwtTokenProvider::new(options()).unwrap();
        let token = provider.generate("alice").unwrap();
        assert_eq!(provider.validate(&token).as_deref(), Some("alice"));
    }

    #[test]
    fn claims_carry_name_subject_and_lifetime() {
        let clock = fixed_clock();
        let provider = JwtTokenProvider::with_clock(options(), clock.clone()).unwrap();
        let token = provider.generate("bob").unwrap();
        let claims = provider.decode(&token).unwrap();
        assert_eq!(claims.name, "bob");
        assert_eq!(claims.sub, "bob");
        assert_eq!(claims.iss, "wshub-test");
        assert_eq!(claims.aud, "wshub-test-clients");
        assert_eq!(claims.exp - claims.iat, 600);
        assert_eq!(claims.iat, clock.now().timestamp());
    }

    #[test]
    fn expired_token_rejected() {
        let clock = fixed_clock();
        let provider = JwtTokenProvider::with_clock(options(), clock.clone()).unwrap();
        let token = provider.generate("alice").unwrap();

        clock.advance(Duration::minutes(9));
        assert!(provider.validate(&token).is_some());

        clock.advance(Duration::minutes(1));
        assert!(matches!(
            provider.decode(&token).unwrap_err(),
            AuthError::Expired(_)
        ));
        assert_eq!(provider.validate(&token), None);
    }

    #[test]
    fn wrong_key_rejected() {
        let issuer = JwtTokenProvider::new(options()).unwrap();
        let other = JwtTokenProvider::new(TokenOptions {
            security_key: "fedcba9876543210fedcba9876543210".into(),
            ..options()
        })
        .unwrap();
        let token = issuer.generate("alice").unwrap();
        assert_eq!(other.validate(&token), None);
    }

    #[test]
    fn wrong_audience_rejected() {
        let issuer = JwtTokenProvider::new(options()).unwrap();
        let other = JwtTokenProvider::new(TokenOptions {
            audience: "someone-else".into(),
            ..options()
        })
        .unwrap();
        let token = issuer.generate("alice").unwrap();
        assert!(matches!(other.decode(&token).unwrap_err(), AuthError::Jwt(_)));
    }

    #[test]
    fn wrong_issuer_rejected() {
        let issuer = JwtTokenProvider::new(options()).unwrap();
        let other = JwtTokenProvider::new(TokenOptions {
            issuer: "not-wshub".into(),
            ..options()
        })
        .unwrap();
        let token = issuer.generate("alice").unwrap();
        assert_eq!(other.validate(&token), None);
    }

    #[test]
    fn garbage_token_rejected() {
        let provider = JwtTokenProvider::new(options()).unwrap();
        assert_eq!(provider.validate("not-a-jwt"), None);
        assert_eq!(provider.validate(""), None);
    }

    #[test]
    fn empty_account_refused() {
        let provider = JwtTokenProvider::new(options()).unwrap();
        assert!(matches!(
            provider.generate("").unwrap_err(),
            AuthError::EmptyAccount
        ));
    }

    #[test]
    fn short_key_refused() {
        let err = JwtTokenProvider::new(TokenOptions {
            security_key: "short".into(),
            ..options()
        })
        .unwrap_err();
        assert!(matches!(err, AuthError::WeakKey { min: 32, actual: 5 }));
    }

    #[test]
    fn options_from_settings() {
        let settings = TokenSettings::default();
        let opts = TokenOptions::from(&settings);
        assert_eq!(opts.issuer, settings.issuer);
        assert_eq!(opts.expiration_minutes, 60);
        assert!(JwtTokenProvider::new(opts).is_ok());
    }
}
