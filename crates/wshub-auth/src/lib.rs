//! # wshub-auth
//!
//! Bearer credentials for the WebSocket handshake.
//!
//! - [`TokenValidator`]: the check the handshake performs (`token -> user id`)
//! - [`JwtTokenProvider`]: HS256 issuance and validation
//! - [`StaticTokenValidator`]: fixed token table for local runs

#![deny(unsafe_code)]

pub mod errors;
pub mod jwt;
pub mod validator;

pub use errors::AuthError;
pub use jwt::{Claims, JwtTokenProvider, TokenOptions};
#[cfg(any(test, feature = "testing"))]
pub use validator::MockTokenValidator;
pub use validator::{StaticTokenValidator, TokenValidator};
