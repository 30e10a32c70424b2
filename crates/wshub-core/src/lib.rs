//! # wshub-core
//!
//! Core types shared by every wshub crate.
//!
//! - [`ids::ConnectionId`]: process-unique identifier for one socket registration
//! - [`envelope::MessageEnvelope`]: the value pushed to clients over the wire
//! - [`clock::Clock`]: injectable time source used to stamp envelopes
//! - [`socket::SocketHandle`]: transport-agnostic duplex socket abstraction
//!
//! Test doubles (`FakeSocket`) live in [`testing`], compiled for tests or
//! with the `testing` feature.

#![deny(unsafe_code)]

pub mod clock;
pub mod envelope;
pub mod ids;
pub mod socket;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use clock::{Clock, FixedClock, SystemClock};
pub use envelope::{MessageEnvelope, MessageKind, Risk};
pub use ids::ConnectionId;
pub use socket::{AtomicSocketState, InboundFrame, SocketError, SocketHandle, SocketState};
