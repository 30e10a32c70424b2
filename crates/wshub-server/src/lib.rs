//! # wshub-server
//!
//! Axum WebSocket hub that keeps a per-user set of live sockets.
//!
//! - `GET /ws?token=...`: authenticated upgrade; each socket runs its own
//!   receive loop and is removed from the registry however the loop ends
//! - Fan-out to one user or to everyone, and forced disconnects, through
//!   [`websocket::manager::ConnectionManager`]
//! - Liveness monitor that pings open sockets and reaps the rest
//! - Admin HTTP surface under `/api/users`, plus `/health` and `/metrics`
//! - Graceful shutdown via `CancellationToken`

#![deny(unsafe_code)]

pub mod api;
pub mod config;
pub mod health;
pub mod metrics;
pub mod server;
pub mod shutdown;
pub mod websocket;

pub use config::HubConfig;
pub use server::{AppState, HubServer};
