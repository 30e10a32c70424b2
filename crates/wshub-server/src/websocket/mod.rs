//! Per-user socket registry, handshake, fan-out, receive loop and liveness
//! monitor.

pub mod axum_adapter;
pub mod connection;
pub mod handshake;
pub mod manager;
pub mod monitor;
pub mod receive;
pub mod registry;
