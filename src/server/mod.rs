//! Client-facing server
//!
//! Brings the listening endpoint up exactly once, tracks every live
//! client connection, reconciles each newly connected client against
//! the module table, and fans committed deltas out to all of them.

mod broadcast;
mod clients;
mod config;
mod connection;
mod lifecycle;

pub use broadcast::BroadcastEngine;
pub use clients::ClientRegistry;
pub use config::{ListenConfig, DEFAULT_HOSTNAME, DEFAULT_PORT};
pub use connection::{ClientConnection, ConnectionPhase};
pub use lifecycle::ServerLifecycle;
