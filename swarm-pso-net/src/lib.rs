//! # swarm-pso-net
//!
//! Wire schema and transport for the PSO coordinator.
//!
//! This crate provides:
//! - The JSON message schema for the two logical operations: `request work`
//!   and `submit result` ([`protocol`])
//! - A newline-delimited-JSON TCP server that forwards those operations to
//!   a [`server::Coordinator`] implementation
//!
//! Workers are free to speak any transport that carries the same payloads;
//! the engine never sees anything but [`protocol`] types.

pub mod protocol;
pub mod server;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::protocol::*;
    pub use crate::server::{serve, Coordinator};
}

/// Result type for network operations
pub type Result<T> = core::result::Result<T, Error>;

/// Network error types
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Socket-level failure
    #[error("transport error: {0}")]
    Io(#[from] std::io::Error),
    /// A payload could not be encoded or decoded
    #[error("invalid message: {0}")]
    Json(#[from] serde_json::Error),
    /// Engine-side failure, passed through with its own message
    #[error(transparent)]
    Engine(#[from] swarm_pso_core::Error),
    /// The coordinating task behind the transport has stopped
    #[error("coordinator has shut down")]
    Shutdown,
}
