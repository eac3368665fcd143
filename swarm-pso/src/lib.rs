//! # swarm-pso
//!
//! **Distributed particle swarm optimization with the fitness function on
//! the other side of the network.**
//!
//! The coordinator owns the swarm state and the velocity arithmetic; workers
//! connect over TCP, fetch candidate parameter vectors, run the expensive
//! evaluation (a robotics simulation, in the original deployment), and send
//! the fitness back. The top-level `swarm-pso` crate ties the engine and the
//! transport together and ships the server binary.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use swarm_pso::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let settings = SwarmSettings::default();
//!     let sink = JsonResultsLog::create("results.json");
//!     let handle = CoordinatorHandle::spawn(
//!         settings,
//!         DomainSpec::robot_calibration(),
//!         Box::new(sink),
//!     )?;
//!
//!     let listener = tokio::net::TcpListener::bind("0.0.0.0:5005").await?;
//!     swarm_pso::net::server::serve(listener, std::sync::Arc::new(handle)).await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Crate Structure
//!
//! - [`swarm_pso_core`]: The generation state machine, particles, and
//!   velocity updates (no async, no I/O)
//! - [`swarm_pso_net`]: Wire schema and the newline-delimited-JSON server

#![forbid(unsafe_code)]

// Re-export sub-crates
pub use swarm_pso_core as core;
pub use swarm_pso_net as net;

// Re-export commonly used items at the top level
pub use swarm_pso_core::{
    config::{PsoConstants, SwarmSettings},
    domain::{DimensionSpec, DomainSpec, Objective, ValueEncoding},
    swarm::{Swarm, SwarmStatus, WorkReply},
    Error, Result,
};

pub use swarm_pso_net::{
    protocol::{ClientRequest, CoordinatorReply, ResultSubmission, WorkPayload},
    server::Coordinator,
};

/// Actor wrapper serializing swarm access for concurrent connections.
pub mod coordinator;

/// Legacy results-log sink (one JSON file, parallel arrays per particle).
pub mod results;

/// Prelude module for convenient imports
///
/// ```rust,ignore
/// use swarm_pso::prelude::*;
/// ```
pub mod prelude {
    pub use crate::core::prelude::*;
    pub use crate::net::prelude::*;

    pub use crate::coordinator::CoordinatorHandle;
    pub use crate::results::JsonResultsLog;
}
