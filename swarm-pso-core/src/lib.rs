//! # swarm-pso-core
//!
//! Coordination engine for a distributed Particle Swarm Optimization search.
//!
//! A single [`swarm::Swarm`] owns the whole population. Remote workers pull
//! evaluation work with [`swarm::Swarm::request_work`] and push noisy fitness
//! values back with [`swarm::Swarm::submit_result`]; once every run of every
//! particle is solved, the swarm refreshes the global best, applies the PSO
//! velocity rule, moves and clamps every particle, and starts the next
//! generation.
//!
//! This crate is transport-free: the wire schema lives in `swarm-pso-net`
//! and result persistence goes through the [`record::GenerationSink`] trait.
//!
//! Known limitation: there is no liveness tracking for workers. A run handed
//! out and never answered stays `InProgress` until the operator intervenes;
//! the engine performs no retry or reassignment of its own.

pub mod config;
pub mod domain;
pub mod particle;
pub mod record;
pub mod run;
pub mod swarm;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::config::{PsoConstants, SwarmSettings};
    pub use crate::domain::{DimensionSpec, DomainSpec, Objective, ValueEncoding};
    pub use crate::particle::{Particle, ParticleState, WorkItem};
    pub use crate::record::{GenerationRecord, GenerationSink, MemorySink, NullSink};
    pub use crate::run::{EvaluationRun, RunState};
    pub use crate::swarm::{Swarm, SwarmStatus, WorkReply};
}

/// Result type for engine operations
pub type Result<T> = core::result::Result<T, Error>;

/// Error type for the coordination engine
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Every run of the particle is solved but the particle was never
    /// finalized. Indicates a coordinator bug, never a worker mistake.
    #[error("protocol violation: all runs of particle {particle} are solved but its state was never updated")]
    ProtocolViolation { particle: usize },

    /// A submission or request referenced a particle id outside the swarm.
    #[error("unknown particle id {0}")]
    UnknownParticle(usize),

    /// Local evaluation requested on a domain that only evaluates remotely.
    #[error("domain `{0}` has no local objective; results must come from workers")]
    NoLocalObjective(String),

    /// Configuration rejected at construction time.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// The result sink failed to persist a generation record.
    #[error("result sink failure: {0}")]
    Sink(#[from] record::SinkError),
}
