//! Durable generation records
//!
//! One record is emitted per particle per completed generation, carrying the
//! evaluated position, its aggregate fitness, and the personal-best fitness
//! at that point. The engine never touches files itself; persistence is a
//! [`GenerationSink`] implementation supplied by the caller (the `swarm-pso`
//! crate ships a JSON results log compatible with the downstream plotters).

use serde::{Deserialize, Serialize};

/// Failure raised by a [`GenerationSink`] implementation
#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub struct SinkError(pub String);

impl From<std::io::Error> for SinkError {
    fn from(err: std::io::Error) -> Self {
        SinkError(err.to_string())
    }
}

/// Audit record for one particle at the end of one generation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRecord {
    /// Particle the record belongs to
    pub particle_id: usize,
    /// Generation the fitness was evaluated in
    pub generation: u32,
    /// `(dimension name, value)` pairs of the evaluated position, in
    /// domain order. Captured before the particle moves.
    pub position: Vec<(String, f64)>,
    /// Aggregate (mean-of-runs) fitness of the generation
    pub fitness: f64,
    /// Personal-best fitness after this generation's update
    pub personal_best_fitness: f64,
}

/// Destination for [`GenerationRecord`]s.
///
/// `initialize` is called exactly once, before any record, so file-backed
/// sinks can lay out their empty per-particle structure up front.
pub trait GenerationSink: Send {
    /// Prepare storage for a session of `num_particles` particles over the
    /// named dimensions.
    fn initialize(
        &mut self,
        num_particles: usize,
        dimension_names: &[String],
    ) -> Result<(), SinkError>;

    /// Append one record. Called once per particle per completed generation.
    fn append(&mut self, record: &GenerationRecord) -> Result<(), SinkError>;
}

/// Sink that drops every record; for sessions that need no audit trail.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl GenerationSink for NullSink {
    fn initialize(&mut self, _: usize, _: &[String]) -> Result<(), SinkError> {
        Ok(())
    }

    fn append(&mut self, _: &GenerationRecord) -> Result<(), SinkError> {
        Ok(())
    }
}

/// In-memory sink for tests. Clones share storage, so a test can keep one
/// handle while moving another into the swarm.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    inner: std::sync::Arc<std::sync::Mutex<MemorySinkState>>,
}

#[derive(Debug, Default)]
struct MemorySinkState {
    records: Vec<GenerationRecord>,
    initialized: Option<(usize, Vec<String>)>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// All records appended so far, in order.
    pub fn records(&self) -> Vec<GenerationRecord> {
        self.lock().records.clone()
    }

    /// Arguments of the `initialize` call, if it happened.
    pub fn initialized(&self) -> Option<(usize, Vec<String>)> {
        self.lock().initialized.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MemorySinkState> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl GenerationSink for MemorySink {
    fn initialize(
        &mut self,
        num_particles: usize,
        dimension_names: &[String],
    ) -> Result<(), SinkError> {
        self.lock().initialized = Some((num_particles, dimension_names.to_vec()));
        Ok(())
    }

    fn append(&mut self, record: &GenerationRecord) -> Result<(), SinkError> {
        self.lock().records.push(record.clone());
        Ok(())
    }
}
