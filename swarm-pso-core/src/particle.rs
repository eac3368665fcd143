//! Particles
//!
//! A particle owns one candidate point in search space and the
//! noisy-evaluation protocol around it: a fresh set of
//! [`EvaluationRun`]s every generation, the personal best as a value
//! snapshot, and the canonical PSO velocity rule.

use rand::Rng;

use crate::config::{PsoConstants, SwarmSettings};
use crate::domain::{DomainSpec, ValueEncoding};
use crate::record::GenerationRecord;
use crate::run::EvaluationRun;
use crate::{Error, Result};

/// State of a particle within one generation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParticleState {
    /// No run of this generation handed out yet
    Unsolved,
    /// At least one run is in flight
    Requested,
    /// Every run answered; aggregate fitness is defined
    Solved,
}

/// One named position value, carrying its wire encoding
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    pub name: String,
    pub value: f64,
    pub encoding: ValueEncoding,
}

/// Work descriptor handed to a worker: which run to evaluate, at which
/// position. Position values are a snapshot taken at request time.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkItem {
    pub particle_id: usize,
    pub generation: u32,
    pub run_id: u32,
    pub parameters: Vec<Parameter>,
}

impl WorkItem {
    /// The raw position values, in domain dimension order.
    pub fn raw_position(&self) -> Vec<f64> {
        self.parameters.iter().map(|p| p.value).collect()
    }
}

/// One candidate solution and its evaluation bookkeeping
#[derive(Debug, Clone)]
pub struct Particle {
    id: usize,
    position: Vec<f64>,
    velocity: Vec<f64>,
    personal_best: Vec<f64>,
    personal_best_fitness: f64,
    current_fitness: f64,
    state: ParticleState,
    runs: Vec<EvaluationRun>,
    fitness_history: Vec<f64>,
}

impl Particle {
    /// Create a particle with a position sampled from the domain's initial
    /// ranges.
    pub fn new<R: Rng + ?Sized>(
        id: usize,
        domain: &DomainSpec,
        settings: &SwarmSettings,
        rng: &mut R,
    ) -> Self {
        let position: Vec<f64> = domain
            .dimensions
            .iter()
            .map(|dim| dim.sample_initial(rng))
            .collect();
        Self::with_position(id, domain, settings, position, rng)
    }

    /// Create a particle at an explicit starting position.
    ///
    /// The personal best starts as a snapshot of the initial position with
    /// fitness `+inf`, so the first completed generation always claims it.
    pub fn with_position<R: Rng + ?Sized>(
        id: usize,
        domain: &DomainSpec,
        settings: &SwarmSettings,
        position: Vec<f64>,
        rng: &mut R,
    ) -> Self {
        debug_assert_eq!(position.len(), domain.len());
        let velocity = domain
            .dimensions
            .iter()
            .zip(&position)
            .map(|(dim, &v)| {
                let span = v.abs() * settings.initial_velocity_scale;
                if dim.stochastic && span > 0.0 {
                    rng.random_range(-span..span)
                } else {
                    0.0
                }
            })
            .collect();
        Self {
            id,
            personal_best: position.clone(),
            position,
            velocity,
            personal_best_fitness: f64::INFINITY,
            current_fitness: f64::INFINITY,
            state: ParticleState::Unsolved,
            runs: fresh_runs(settings.noise_eval_runs),
            fitness_history: Vec::new(),
        }
    }

    pub fn id(&self) -> usize {
        self.id
    }

    pub fn state(&self) -> ParticleState {
        self.state
    }

    pub fn position(&self) -> &[f64] {
        &self.position
    }

    pub fn velocity(&self) -> &[f64] {
        &self.velocity
    }

    /// Personal-best position snapshot.
    pub fn personal_best(&self) -> &[f64] {
        &self.personal_best
    }

    pub fn personal_best_fitness(&self) -> f64 {
        self.personal_best_fitness
    }

    /// Aggregate fitness of the current generation. Only meaningful once
    /// the particle is `Solved`; `+inf` before the first completion.
    pub fn current_fitness(&self) -> f64 {
        self.current_fitness
    }

    pub fn runs(&self) -> &[EvaluationRun] {
        &self.runs
    }

    /// Fitness of every completed generation, oldest first.
    pub fn fitness_history(&self) -> &[f64] {
        &self.fitness_history
    }

    /// Hand out evaluation work for this generation.
    ///
    /// The first unsolved run (in id order) wins and is marked in progress.
    /// With nothing unsolved left, the first in-flight run is re-offered so
    /// duplicate dispatch never mints extra runs. If every run is already
    /// solved the caller should have finalized this particle; that is a
    /// coordinator bug and fails loudly.
    pub fn request_work(&mut self, generation: u32, domain: &DomainSpec) -> Result<WorkItem> {
        if self.state == ParticleState::Unsolved {
            self.state = ParticleState::Requested;
        }

        if let Some(run) = self.runs.iter_mut().find(|run| run.is_unsolved()) {
            run.mark_in_progress();
            let run_id = run.id();
            return Ok(self.work_item(generation, run_id, domain));
        }

        if let Some(run) = self.runs.iter().find(|run| run.is_in_progress()) {
            return Ok(self.work_item(generation, run.id(), domain));
        }

        tracing::error!(
            particle_id = self.id,
            "all runs solved but particle was never finalized"
        );
        Err(Error::ProtocolViolation { particle: self.id })
    }

    /// Record a worker's answer for one run.
    ///
    /// A no-op when the particle is already solved (late duplicate).
    /// Returns `true` when this submission completed the particle, i.e.
    /// every run is now solved and the aggregate fitness was just computed.
    pub fn submit_result(&mut self, run_id: u32, value: f64) -> bool {
        if self.state == ParticleState::Solved {
            tracing::debug!(
                particle_id = self.id,
                run_id,
                "submission for solved particle discarded"
            );
            return false;
        }

        match self.runs.iter_mut().find(|run| run.id() == run_id) {
            Some(run) => run.record_answer(value),
            None => {
                tracing::debug!(
                    particle_id = self.id,
                    run_id,
                    "submission for unknown run discarded"
                );
                return false;
            }
        }

        if !self.runs.iter().all(|run| run.is_solved()) {
            return false;
        }

        // Aggregate over the noisy evaluations, then update the personal
        // best exactly once, comparing the previous aggregate against the
        // new one.
        self.current_fitness = self.mean_answer();
        if self.current_fitness < self.personal_best_fitness {
            self.personal_best = self.position.clone();
            self.personal_best_fitness = self.current_fitness;
        }
        self.state = ParticleState::Solved;
        tracing::debug!(
            particle_id = self.id,
            fitness = self.current_fitness,
            "particle solved"
        );
        true
    }

    /// Apply the PSO velocity rule against the supplied global best.
    ///
    /// `r1`/`r2` are drawn independently per dimension. Dimensions excluded
    /// from the stochastic update get velocity 0 every generation.
    pub fn update_velocity<R: Rng + ?Sized>(
        &mut self,
        global_best: &[f64],
        constants: &PsoConstants,
        domain: &DomainSpec,
        rng: &mut R,
    ) {
        for (d, dim) in domain.dimensions.iter().enumerate() {
            if !dim.stochastic {
                self.velocity[d] = 0.0;
                continue;
            }
            let r1: f64 = rng.random_range(0.0..1.0);
            let r2: f64 = rng.random_range(0.0..1.0);
            let v = self.position[d];
            self.velocity[d] = constants.inertia * self.velocity[d]
                + constants.cognitive * r1 * (self.personal_best[d] - v)
                + constants.social * r2 * (global_best[d] - v);
        }
    }

    /// Close out the generation: record the evaluated position, move along
    /// the velocity, clamp into bounds, and reset for the next generation.
    ///
    /// Must only be called on a `Solved` particle, after
    /// [`Particle::update_velocity`].
    pub fn advance_generation(
        &mut self,
        generation: u32,
        domain: &DomainSpec,
        noise_eval_runs: u32,
    ) -> GenerationRecord {
        debug_assert_eq!(self.state, ParticleState::Solved);
        self.fitness_history.push(self.current_fitness);

        let record = GenerationRecord {
            particle_id: self.id,
            generation,
            position: domain
                .dimensions
                .iter()
                .zip(&self.position)
                .map(|(dim, &v)| (dim.name.clone(), v))
                .collect(),
            fitness: self.current_fitness,
            personal_best_fitness: self.personal_best_fitness,
        };

        for (d, dim) in domain.dimensions.iter().enumerate() {
            self.position[d] = dim.clamp(self.position[d] + self.velocity[d]);
        }

        self.state = ParticleState::Unsolved;
        self.runs = fresh_runs(noise_eval_runs);
        record
    }

    fn work_item(&self, generation: u32, run_id: u32, domain: &DomainSpec) -> WorkItem {
        WorkItem {
            particle_id: self.id,
            generation,
            run_id,
            parameters: domain
                .dimensions
                .iter()
                .zip(&self.position)
                .map(|(dim, &value)| Parameter {
                    name: dim.name.clone(),
                    value,
                    encoding: dim.encoding,
                })
                .collect(),
        }
    }

    fn mean_answer(&self) -> f64 {
        let sum: f64 = self.runs.iter().filter_map(|run| run.answer()).sum();
        sum / self.runs.len() as f64
    }
}

fn fresh_runs(count: u32) -> Vec<EvaluationRun> {
    (0..count).map(EvaluationRun::new).collect()
}
