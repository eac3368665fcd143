//! Swarm configuration
//!
//! All tunables are an explicit struct handed to the swarm constructor;
//! nothing is read from ambient files by the engine itself. The binary
//! loads these once at startup from a JSON settings file.

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Velocity-rule coefficients for PSO
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PsoConstants {
    /// Inertia weight (momentum, `W`)
    pub inertia: f64,
    /// Cognitive coefficient (attraction to personal best, `C_pb`)
    pub cognitive: f64,
    /// Social coefficient (attraction to global best, `C_gb`)
    pub social: f64,
}

impl Default for PsoConstants {
    fn default() -> Self {
        Self {
            inertia: 0.75,
            cognitive: 2.25,
            social: 1.5,
        }
    }
}

/// Configuration for one optimization session
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SwarmSettings {
    /// Number of particles in the swarm
    pub num_particles: usize,
    /// Number of generations before the session freezes as Completed
    pub max_generations: u32,
    /// Noisy evaluations per particle per generation; answers are averaged
    pub noise_eval_runs: u32,
    /// PSO velocity-rule coefficients
    pub constants: PsoConstants,
    /// Scale of the random initial velocity relative to the initial
    /// position value. 0 starts every particle at rest.
    pub initial_velocity_scale: f64,
    /// Fixed RNG seed for reproducible sessions; `None` seeds from entropy
    pub rng_seed: Option<u64>,
}

impl Default for SwarmSettings {
    fn default() -> Self {
        Self {
            num_particles: 10,
            max_generations: 20,
            noise_eval_runs: 10,
            constants: PsoConstants::default(),
            initial_velocity_scale: 0.1,
            rng_seed: None,
        }
    }
}

impl SwarmSettings {
    /// Reject configurations the state machine cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.num_particles == 0 {
            return Err(Error::InvalidConfig(
                "num_particles must be at least 1".into(),
            ));
        }
        if self.max_generations == 0 {
            return Err(Error::InvalidConfig(
                "max_generations must be at least 1".into(),
            ));
        }
        if self.noise_eval_runs == 0 {
            return Err(Error::InvalidConfig(
                "noise_eval_runs must be at least 1".into(),
            ));
        }
        if !self.initial_velocity_scale.is_finite() || self.initial_velocity_scale < 0.0 {
            return Err(Error::InvalidConfig(
                "initial_velocity_scale must be finite and non-negative".into(),
            ));
        }
        Ok(())
    }
}
