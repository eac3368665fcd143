//! Swarm coordination
//!
//! The [`Swarm`] owns the full particle population, the global best, and the
//! generation counter. It is the single serialized owner of all session
//! state: `request_work` and `submit_result` are non-blocking and must be
//! called from one logical thread of control (see the coordinator actor in
//! the `swarm-pso` crate).

use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::config::SwarmSettings;
use crate::domain::{DomainSpec, Objective};
use crate::particle::{Particle, ParticleState, WorkItem};
use crate::record::GenerationSink;
use crate::{Error, Result};

/// Session state over the whole optimization
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwarmStatus {
    /// `generation < max_generations`; work is still handed out
    Running,
    /// Terminal; all requests answer "completed", all submissions drop
    Completed,
}

/// Answer to a work request
#[derive(Debug, Clone, PartialEq)]
pub enum WorkReply {
    /// Evaluate this run and submit the fitness back
    Assignment(WorkItem),
    /// The session is over; stop polling
    Completed,
}

/// Coordinator for one PSO session
pub struct Swarm {
    settings: SwarmSettings,
    domain: DomainSpec,
    generation: u32,
    particles: Vec<Particle>,
    global_best: Vec<f64>,
    global_best_fitness: f64,
    status: SwarmStatus,
    rng: StdRng,
    sink: Box<dyn GenerationSink>,
}

impl Swarm {
    /// Create a session with particles sampled from the domain's initial
    /// ranges. The sink is initialized for the session up front.
    pub fn new(
        settings: SwarmSettings,
        domain: DomainSpec,
        sink: Box<dyn GenerationSink>,
    ) -> Result<Self> {
        settings.validate()?;
        let mut rng = match settings.rng_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        let particles: Vec<Particle> = (0..settings.num_particles)
            .map(|id| Particle::new(id, &domain, &settings, &mut rng))
            .collect();
        Self::assemble(settings, domain, particles, rng, sink)
    }

    /// Create a session with explicit starting positions, one per particle.
    /// `settings.num_particles` must match the number of positions.
    pub fn with_positions(
        settings: SwarmSettings,
        domain: DomainSpec,
        positions: Vec<Vec<f64>>,
        sink: Box<dyn GenerationSink>,
    ) -> Result<Self> {
        settings.validate()?;
        if positions.len() != settings.num_particles {
            return Err(Error::InvalidConfig(format!(
                "expected {} starting positions, got {}",
                settings.num_particles,
                positions.len()
            )));
        }
        if let Some(bad) = positions.iter().find(|p| p.len() != domain.len()) {
            return Err(Error::InvalidConfig(format!(
                "starting position has {} values, domain `{}` has {} dimensions",
                bad.len(),
                domain.name,
                domain.len()
            )));
        }
        let mut rng = match settings.rng_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        let particles: Vec<Particle> = positions
            .into_iter()
            .enumerate()
            .map(|(id, position)| {
                Particle::with_position(id, &domain, &settings, position, &mut rng)
            })
            .collect();
        Self::assemble(settings, domain, particles, rng, sink)
    }

    fn assemble(
        settings: SwarmSettings,
        domain: DomainSpec,
        particles: Vec<Particle>,
        rng: StdRng,
        mut sink: Box<dyn GenerationSink>,
    ) -> Result<Self> {
        let dimension_names: Vec<String> = domain
            .dimensions
            .iter()
            .map(|dim| dim.name.clone())
            .collect();
        sink.initialize(particles.len(), &dimension_names)?;

        // Until anything is evaluated, the global best position is an
        // arbitrary snapshot (particle 0) paired with +inf fitness, so the
        // first completed generation always replaces it.
        let global_best = particles[0].position().to_vec();
        tracing::info!(
            domain = %domain.name,
            num_particles = particles.len(),
            max_generations = settings.max_generations,
            noise_eval_runs = settings.noise_eval_runs,
            "swarm session created"
        );
        Ok(Self {
            settings,
            domain,
            generation: 0,
            particles,
            global_best,
            global_best_fitness: f64::INFINITY,
            status: SwarmStatus::Running,
            rng,
            sink,
        })
    }

    /// Current generation number (starts at 0, increments on advancement).
    pub fn generation(&self) -> u32 {
        self.generation
    }

    pub fn status(&self) -> SwarmStatus {
        self.status
    }

    /// Best position seen over any completed generation (value snapshot).
    pub fn global_best(&self) -> &[f64] {
        &self.global_best
    }

    /// Best fitness seen over any completed generation; `+inf` before the
    /// first one completes.
    pub fn global_best_fitness(&self) -> f64 {
        self.global_best_fitness
    }

    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    pub fn domain(&self) -> &DomainSpec {
        &self.domain
    }

    pub fn settings(&self) -> &SwarmSettings {
        &self.settings
    }

    /// Hand out the next piece of evaluation work.
    ///
    /// Particles already in flight are finished before new ones start. When
    /// every particle of the generation is solved the swarm advances first,
    /// then serves the new generation (or reports completion).
    pub fn request_work(&mut self) -> Result<WorkReply> {
        if self.status == SwarmStatus::Completed {
            return Ok(WorkReply::Completed);
        }

        let next = self
            .particles
            .iter()
            .position(|p| p.state() == ParticleState::Requested)
            .or_else(|| {
                self.particles
                    .iter()
                    .position(|p| p.state() == ParticleState::Unsolved)
            });

        let generation = self.generation;
        match next {
            Some(idx) => {
                let item = self.particles[idx].request_work(generation, &self.domain)?;
                Ok(WorkReply::Assignment(item))
            }
            None => {
                // Every particle is solved. Advancement normally happens on
                // the closing submission; a request arriving first triggers
                // it here instead.
                self.advance_generation()?;
                if self.status == SwarmStatus::Completed {
                    return Ok(WorkReply::Completed);
                }
                let generation = self.generation;
                let item = self.particles[0].request_work(generation, &self.domain)?;
                Ok(WorkReply::Assignment(item))
            }
        }
    }

    /// Route a worker's answer to its particle.
    ///
    /// Results tagged with a past generation are void: the worker was too
    /// slow and the swarm has moved on. This is the only defense against
    /// races between slow workers and generation advancement. Submissions
    /// after completion are ignored entirely.
    pub fn submit_result(
        &mut self,
        particle_id: usize,
        generation: u32,
        run_id: u32,
        value: f64,
    ) -> Result<()> {
        if self.status == SwarmStatus::Completed {
            tracing::debug!(particle_id, "submission after completion ignored");
            return Ok(());
        }
        if generation != self.generation {
            tracing::debug!(
                particle_id,
                submitted = generation,
                current = self.generation,
                "stale submission discarded"
            );
            return Ok(());
        }

        let particle = self
            .particles
            .get_mut(particle_id)
            .ok_or(Error::UnknownParticle(particle_id))?;
        let solved = particle.submit_result(run_id, value);

        if solved
            && self
                .particles
                .iter()
                .all(|p| p.state() == ParticleState::Solved)
        {
            self.advance_generation()?;
        }
        Ok(())
    }

    /// Drive the session to completion without external workers.
    ///
    /// Only valid for domains with a local objective (Rosenbrock); the
    /// coordinator evaluates each assignment itself and submits the answer
    /// straight back.
    pub fn solve_locally(&mut self) -> Result<()> {
        if self.domain.objective == Objective::Remote {
            return Err(Error::NoLocalObjective(self.domain.name.clone()));
        }
        loop {
            match self.request_work()? {
                WorkReply::Completed => return Ok(()),
                WorkReply::Assignment(item) => {
                    let position = item.raw_position();
                    let value = self
                        .domain
                        .evaluate_local(&position)
                        .ok_or_else(|| Error::NoLocalObjective(self.domain.name.clone()))?;
                    self.submit_result(item.particle_id, item.generation, item.run_id, value)?;
                }
            }
        }
    }

    /// Close the generation: refresh the global best from this generation's
    /// aggregates, then update every particle's velocity against the fresh
    /// best, move it, persist its record, and reset it for the next round.
    fn advance_generation(&mut self) -> Result<()> {
        tracing::info!(generation = self.generation, "generation complete");

        // Strict improvement only; ties keep the previous best, which keeps
        // repeated sessions reproducible.
        for particle in &self.particles {
            if particle.current_fitness() < self.global_best_fitness {
                self.global_best_fitness = particle.current_fitness();
                self.global_best = particle.position().to_vec();
            }
        }

        let generation = self.generation;
        for particle in &mut self.particles {
            particle.update_velocity(
                &self.global_best,
                &self.settings.constants,
                &self.domain,
                &mut self.rng,
            );
            let record =
                particle.advance_generation(generation, &self.domain, self.settings.noise_eval_runs);
            self.sink.append(&record)?;
        }

        self.generation += 1;
        if self.generation >= self.settings.max_generations {
            self.status = SwarmStatus::Completed;
            tracing::info!(
                best_fitness = self.global_best_fitness,
                "session completed"
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::NullSink;

    fn settings(num_particles: usize, max_generations: u32, runs: u32) -> SwarmSettings {
        SwarmSettings {
            num_particles,
            max_generations,
            noise_eval_runs: runs,
            initial_velocity_scale: 0.0,
            rng_seed: Some(42),
            ..Default::default()
        }
    }

    fn rosenbrock_swarm(num_particles: usize, max_generations: u32, runs: u32) -> Swarm {
        Swarm::new(
            settings(num_particles, max_generations, runs),
            DomainSpec::rosenbrock(),
            Box::new(NullSink),
        )
        .unwrap()
    }

    fn drain_generation(swarm: &mut Swarm) {
        // Answer every outstanding assignment of the current generation.
        let generation = swarm.generation();
        while swarm.generation() == generation && swarm.status() == SwarmStatus::Running {
            match swarm.request_work().unwrap() {
                WorkReply::Assignment(item) => swarm
                    .submit_result(item.particle_id, item.generation, item.run_id, 1.0)
                    .unwrap(),
                WorkReply::Completed => break,
            }
        }
    }

    #[test]
    fn in_flight_particles_are_served_before_fresh_ones() {
        let mut swarm = rosenbrock_swarm(3, 2, 2);
        let first = match swarm.request_work().unwrap() {
            WorkReply::Assignment(item) => item,
            WorkReply::Completed => panic!("session should be running"),
        };
        assert_eq!(first.particle_id, 0);
        // Particle 0 still has an unsolved run; it keeps priority.
        let second = match swarm.request_work().unwrap() {
            WorkReply::Assignment(item) => item,
            WorkReply::Completed => panic!("session should be running"),
        };
        assert_eq!(second.particle_id, 0);
        assert_eq!(second.run_id, 1);
    }

    #[test]
    fn submission_for_past_generation_never_mutates_state() {
        let mut swarm = rosenbrock_swarm(1, 3, 1);
        drain_generation(&mut swarm);
        assert_eq!(swarm.generation(), 1);

        // A slow worker answers generation 0 again.
        swarm.submit_result(0, 0, 0, 123.0).unwrap();
        assert_eq!(swarm.generation(), 1);
        assert_eq!(swarm.particles()[0].state(), ParticleState::Unsolved);
        assert!(swarm.particles()[0].runs().iter().all(|r| r.is_unsolved()));
    }

    #[test]
    fn unknown_particle_is_an_error() {
        let mut swarm = rosenbrock_swarm(2, 2, 1);
        assert!(matches!(
            swarm.submit_result(9, 0, 0, 1.0),
            Err(Error::UnknownParticle(9))
        ));
    }

    #[test]
    fn generation_is_monotonic_and_closing_submission_advances() {
        let mut swarm = rosenbrock_swarm(2, 5, 1);
        assert_eq!(swarm.generation(), 0);

        let a = match swarm.request_work().unwrap() {
            WorkReply::Assignment(item) => item,
            _ => panic!(),
        };
        let b = match swarm.request_work().unwrap() {
            WorkReply::Assignment(item) => item,
            _ => panic!(),
        };
        swarm.submit_result(a.particle_id, 0, a.run_id, 0.5).unwrap();
        assert_eq!(swarm.generation(), 0);
        // The last submission of the generation advances eagerly.
        swarm.submit_result(b.particle_id, 0, b.run_id, 0.2).unwrap();
        assert_eq!(swarm.generation(), 1);
    }

    #[test]
    fn completion_closure() {
        let mut swarm = rosenbrock_swarm(1, 1, 1);
        drain_generation(&mut swarm);
        assert_eq!(swarm.status(), SwarmStatus::Completed);

        for _ in 0..5 {
            assert_eq!(swarm.request_work().unwrap(), WorkReply::Completed);
            swarm.submit_result(0, 1, 0, 7.0).unwrap();
        }
        assert_eq!(swarm.generation(), 1);
        assert_eq!(swarm.status(), SwarmStatus::Completed);
    }

    #[test]
    fn global_best_never_worsens_across_generations() {
        let mut swarm = rosenbrock_swarm(4, 10, 2);
        let mut best_after_each: Vec<f64> = Vec::new();
        while swarm.status() == SwarmStatus::Running {
            let before = swarm.generation();
            drain_local_generation(&mut swarm);
            if swarm.generation() > before {
                best_after_each.push(swarm.global_best_fitness());
            }
        }
        for window in best_after_each.windows(2) {
            assert!(window[1] <= window[0]);
        }
    }

    fn drain_local_generation(swarm: &mut Swarm) {
        let generation = swarm.generation();
        while swarm.generation() == generation && swarm.status() == SwarmStatus::Running {
            match swarm.request_work().unwrap() {
                WorkReply::Assignment(item) => {
                    let value = swarm
                        .domain()
                        .evaluate_local(&item.raw_position())
                        .unwrap();
                    swarm
                        .submit_result(item.particle_id, item.generation, item.run_id, value)
                        .unwrap();
                }
                WorkReply::Completed => break,
            }
        }
    }

    #[test]
    fn bounds_hold_after_every_advancement() {
        let mut swarm = Swarm::new(
            SwarmSettings {
                num_particles: 3,
                max_generations: 6,
                noise_eval_runs: 1,
                initial_velocity_scale: 0.1,
                rng_seed: Some(7),
                ..Default::default()
            },
            DomainSpec::robot_calibration(),
            Box::new(NullSink),
        )
        .unwrap();

        let mut answer = 10.0;
        while swarm.status() == SwarmStatus::Running {
            match swarm.request_work().unwrap() {
                WorkReply::Assignment(item) => {
                    answer *= 0.9;
                    swarm
                        .submit_result(item.particle_id, item.generation, item.run_id, answer)
                        .unwrap();
                }
                WorkReply::Completed => break,
            }
            for particle in swarm.particles() {
                for (dim, &v) in swarm
                    .domain()
                    .dimensions
                    .iter()
                    .zip(particle.position())
                {
                    assert!(v >= dim.min && v <= dim.max, "{} out of range: {}", dim.name, v);
                }
            }
        }
    }

    #[test]
    fn sink_gets_one_record_per_particle_per_generation() {
        let sink = crate::record::MemorySink::new();
        let mut swarm = Swarm::new(
            settings(3, 4, 1),
            DomainSpec::rosenbrock(),
            Box::new(sink.clone()),
        )
        .unwrap();
        swarm.solve_locally().unwrap();

        let records = sink.records();
        assert_eq!(records.len(), 3 * 4);
        for generation in 0..4u32 {
            for particle_id in 0..3usize {
                assert!(records
                    .iter()
                    .any(|r| r.generation == generation && r.particle_id == particle_id));
            }
        }
        assert_eq!(sink.initialized().unwrap().0, 3);
    }

    #[test]
    fn solve_locally_rejects_remote_domains() {
        let mut swarm = Swarm::new(
            settings(2, 2, 1),
            DomainSpec::robot_calibration(),
            Box::new(NullSink),
        )
        .unwrap();
        assert!(matches!(
            swarm.solve_locally(),
            Err(Error::NoLocalObjective(_))
        ));
    }

    #[test]
    fn rosenbrock_session_improves_over_generations() {
        let mut swarm = rosenbrock_swarm(8, 25, 1);
        swarm.solve_locally().unwrap();
        let best = swarm.global_best_fitness();
        // Not a convergence proof, just a sanity floor: 25 generations of
        // 8 particles should land well under the typical random draw.
        assert!(best.is_finite());
        assert!(best < 100.0, "best fitness stayed at {}", best);
    }
}
