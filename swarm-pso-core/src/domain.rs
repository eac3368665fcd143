//! Problem-domain adapters
//!
//! A [`DomainSpec`] tells the engine what a position looks like: the ordered
//! dimensions, their bounds and initial sampling ranges, which of them take
//! part in the stochastic velocity update, and how each value is encoded on
//! the wire. Two concrete domains ship with the engine: the swarm-robotics
//! calibration search and the self-contained Rosenbrock benchmark.

use rand::Rng;
use serde::{Deserialize, Serialize};

/// How a dimension value is rendered for workers and result logs.
///
/// The engine always stores `f64`; the encoding only matters at the
/// serialization boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValueEncoding {
    /// Plain floating point value
    Float,
    /// Truncated to an integer on read (you cannot field 4.2 robots)
    Integer,
    /// Zero is `false`, anything else is `true`
    Boolean,
}

/// One named, bounded search dimension
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DimensionSpec {
    /// Wire and results-log name of the dimension
    pub name: String,
    /// Lower clamp bound applied after every position update
    pub min: f64,
    /// Upper clamp bound applied after every position update
    pub max: f64,
    /// Lower edge of the initial sampling range
    pub init_min: f64,
    /// Upper edge of the initial sampling range
    pub init_max: f64,
    /// Whether the dimension takes part in the stochastic velocity update.
    /// Fixed-by-design parameters keep velocity 0 every generation.
    pub stochastic: bool,
    /// Wire encoding of the value
    pub encoding: ValueEncoding,
}

impl DimensionSpec {
    /// A bounded dimension sampled uniformly over its full range.
    pub fn uniform(name: &str, min: f64, max: f64) -> Self {
        Self {
            name: name.to_owned(),
            min,
            max,
            init_min: min,
            init_max: max,
            stochastic: true,
            encoding: ValueEncoding::Float,
        }
    }

    /// A dimension that starts at a fixed value for every particle.
    pub fn fixed_start(name: &str, min: f64, max: f64, start: f64) -> Self {
        Self {
            name: name.to_owned(),
            min,
            max,
            init_min: start,
            init_max: start,
            stochastic: true,
            encoding: ValueEncoding::Float,
        }
    }

    /// Exclude the dimension from the stochastic velocity update.
    pub fn pinned(mut self) -> Self {
        self.stochastic = false;
        self
    }

    /// Set the wire encoding.
    pub fn encoded_as(mut self, encoding: ValueEncoding) -> Self {
        self.encoding = encoding;
        self
    }

    /// Draw an initial value from the sampling range.
    pub fn sample_initial<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        if self.init_min == self.init_max {
            self.init_min
        } else {
            rng.random_range(self.init_min..self.init_max)
        }
    }

    /// Clamp a value into the valid range.
    pub fn clamp(&self, value: f64) -> f64 {
        value.clamp(self.min, self.max)
    }
}

/// Where fitness values come from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Objective {
    /// Fitness is evaluated by remote workers and submitted back
    Remote,
    /// `(1-x)^2 + 100*(y - x^2)^2`, evaluated by the coordinator itself
    Rosenbrock,
}

/// Position representation, bounds, and fitness semantics of one problem
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DomainSpec {
    /// Short name used in logs and error messages
    pub name: String,
    /// Ordered dimensions; positions and velocities pair with these 1:1
    pub dimensions: Vec<DimensionSpec>,
    /// Fitness source
    pub objective: Objective,
}

impl DomainSpec {
    /// The swarm-robotics calibration search.
    ///
    /// `nr_robots` and `u_plus` are fixed-by-design: both are handed to the
    /// simulator but neither moves between generations.
    pub fn robot_calibration() -> Self {
        Self {
            name: "robot_calibration".to_owned(),
            dimensions: vec![
                DimensionSpec::uniform("rw_mean", 2000.0, 8000.0),
                DimensionSpec::uniform("rw_variance", 0.0, 4000.0),
                DimensionSpec::uniform("tao", 1000.0, 3000.0),
                DimensionSpec::fixed_start("p_c", 0.85, 0.99, 0.95),
                DimensionSpec::fixed_start("nr_robots", 2.0, 10.0, 5.0)
                    .pinned()
                    .encoded_as(ValueEncoding::Integer),
                DimensionSpec::fixed_start("u_plus", 0.0, 1.0, 0.0)
                    .pinned()
                    .encoded_as(ValueEncoding::Boolean),
            ],
            objective: Objective::Remote,
        }
    }

    /// The 2D Rosenbrock benchmark: unbounded `x`/`y`, fitness computed by
    /// the coordinator itself. Useful for exercising the coordination
    /// engine without any external evaluator.
    pub fn rosenbrock() -> Self {
        let mut x = DimensionSpec::uniform("x", f64::NEG_INFINITY, f64::INFINITY);
        x.init_min = -2.0;
        x.init_max = 2.0;
        let mut y = DimensionSpec::uniform("y", f64::NEG_INFINITY, f64::INFINITY);
        y.init_min = -2.0;
        y.init_max = 2.0;
        Self {
            name: "rosenbrock".to_owned(),
            dimensions: vec![x, y],
            objective: Objective::Rosenbrock,
        }
    }

    /// Number of dimensions in this domain.
    pub fn len(&self) -> usize {
        self.dimensions.len()
    }

    /// Whether the domain has no dimensions (never true for the built-ins).
    pub fn is_empty(&self) -> bool {
        self.dimensions.is_empty()
    }

    /// Evaluate the objective locally, if this domain supports it. `None`
    /// for remote-only domains and for positions of the wrong length.
    pub fn evaluate_local(&self, position: &[f64]) -> Option<f64> {
        if position.len() != self.len() {
            return None;
        }
        match self.objective {
            Objective::Remote => None,
            Objective::Rosenbrock => {
                let x = position[0];
                let y = position[1];
                Some((1.0 - x).powi(2) + 100.0 * (y - x * x).powi(2))
            }
        }
    }
}
