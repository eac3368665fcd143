//! Evaluation runs
//!
//! A run is the smallest unit of dispatchable work: one noisy fitness
//! evaluation of a fixed particle position. Runs move strictly forward
//! through `Unsolved -> InProgress -> Solved`; a solved answer is immutable.

/// State of a single evaluation run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    /// Never handed out
    Unsolved,
    /// Handed to a worker, answer outstanding
    InProgress,
    /// Answer recorded
    Solved,
}

/// One noisy fitness evaluation of a particle's current position
#[derive(Debug, Clone)]
pub struct EvaluationRun {
    id: u32,
    state: RunState,
    answer: Option<f64>,
}

impl EvaluationRun {
    /// Create a fresh, unsolved run.
    pub fn new(id: u32) -> Self {
        Self {
            id,
            state: RunState::Unsolved,
            answer: None,
        }
    }

    /// Run identifier, unique within one particle generation.
    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn is_unsolved(&self) -> bool {
        self.state == RunState::Unsolved
    }

    pub fn is_in_progress(&self) -> bool {
        self.state == RunState::InProgress
    }

    pub fn is_solved(&self) -> bool {
        self.state == RunState::Solved
    }

    /// The recorded answer, present once solved.
    pub fn answer(&self) -> Option<f64> {
        self.answer
    }

    /// Hand the run to a worker. Only an `Unsolved` run transitions;
    /// re-marking an in-flight run is a no-op so duplicate dispatch of the
    /// same run stays harmless.
    pub fn mark_in_progress(&mut self) {
        match self.state {
            RunState::Unsolved => self.state = RunState::InProgress,
            RunState::InProgress | RunState::Solved => {}
        }
    }

    /// Record a worker's answer. The first write wins; repeated submissions
    /// for a solved run are silently discarded, which tolerates at-least-once
    /// delivery from unreliable workers.
    pub fn record_answer(&mut self, value: f64) {
        match self.state {
            RunState::Unsolved | RunState::InProgress => {
                self.answer = Some(value);
                self.state = RunState::Solved;
            }
            RunState::Solved => {
                tracing::debug!(run_id = self.id, value, "duplicate answer discarded");
            }
        }
    }
}
