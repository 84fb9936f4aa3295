//! Outer and inner correction loops.
//!
//! A [`CorrectionLoop`] is created at the start of each loop invocation and
//! driven with [`next_iteration`](CorrectionLoop::next_iteration):
//!
//! ```text
//! NotStarted -> Looping -> Converged | MaxIterationsReached -> Done
//! ```
//!
//! Both terminal states are normal completion. Running out of iterations
//! under residual control is logged, and only becomes an error when the
//! settings require convergence.

use std::collections::BTreeMap;

use hx_core::Real;

use crate::error::{SimError, SimResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    NotStarted,
    Looping,
    Converged,
    MaxIterationsReached,
    Done,
}

/// How one loop invocation ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopOutcome {
    Converged { iterations: usize },
    MaxIterationsReached { iterations: usize },
}

impl LoopOutcome {
    pub fn iterations(&self) -> usize {
        match self {
            Self::Converged { iterations } | Self::MaxIterationsReached { iterations } => *iterations,
        }
    }
}

/// Iteration budget and termination criterion of one named loop.
#[derive(Debug, Clone, PartialEq)]
pub struct CorrectorSettings {
    pub max_iterations: usize,
    /// Converged once every residual reported in an iteration is at or
    /// below this value. `None` runs exactly `max_iterations` passes.
    pub residual_tolerance: Option<Real>,
    /// Treat running out of iterations under residual control as fatal.
    pub convergence_required: bool,
}

impl Default for CorrectorSettings {
    fn default() -> Self {
        Self {
            max_iterations: 1,
            residual_tolerance: None,
            convergence_required: false,
        }
    }
}

impl CorrectorSettings {
    pub fn iterations(max_iterations: usize) -> Self {
        Self {
            max_iterations,
            ..Self::default()
        }
    }

    pub fn validate(&self, loop_name: &str) -> SimResult<()> {
        if self.max_iterations == 0 {
            return Err(SimError::InvalidArg {
                what: format!("{loop_name} needs at least one iteration"),
            });
        }
        if let Some(tol) = self.residual_tolerance {
            if !(tol >= 0.0) {
                return Err(SimError::InvalidArg {
                    what: format!("{loop_name} residual tolerance must be non-negative"),
                });
            }
        }
        Ok(())
    }
}

#[derive(Debug)]
pub struct CorrectionLoop {
    name: String,
    settings: CorrectorSettings,
    state: LoopState,
    iteration: usize,
    residuals: BTreeMap<String, Real>,
}

impl CorrectionLoop {
    pub fn new(name: impl Into<String>, settings: CorrectorSettings) -> Self {
        Self {
            name: name.into(),
            settings,
            state: LoopState::NotStarted,
            iteration: 0,
            residuals: BTreeMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    /// Current iteration, starting at 1 once looping.
    pub fn iteration(&self) -> usize {
        self.iteration
    }

    /// True during the last pass the budget allows.
    pub fn is_final_iteration(&self) -> bool {
        self.state == LoopState::Looping && self.iteration >= self.settings.max_iterations
    }

    /// Record the residual of one solve in the current iteration.
    ///
    /// Repeated reports for the same solve keep the largest.
    pub fn report_residual(&mut self, solve: &str, residual: Real) {
        let entry = self.residuals.entry(solve.to_string()).or_insert(0.0);
        if !(residual <= *entry) {
            *entry = residual;
        }
    }

    fn converged(&self) -> bool {
        match self.settings.residual_tolerance {
            Some(tol) => !self.residuals.is_empty() && self.residuals.values().all(|r| *r <= tol),
            None => false,
        }
    }

    /// Advance the loop; returns true if another pass should run.
    pub fn next_iteration(&mut self) -> bool {
        match self.state {
            LoopState::NotStarted => {
                self.state = LoopState::Looping;
                self.iteration = 1;
                true
            }
            LoopState::Looping => {
                if self.converged() {
                    self.state = LoopState::Converged;
                    false
                } else if self.iteration >= self.settings.max_iterations {
                    self.state = LoopState::MaxIterationsReached;
                    false
                } else {
                    self.iteration += 1;
                    self.residuals.clear();
                    true
                }
            }
            _ => false,
        }
    }

    /// Close the loop after `next_iteration` returned false.
    pub fn finish(&mut self) -> SimResult<LoopOutcome> {
        let iterations = self.iteration;
        let outcome = match self.state {
            LoopState::Converged => {
                tracing::debug!(loop_name = %self.name, iterations, "converged");
                LoopOutcome::Converged { iterations }
            }
            LoopState::MaxIterationsReached => {
                if self.settings.residual_tolerance.is_some() {
                    if self.settings.convergence_required {
                        self.state = LoopState::Done;
                        return Err(SimError::NotConverged {
                            loop_name: self.name.clone(),
                            iterations,
                        });
                    }
                    tracing::warn!(
                        loop_name = %self.name,
                        iterations,
                        residuals = ?self.residuals,
                        "not converged within iteration budget"
                    );
                }
                LoopOutcome::MaxIterationsReached { iterations }
            }
            state => {
                return Err(SimError::InvalidArg {
                    what: format!("{} finished while {state:?}", self.name),
                });
            }
        };
        self.state = LoopState::Done;
        Ok(outcome)
    }
}
