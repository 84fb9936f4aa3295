//! Pluggable physics modules driven by the time loop.

use std::fmt;

use hx_chemistry::{ChemistrySettings, ChemistrySolverSettings, Mechanism};
use hx_core::Real;
use hx_graph::SolveContribution;
use hx_models::ModelRegistry;

use crate::error::SimResult;
use crate::fields::FieldRegistry;
use crate::time_step::StabilityLimit;

/// Everything a solve step may read or change.
#[derive(Debug)]
pub struct SolveContext<'a> {
    /// Time at the end of the step being solved.
    pub time: Real,
    pub delta_t: Real,
    /// Outer corrector pass, starting at 1.
    pub outer_iteration: usize,
    /// True in the last pass of the innermost running loop.
    pub final_iteration: bool,
    pub fields: &'a mut FieldRegistry,
}

impl SolveContext<'_> {
    pub fn first_outer_iteration(&self) -> bool {
        self.outer_iteration <= 1
    }
}

/// Result of one solve.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SolveOutcome {
    /// Residual used for convergence control of the enclosing loops.
    pub residual: Option<Real>,
}

impl SolveOutcome {
    pub fn residual(residual: Real) -> Self {
        Self {
            residual: Some(residual),
        }
    }
}

/// A physics module contributing solve steps to the solve graph.
pub trait SolverObject: Send + fmt::Debug {
    /// Unique name, used as the owner of its solve steps.
    fn name(&self) -> &str;

    /// Solve names, dependencies and loop memberships.
    fn solve_graph(&self) -> SolveContribution;

    /// Called once before the initialisation loop.
    fn initialise(&mut self, _fields: &mut FieldRegistry) -> SimResult<()> {
        Ok(())
    }

    /// The object's constraint on the next time step, if any.
    fn max_time_step(&self, _fields: &FieldRegistry) -> Option<StabilityLimit> {
        None
    }

    /// Run the named solve step.
    fn correct(&mut self, solve: &str, ctx: &mut SolveContext<'_>) -> SimResult<SolveOutcome>;

    /// Whether the pass in `loop_name` is the final one for this object.
    fn is_final_corrector(&self, _loop_name: &str, final_iteration: bool) -> bool {
        final_iteration
    }

    /// Named scalars logged after every time step.
    fn diagnostics(&self, _fields: &FieldRegistry) -> Vec<(String, Real)> {
        Vec::new()
    }
}

/// Construction arguments for the built-in solver objects.
#[derive(Debug, Clone)]
pub struct SolverObjectArgs {
    pub mechanism: Mechanism,
    pub chemistry_solver: String,
    pub chemistry_solver_settings: ChemistrySolverSettings,
    pub chemistry_settings: ChemistrySettings,
    /// Closed cell at fixed density instead of fixed pressure.
    pub constant_volume: bool,
}

pub type SolverObjectRegistry = ModelRegistry<dyn SolverObject, SolverObjectArgs, crate::error::SimError>;
