//! Solve-graph error types.

use thiserror::Error;

/// Configuration errors detected while building the solve graph.
///
/// All of these are fatal for a run: they name the offending steps so the
/// user can fix the case set-up.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    /// Two solver objects declared the same solve name.
    #[error("Solve step '{step}' declared by both '{first}' and '{second}'")]
    DuplicateStep {
        step: String,
        first: String,
        second: String,
    },

    /// A required dependency names a step nobody declared.
    #[error("Solve step '{step}' requires '{dependency}', which is not present")]
    MissingDependency { step: String, dependency: String },

    /// Required dependencies form a cycle.
    #[error("Cyclic dependency among solve steps: {}", .steps.join(", "))]
    Cycle { steps: Vec<String> },

    /// An inner loop contains a step that is not in the outer corrector.
    #[error("Loop '{loop_name}' contains '{step}', which is not a member of the outer corrector")]
    LoopNotNested { loop_name: String, step: String },

    /// Two inner loops share some but not all of their steps.
    #[error("Loops '{first}' and '{second}' overlap without one containing the other")]
    OverlappingLoops { first: String, second: String },

    /// Collapsing a loop into one block would run a step before one it requires.
    #[error(
        "Loop '{loop_name}' cannot be scheduled as one block: '{step}' must run after '{dependency}'"
    )]
    NonContiguousLoop {
        loop_name: String,
        step: String,
        dependency: String,
    },

    /// Lookup of a step by name failed.
    #[error("Solve step '{step}' not found")]
    StepNotFound { step: String },
}

pub type GraphResult<T> = Result<T, GraphError>;
