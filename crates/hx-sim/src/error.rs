//! Error types for the time loop.

use hx_chemistry::ChemistryError;
use hx_core::{HxError, Real};
use hx_graph::GraphError;
use hx_models::RegistryError;
use thiserror::Error;

/// Errors that stop a run.
#[derive(Error, Debug)]
pub enum SimError {
    #[error("Invalid argument: {what}")]
    InvalidArg { what: String },

    #[error(
        "Time step {computed:e} s is below the minimum allowed minDeltaT = {min_delta_t:e} s; \
         reduce the stability limits or lower minDeltaT"
    )]
    StepBelowMinimum { computed: Real, min_delta_t: Real },

    #[error("{loop_name} did not converge within {iterations} iterations and convergence is required")]
    NotConverged { loop_name: String, iterations: usize },

    #[error("Unknown field '{name}'")]
    UnknownField { name: String },

    #[error("No solver object owns solve step '{step}'")]
    UnownedStep { step: String },

    #[error("Solver object '{object}' failed in '{step}': {message}")]
    Solve {
        object: String,
        step: String,
        message: String,
    },

    #[error("Write failed: {message}")]
    Write { message: String },

    #[error("Chemistry error: {0}")]
    Chemistry(#[from] ChemistryError),

    #[error("Solve graph error: {0}")]
    Graph(#[from] GraphError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error("Core error: {0}")]
    Core(#[from] HxError),
}

pub type SimResult<T> = Result<T, SimError>;
