//! Error types for chemistry integration.

use hx_core::{HxError, Real};
use hx_models::RegistryError;
use thiserror::Error;

/// Errors that can occur while integrating reaction kinetics.
#[derive(Error, Debug)]
pub enum ChemistryError {
    #[error("Invalid argument: {what}")]
    InvalidArg { what: String },

    #[error("Non-physical state: {what}")]
    NonPhysical { what: String },

    #[error("Unknown specie '{name}'. Valid species are: {}", .valid.join(", "))]
    UnknownSpecie { name: String, valid: Vec<String> },

    #[error("Singular matrix: {what}")]
    SingularMatrix { what: &'static str },

    #[error("Unresolvable stiffness in cell {cell} with {time_left:e} s left: {reason}")]
    UnresolvableStiffness {
        cell: usize,
        time_left: Real,
        reason: String,
    },

    #[error("ODE step size underflow at x = {x:e}: dx = {dx:e}")]
    StepUnderflow { x: Real, dx: Real },

    #[error("Integration steps greater than maximum {max_steps}")]
    TooManySteps { max_steps: usize },

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error("Core error: {0}")]
    Core(#[from] HxError),
}

pub type ChemistryResult<T> = Result<T, ChemistryError>;

impl ChemistryError {
    /// True for failures that mean the kinetics cannot be resolved at any
    /// admissible step size.
    pub fn is_stiffness(&self) -> bool {
        matches!(
            self,
            ChemistryError::UnresolvableStiffness { .. }
                | ChemistryError::StepUnderflow { .. }
                | ChemistryError::TooManySteps { .. }
        )
    }
}
