//! Time-loop driver of a reacting-gas simulation.
//!
//! Provides:
//! - Adaptive time-step selection from per-source stability limits
//! - Outer and nested inner correction loops with residual control
//! - Pluggable solver objects ordered by their declared solve graph
//! - Built-in objects for a homogeneous reactor (chemistry, species, energy, pressure)

pub mod correction;
pub mod error;
pub mod fields;
pub mod objects;
pub mod solver_object;
pub mod time_loop;
pub mod time_step;
pub mod write;

pub use correction::{CorrectionLoop, CorrectorSettings, LoopOutcome, LoopState};
pub use error::{SimError, SimResult};
pub use fields::FieldRegistry;
pub use objects::{DEFAULT_SOLVER_OBJECTS, create_objects, initial_fields, solver_objects};
pub use solver_object::{SolveContext, SolveOutcome, SolverObject, SolverObjectArgs, SolverObjectRegistry};
pub use time_loop::{ControlSource, RunSummary, TimeLoop, TimeLoopSettings};
pub use time_step::{
    AdaptiveTimeStep, StabilityLimit, StepDecision, StepLimiter, TimeControl, TimeStepState,
};
pub use write::{WriteControl, WriteEvent, WriteSink};
