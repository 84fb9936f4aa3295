//! Per-cell chemistry solvers selected by name.

mod euler_implicit;
mod none;
mod ode;

use std::fmt;

use hx_core::Real;
use hx_models::{ModelRegistry, RegistryError};

use crate::error::{ChemistryError, ChemistryResult};
use crate::mechanism::Mechanism;
use crate::ode::OdeSettings;

pub use euler_implicit::EulerImplicit;
pub use none::NoChemistrySolver;
pub use ode::OdeChemistrySolver;

/// Thermochemical state of one cell as seen by a chemistry solver.
#[derive(Debug, Clone, PartialEq)]
pub struct ReactorState {
    /// Concentrations [kmol/m^3]
    pub c: Vec<Real>,
    pub t: Real,
    pub p: Real,
}

/// Advances one cell's kinetics over (part of) a macro time step.
pub trait ChemistrySolver: Send + Sync + fmt::Debug {
    fn name(&self) -> &'static str;

    /// Advance `state` by at most `*dt`.
    ///
    /// On return `*dt` is the interval actually covered and `*sub_dt` the
    /// solver's estimate of a stable chemical time step for the cell.
    fn solve(
        &self,
        mechanism: &Mechanism,
        state: &mut ReactorState,
        dt: &mut Real,
        sub_dt: &mut Real,
    ) -> ChemistryResult<()>;
}

/// Construction arguments shared by all chemistry solvers.
#[derive(Debug, Clone, PartialEq)]
pub struct ChemistrySolverSettings {
    /// ODE solver used by the `ode` chemistry solver.
    pub ode_solver: String,
    pub ode: OdeSettings,
    /// Fraction of the fastest depletion time taken per `EulerImplicit` step.
    pub c_tau_chem: Real,
}

impl Default for ChemistrySolverSettings {
    fn default() -> Self {
        Self {
            ode_solver: "Rosenbrock23".into(),
            ode: OdeSettings::default(),
            c_tau_chem: 0.05,
        }
    }
}

pub type ChemistrySolverRegistry = ModelRegistry<dyn ChemistrySolver, ChemistrySolverSettings, ChemistryError>;

/// Add the built-in chemistry solvers.
pub fn register_builtin(registry: &mut ChemistrySolverRegistry) -> Result<(), RegistryError> {
    registry.register(
        "none",
        |_: &ChemistrySolverSettings| -> ChemistryResult<Box<dyn ChemistrySolver>> {
            Ok(Box::new(NoChemistrySolver))
        },
    )?;
    registry.register(
        "EulerImplicit",
        |s: &ChemistrySolverSettings| -> ChemistryResult<Box<dyn ChemistrySolver>> {
            Ok(Box::new(EulerImplicit::new(s.c_tau_chem)?))
        },
    )?;
    registry.register(
        "ode",
        |s: &ChemistrySolverSettings| -> ChemistryResult<Box<dyn ChemistrySolver>> {
            let solver = crate::ode::ode_solvers()?.create(&s.ode_solver, &s.ode)?;
            Ok(Box::new(OdeChemistrySolver::new(solver)))
        },
    )?;
    Ok(())
}

/// Registry holding every built-in chemistry solver.
pub fn chemistry_solvers() -> Result<ChemistrySolverRegistry, RegistryError> {
    let mut registry = ChemistrySolverRegistry::new("chemistrySolver");
    register_builtin(&mut registry)?;
    Ok(registry)
}
