//! Stiff chemistry integration.
//!
//! This crate advances per-cell species concentrations over one macro time
//! step and reports the reaction rates, heat release and the stable step
//! the kinetics allow next:
//!
//! - [`species`] / [`mixture`]: constant-cp ideal-gas thermodynamics
//! - [`reaction`] / [`mechanism`]: Arrhenius kinetics and the `[c, T, p]` ODE
//! - [`ode`]: adaptive Rosenbrock solvers (`Rosenbrock12`, `Rosenbrock23`)
//! - [`solver`]: chemistry solvers (`none`, `EulerImplicit`, `ode`)
//! - [`model`]: the per-cell sub-cycling driver

pub mod error;
pub mod jacobian;
pub mod mechanism;
pub mod mixture;
pub mod model;
pub mod ode;
pub mod reaction;
pub mod solver;
pub mod species;

pub use error::{ChemistryError, ChemistryResult};
pub use mechanism::Mechanism;
pub use mixture::{ConstantVolumeState, FractionBasis, Mixture};
pub use model::{CellState, ChemistryModel, ChemistryPhase, ChemistryReport, ChemistrySettings};
pub use ode::{OdeSettings, OdeSolver, OdeSolverRegistry, OdeSystem, ode_solvers};
pub use reaction::{ArrheniusRate, Reaction, SpecieCoeff};
pub use solver::{
    ChemistrySolver, ChemistrySolverRegistry, ChemistrySolverSettings, ReactorState, chemistry_solvers,
};
pub use species::SpecieThermo;
