//! Built-in solver objects of a homogeneous reacting gas.
//!
//! Each time step solves, in graph order,
//! `fvMesh -> reactions -> species -> energy -> pressure`, with `fvMeshInit`
//! run once in the initialisation loop. Steps snapshot their old-time state
//! on the first outer pass so repeated outer passes are idempotent.

mod energy;
mod mesh_motion;
mod pressure;
mod reactions;
mod species;

use hx_chemistry::{CellState, Mixture};
use hx_core::Real;
use hx_models::RegistryError;

use crate::error::{SimError, SimResult};
use crate::fields::FieldRegistry;
use crate::solver_object::{SolverObject, SolverObjectArgs, SolverObjectRegistry};

pub use energy::{Energy, INTEGRATED_HEAT};
pub use mesh_motion::{MESH_CELLS, MeshMotion};
pub use pressure::Pressure;
pub use reactions::Reactions;
pub use species::Species;

pub const TEMPERATURE: &str = "T";
pub const PRESSURE: &str = "p";
pub const DENSITY: &str = "rho";
/// Heat release rate [W/m^3].
pub const HEAT_RELEASE: &str = "Qdot";

/// Objects a reacting-gas case runs when none are listed.
pub const DEFAULT_SOLVER_OBJECTS: [&str; 5] = ["meshMotion", "reactions", "species", "energy", "pressure"];

/// Name of the reaction-rate field of one specie [kg/m^3/s].
pub fn rate_field(specie: &str) -> String {
    format!("RR.{specie}")
}

/// Fields of a gas at `(t, p)` with mass fractions `y` in every cell.
pub fn initial_fields(mixture: &Mixture, n_cells: usize, t: Real, p: Real, y: &[Real]) -> SimResult<FieldRegistry> {
    if y.len() != mixture.len() {
        return Err(SimError::InvalidArg {
            what: format!("{} mass fractions for {} species", y.len(), mixture.len()),
        });
    }
    if !(t > 0.0) || !(p > 0.0) {
        return Err(SimError::InvalidArg {
            what: format!("initial state must have positive T and p, got T = {t}, p = {p}"),
        });
    }
    let mut fields = FieldRegistry::new(n_cells);
    fields.insert_uniform(TEMPERATURE, t);
    fields.insert_uniform(PRESSURE, p);
    fields.insert_uniform(DENSITY, mixture.rho(y, p, t));
    for (specie, yi) in mixture.species().iter().zip(y) {
        fields.insert_uniform(specie.name.as_str(), *yi);
    }
    Ok(fields)
}

/// Mass fractions of every cell, gathered from the per-specie fields.
pub(crate) fn mass_fractions(fields: &FieldRegistry, mixture: &Mixture) -> SimResult<Vec<Vec<Real>>> {
    let per_specie = mixture
        .species()
        .iter()
        .map(|s| fields.field(&s.name))
        .collect::<SimResult<Vec<_>>>()?;
    Ok((0..fields.n_cells())
        .map(|cell| per_specie.iter().map(|f| f[cell]).collect())
        .collect())
}

pub(crate) fn cell_states(fields: &FieldRegistry, mixture: &Mixture) -> SimResult<Vec<CellState>> {
    let t = fields.field(TEMPERATURE)?;
    let p = fields.field(PRESSURE)?;
    let rho = fields.field(DENSITY)?;
    Ok(mass_fractions(fields, mixture)?
        .into_iter()
        .enumerate()
        .map(|(cell, y)| CellState {
            t: t[cell],
            p: p[cell],
            rho: rho[cell],
            y,
        })
        .collect())
}

pub(crate) fn unknown_step(object: &str, step: &str) -> SimError {
    SimError::Solve {
        object: object.to_string(),
        step: step.to_string(),
        message: "not a solve step of this object".into(),
    }
}

/// Add the built-in solver objects.
pub fn register_builtin(registry: &mut SolverObjectRegistry) -> Result<(), RegistryError> {
    registry.register(
        "meshMotion",
        |_: &SolverObjectArgs| -> SimResult<Box<dyn SolverObject>> { Ok(Box::new(MeshMotion::default())) },
    )?;
    registry.register(
        "reactions",
        |args: &SolverObjectArgs| -> SimResult<Box<dyn SolverObject>> { Ok(Box::new(Reactions::from_args(args)?)) },
    )?;
    registry.register(
        "species",
        |args: &SolverObjectArgs| -> SimResult<Box<dyn SolverObject>> {
            Ok(Box::new(Species::new(args.mechanism.mixture().clone())))
        },
    )?;
    registry.register(
        "energy",
        |args: &SolverObjectArgs| -> SimResult<Box<dyn SolverObject>> {
            Ok(Box::new(Energy::new(args.mechanism.mixture().clone(), args.constant_volume)))
        },
    )?;
    registry.register(
        "pressure",
        |args: &SolverObjectArgs| -> SimResult<Box<dyn SolverObject>> {
            Ok(Box::new(Pressure::new(args.mechanism.mixture().clone(), args.constant_volume)))
        },
    )?;
    Ok(())
}

/// Registry holding every built-in solver object.
pub fn solver_objects() -> Result<SolverObjectRegistry, RegistryError> {
    let mut registry = SolverObjectRegistry::new("solverObject");
    register_builtin(&mut registry)?;
    Ok(registry)
}

/// Construct the named objects in order.
pub fn create_objects<S: AsRef<str>>(
    registry: &SolverObjectRegistry,
    names: &[S],
    args: &SolverObjectArgs,
) -> SimResult<Vec<Box<dyn SolverObject>>> {
    names.iter().map(|n| registry.create(n.as_ref(), args)).collect()
}
