//! Case schema definitions.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Case {
    pub version: u32,
    pub name: String,
    pub control: ControlDef,
    #[serde(default)]
    pub correctors: CorrectorsDef,
    #[serde(default)]
    pub chemistry: ChemistryDef,
    pub species: Vec<SpecieDef>,
    #[serde(default)]
    pub reactions: Vec<ReactionDef>,
    pub initial: InitialDef,
    /// Solver object types, in any order; empty before version 2.
    #[serde(default)]
    pub solver_objects: Vec<String>,
}

/// Run control; the tunables marked below are re-read every time step
/// when `runTimeModifiable` is set.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ControlDef {
    #[serde(default)]
    pub start_time: f64,
    pub end_time: f64,
    pub delta_t: f64,
    /// Re-read.
    #[serde(default)]
    pub adjust_time_step: bool,
    /// Re-read.
    #[serde(default = "default_max_delta_t")]
    pub max_delta_t: f64,
    /// Re-read.
    #[serde(default = "default_min_delta_t")]
    pub min_delta_t: f64,
    /// Re-read.
    #[serde(default = "default_max_growth")]
    pub max_growth: f64,
    #[serde(default)]
    pub write_control: WriteControlDef,
    #[serde(default)]
    pub run_time_modifiable: bool,
}

fn default_max_delta_t() -> f64 {
    hx_core::GREAT
}

fn default_min_delta_t() -> f64 {
    hx_core::SMALL
}

fn default_max_growth() -> f64 {
    1.2
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum WriteControlDef {
    TimeStep { interval: usize },
    RunTime { interval: f64 },
}

impl Default for WriteControlDef {
    fn default() -> Self {
        Self::TimeStep { interval: 1 }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CorrectorsDef {
    #[serde(default)]
    pub outer_corrector: LoopDef,
    /// Named inner loops, e.g. `PISOCorrector`.
    #[serde(default)]
    pub inner: BTreeMap<String, LoopDef>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LoopDef {
    #[serde(default = "default_n_correctors")]
    pub n_correctors: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub residual_tolerance: Option<f64>,
    #[serde(default)]
    pub convergence_required: bool,
}

fn default_n_correctors() -> usize {
    1
}

impl Default for LoopDef {
    fn default() -> Self {
        Self {
            n_correctors: default_n_correctors(),
            residual_tolerance: None,
            convergence_required: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ChemistryDef {
    /// `none`, `EulerImplicit` or `ode`.
    #[serde(default = "default_chemistry_solver")]
    pub solver: String,
    #[serde(default = "default_ode_solver")]
    pub ode_solver: String,
    #[serde(default = "default_abs_tol")]
    pub abs_tol: f64,
    #[serde(default = "default_rel_tol")]
    pub rel_tol: f64,
    #[serde(default = "default_max_steps")]
    pub max_steps: usize,
    #[serde(default = "default_c_tau_chem")]
    pub c_tau_chem: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial_chemical_time_step: Option<f64>,
    #[serde(default = "default_max_delta_t")]
    pub max_chemical_time_step: f64,
    #[serde(default = "default_max_tiny_sub_steps")]
    pub max_tiny_sub_steps: usize,
}

fn default_chemistry_solver() -> String {
    "ode".to_string()
}

fn default_ode_solver() -> String {
    "Rosenbrock23".to_string()
}

fn default_abs_tol() -> f64 {
    hx_core::SMALL
}

fn default_rel_tol() -> f64 {
    1e-4
}

fn default_max_steps() -> usize {
    10_000
}

fn default_c_tau_chem() -> f64 {
    0.05
}

fn default_max_tiny_sub_steps() -> usize {
    100
}

impl Default for ChemistryDef {
    fn default() -> Self {
        Self {
            solver: default_chemistry_solver(),
            ode_solver: default_ode_solver(),
            abs_tol: default_abs_tol(),
            rel_tol: default_rel_tol(),
            max_steps: default_max_steps(),
            c_tau_chem: default_c_tau_chem(),
            initial_chemical_time_step: None,
            max_chemical_time_step: default_max_delta_t(),
            max_tiny_sub_steps: default_max_tiny_sub_steps(),
        }
    }
}

/// Constant-cp ideal-gas specie.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SpecieDef {
    pub name: String,
    /// [kg/kmol]
    pub molar_mass: f64,
    /// [J/kg/K]
    pub cp: f64,
    /// Heat of formation at 298.15 K [J/kg].
    #[serde(default)]
    pub hf: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ReactionDef {
    pub name: String,
    pub reactants: Vec<TermDef>,
    pub products: Vec<TermDef>,
    pub forward: ArrheniusDef,
    /// Reverse rate of a non-equilibrium reversible reaction.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reverse: Option<ArrheniusDef>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TermDef {
    pub specie: String,
    #[serde(default = "default_coefficient")]
    pub coeff: f64,
    /// Concentration exponent; the coefficient when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exponent: Option<f64>,
}

fn default_coefficient() -> f64 {
    1.0
}

/// `k = A T^beta exp(-Ta / T)`
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ArrheniusDef {
    pub a: f64,
    #[serde(default)]
    pub beta: f64,
    #[serde(default)]
    pub ta: f64,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum FractionBasisDef {
    #[default]
    Mass,
    Mole,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct InitialDef {
    /// [K]
    pub temperature: f64,
    /// [Pa]
    pub pressure: f64,
    #[serde(default)]
    pub basis: FractionBasisDef,
    /// Unlisted species start at zero; normalized on load.
    pub fractions: BTreeMap<String, f64>,
    /// Closed cell at fixed density; fixed pressure otherwise.
    #[serde(default)]
    pub constant_volume: bool,
    #[serde(default = "default_n_cells")]
    pub n_cells: usize,
}

fn default_n_cells() -> usize {
    1
}
