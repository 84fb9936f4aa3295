//! Chemistry model: integrates every cell over one macro time step.
//!
//! Each call to [`ChemistryModel::solve`] moves through
//! `Idle -> Solving -> Reporting -> Idle` and produces exactly one
//! [`ChemistryReport`] carrying the reaction rates, the heat release and
//! the stable time step the kinetics allow next.

use hx_core::{GREAT, Real, SMALL};
use rayon::prelude::*;

use crate::error::{ChemistryError, ChemistryResult};
use crate::mechanism::Mechanism;
use crate::solver::{ChemistrySolver, ChemistrySolverRegistry, ChemistrySolverSettings, ReactorState};

/// Where the model is within one macro invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChemistryPhase {
    Idle,
    Solving,
    Reporting,
}

/// Model-level settings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChemistrySettings {
    /// First chemical time step of each cell; the first macro step when unset.
    pub initial_chemical_time_step: Option<Real>,
    /// Upper bound on the per-cell chemical time step carried between calls.
    pub max_chemical_time_step: Real,
    /// Consecutive sub-steps shorter than `EPSILON * deltaT` tolerated in a cell.
    pub max_tiny_sub_steps: usize,
}

impl Default for ChemistrySettings {
    fn default() -> Self {
        Self {
            initial_chemical_time_step: None,
            max_chemical_time_step: GREAT,
            max_tiny_sub_steps: 100,
        }
    }
}

/// Thermochemical state of one cell on entry to a chemistry solve.
#[derive(Debug, Clone, PartialEq)]
pub struct CellState {
    pub t: Real,
    pub p: Real,
    pub rho: Real,
    /// Mass fractions, one per specie.
    pub y: Vec<Real>,
}

/// Result of one macro invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct ChemistryReport {
    /// Stable step estimate for the next macro step.
    pub delta_t_chem: Real,
    /// Reaction rates [kg/m^3/s] indexed `[cell][specie]`.
    pub rr: Vec<Vec<Real>>,
    /// Heat release rate [W/m^3] per cell.
    pub qdot: Vec<Real>,
    /// Solver calls summed over all cells.
    pub sub_steps: usize,
}

struct CellOutcome {
    rr: Vec<Real>,
    qdot: Real,
    delta_t_chem: Real,
    sub_steps: usize,
}

#[derive(Debug)]
pub struct ChemistryModel {
    mechanism: Mechanism,
    solver: Box<dyn ChemistrySolver>,
    settings: ChemistrySettings,
    delta_t_chem: Vec<Real>,
    phase: ChemistryPhase,
    reports: usize,
}

impl ChemistryModel {
    pub fn new(mechanism: Mechanism, solver: Box<dyn ChemistrySolver>, settings: ChemistrySettings) -> Self {
        Self {
            mechanism,
            solver,
            settings,
            delta_t_chem: Vec::new(),
            phase: ChemistryPhase::Idle,
            reports: 0,
        }
    }

    /// Build with the chemistry solver selected by name.
    pub fn select(
        mechanism: Mechanism,
        registry: &ChemistrySolverRegistry,
        solver: &str,
        solver_settings: &ChemistrySolverSettings,
        settings: ChemistrySettings,
    ) -> ChemistryResult<Self> {
        let solver = registry.create(solver, solver_settings)?;
        tracing::info!(solver = solver.name(), species = mechanism.n_species(), "selecting chemistry solver");
        Ok(Self::new(mechanism, solver, settings))
    }

    pub fn mechanism(&self) -> &Mechanism {
        &self.mechanism
    }

    pub fn settings(&self) -> &ChemistrySettings {
        &self.settings
    }

    pub fn solver_name(&self) -> &'static str {
        self.solver.name()
    }

    pub fn phase(&self) -> ChemistryPhase {
        self.phase
    }

    /// Number of reports emitted so far.
    pub fn reports_emitted(&self) -> usize {
        self.reports
    }

    /// Per-cell chemical time steps carried to the next call.
    pub fn delta_t_chem(&self) -> &[Real] {
        &self.delta_t_chem
    }

    /// Integrate every cell over `delta_t`.
    pub fn solve(&mut self, cells: &[CellState], delta_t: Real) -> ChemistryResult<ChemistryReport> {
        if !(delta_t > 0.0) || !delta_t.is_finite() {
            return Err(ChemistryError::InvalidArg {
                what: format!("chemistry time step must be positive, got {delta_t}"),
            });
        }
        let n = self.mechanism.n_species();
        if let Some(i) = cells.iter().position(|c| c.y.len() != n) {
            return Err(ChemistryError::InvalidArg {
                what: format!("cell {i} has {} mass fractions for {n} species", cells[i].y.len()),
            });
        }
        if self.delta_t_chem.len() != cells.len() {
            let initial = self.settings.initial_chemical_time_step.unwrap_or(delta_t);
            self.delta_t_chem = vec![initial; cells.len()];
        }

        self.phase = ChemistryPhase::Solving;
        let mechanism = &self.mechanism;
        let solver = self.solver.as_ref();
        let settings = &self.settings;
        let outcomes: ChemistryResult<Vec<CellOutcome>> = cells
            .par_iter()
            .zip(self.delta_t_chem.par_iter())
            .enumerate()
            .map(|(i, (cell, &dtc))| solve_cell(mechanism, solver, settings, i, cell, dtc, delta_t))
            .collect();
        let outcomes = match outcomes {
            Ok(o) => o,
            Err(e) => {
                self.phase = ChemistryPhase::Idle;
                return Err(e);
            }
        };

        self.phase = ChemistryPhase::Reporting;
        let mut report = ChemistryReport {
            delta_t_chem: GREAT,
            rr: Vec::with_capacity(cells.len()),
            qdot: Vec::with_capacity(cells.len()),
            sub_steps: 0,
        };
        for (slot, outcome) in self.delta_t_chem.iter_mut().zip(outcomes) {
            report.delta_t_chem = report.delta_t_chem.min(outcome.delta_t_chem);
            *slot = outcome.delta_t_chem.min(self.settings.max_chemical_time_step);
            report.rr.push(outcome.rr);
            report.qdot.push(outcome.qdot);
            report.sub_steps += outcome.sub_steps;
        }
        report.delta_t_chem = report.delta_t_chem.min(2.0 * delta_t);

        tracing::debug!(
            solver = self.solver.name(),
            cells = cells.len(),
            sub_steps = report.sub_steps,
            delta_t_chem = report.delta_t_chem,
            "chemistry solved"
        );
        self.reports += 1;
        self.phase = ChemistryPhase::Idle;
        Ok(report)
    }
}

fn solve_cell(
    mechanism: &Mechanism,
    solver: &dyn ChemistrySolver,
    settings: &ChemistrySettings,
    cell: usize,
    state: &CellState,
    delta_t_chem: Real,
    delta_t: Real,
) -> ChemistryResult<CellOutcome> {
    let c0 = mechanism.mixture().concentrations(&state.y, state.rho);
    let mut reactor = ReactorState {
        c: c0.clone(),
        t: state.t,
        p: state.p,
    };

    let mut sub_dt = delta_t_chem;
    let mut time_left = delta_t;
    let mut tiny = 0;
    let mut sub_steps = 0;
    let tiny_limit = Real::EPSILON * delta_t;

    while time_left > SMALL {
        let mut dt = time_left;
        solver
            .solve(mechanism, &mut reactor, &mut dt, &mut sub_dt)
            .map_err(|e| {
                if e.is_stiffness() {
                    ChemistryError::UnresolvableStiffness {
                        cell,
                        time_left,
                        reason: e.to_string(),
                    }
                } else {
                    e
                }
            })?;
        sub_steps += 1;

        if dt.is_finite() && dt >= tiny_limit {
            tiny = 0;
        } else {
            tiny += 1;
            if tiny > settings.max_tiny_sub_steps {
                return Err(ChemistryError::UnresolvableStiffness {
                    cell,
                    time_left,
                    reason: format!("{tiny} consecutive sub-steps shorter than {tiny_limit:e} s"),
                });
            }
        }
        if dt > 0.0 {
            time_left -= dt;
        }
    }

    let species = mechanism.mixture().species();
    let rr: Vec<Real> = species
        .iter()
        .zip(reactor.c.iter().zip(&c0))
        .map(|(s, (c, c0))| (c - c0) * s.molar_mass / delta_t)
        .collect();
    let qdot = -species.iter().zip(&rr).map(|(s, r)| r * s.hf).sum::<Real>();

    Ok(CellOutcome {
        rr,
        qdot,
        delta_t_chem: sub_dt,
        sub_steps,
    })
}
