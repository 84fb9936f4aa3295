//! Energy equation of an adiabatic reacting gas.
//!
//! The heat release integrated since the start of the run shifts the
//! initial sensible enthalpy (constant pressure) or the initial sensible
//! internal energy (constant volume); temperature is recovered from the
//! resulting enthalpy at the current composition.

use hx_chemistry::Mixture;
use hx_core::Real;
use hx_graph::SolveContribution;

use super::{DENSITY, HEAT_RELEASE, PRESSURE, TEMPERATURE, mass_fractions, unknown_step};
use crate::error::SimResult;
use crate::fields::FieldRegistry;
use crate::solver_object::{SolveContext, SolveOutcome, SolverObject};

/// Scalar holding the cell-averaged integrated heat release [J/kg].
pub const INTEGRATED_HEAT: &str = "integratedHeat";

#[derive(Debug)]
pub struct Energy {
    mixture: Mixture,
    constant_volume: bool,
    /// Initial sensible enthalpy per cell [J/kg].
    hs0: Vec<Real>,
    /// Initial sensible internal energy per cell [J/kg].
    u0: Vec<Real>,
    integrated: Vec<Real>,
    integrated_old: Vec<Real>,
}

impl Energy {
    pub fn new(mixture: Mixture, constant_volume: bool) -> Self {
        Self {
            mixture,
            constant_volume,
            hs0: Vec::new(),
            u0: Vec::new(),
            integrated: Vec::new(),
            integrated_old: Vec::new(),
        }
    }
}

impl SolverObject for Energy {
    fn name(&self) -> &str {
        "energy"
    }

    fn solve_graph(&self) -> SolveContribution {
        SolveContribution::new()
            .solves(["energy"])
            .requires("energy", ["species"])
    }

    fn initialise(&mut self, fields: &mut FieldRegistry) -> SimResult<()> {
        let y = mass_fractions(fields, &self.mixture)?;
        let t = fields.field(TEMPERATURE)?;
        let p = fields.field(PRESSURE)?;
        let rho = fields.field(DENSITY)?;
        self.hs0 = y
            .iter()
            .zip(t)
            .map(|(y, t)| self.mixture.hs(y, *t))
            .collect();
        self.u0 = self
            .hs0
            .iter()
            .zip(p.iter().zip(rho))
            .map(|(hs, (p, rho))| hs - p / rho)
            .collect();
        self.integrated = vec![0.0; fields.n_cells()];
        self.integrated_old = self.integrated.clone();
        fields.set_scalar(INTEGRATED_HEAT, 0.0);
        Ok(())
    }

    fn correct(&mut self, solve: &str, ctx: &mut SolveContext<'_>) -> SimResult<SolveOutcome> {
        if solve != "energy" {
            return Err(unknown_step(self.name(), solve));
        }
        if ctx.first_outer_iteration() {
            self.integrated_old.clone_from(&self.integrated);
        }
        let y = mass_fractions(ctx.fields, &self.mixture)?;
        let qdot = ctx.fields.field(HEAT_RELEASE)?.to_vec();
        let p = ctx.fields.field(PRESSURE)?.to_vec();
        let rho = ctx.fields.field(DENSITY)?.to_vec();

        let mut t_new = Vec::with_capacity(y.len());
        for cell in 0..y.len() {
            self.integrated[cell] = self.integrated_old[cell] + qdot[cell] / rho[cell] * ctx.delta_t;
            let hs = if self.constant_volume {
                self.u0[cell] + p[cell] / rho[cell] + self.integrated[cell]
            } else {
                self.hs0[cell] + self.integrated[cell]
            };
            t_new.push(self.mixture.t_from_hs(&y[cell], hs)?);
        }

        let t = ctx.fields.field_mut(TEMPERATURE)?;
        let mut residual: Real = 0.0;
        for (old, new) in t.iter_mut().zip(&t_new) {
            residual = residual.max((new - *old).abs() / new.abs().max(1.0));
            *old = *new;
        }
        let n = self.integrated.len().max(1) as Real;
        ctx.fields
            .set_scalar(INTEGRATED_HEAT, self.integrated.iter().sum::<Real>() / n);
        Ok(SolveOutcome::residual(residual))
    }

    fn diagnostics(&self, fields: &FieldRegistry) -> Vec<(String, Real)> {
        fields
            .mean(TEMPERATURE)
            .map(|t| vec![("T".to_string(), t)])
            .unwrap_or_default()
    }
}
