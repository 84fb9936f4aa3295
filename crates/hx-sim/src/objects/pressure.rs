//! Thermodynamic closure of density and pressure.

use hx_chemistry::Mixture;
use hx_core::Real;
use hx_graph::SolveContribution;

use super::{DENSITY, PRESSURE, TEMPERATURE, mass_fractions, unknown_step};
use crate::error::SimResult;
use crate::fields::FieldRegistry;
use crate::solver_object::{SolveContext, SolveOutcome, SolverObject};

#[derive(Debug)]
pub struct Pressure {
    mixture: Mixture,
    constant_volume: bool,
    /// Density of the closed cell, fixed at initialisation.
    rho0: Vec<Real>,
}

impl Pressure {
    pub fn new(mixture: Mixture, constant_volume: bool) -> Self {
        Self {
            mixture,
            constant_volume,
            rho0: Vec::new(),
        }
    }
}

impl SolverObject for Pressure {
    fn name(&self) -> &str {
        "pressure"
    }

    fn solve_graph(&self) -> SolveContribution {
        SolveContribution::new()
            .solves(["pressure"])
            .requires("pressure", ["energy"])
    }

    fn initialise(&mut self, fields: &mut FieldRegistry) -> SimResult<()> {
        self.rho0 = fields.field(DENSITY)?.to_vec();
        Ok(())
    }

    fn correct(&mut self, solve: &str, ctx: &mut SolveContext<'_>) -> SimResult<SolveOutcome> {
        if solve != "pressure" {
            return Err(unknown_step(self.name(), solve));
        }
        let y = mass_fractions(ctx.fields, &self.mixture)?;
        let t = ctx.fields.field(TEMPERATURE)?.to_vec();
        let (p, rho): (Vec<Real>, Vec<Real>) = if self.constant_volume {
            y.iter()
                .zip(&t)
                .zip(&self.rho0)
                .map(|((y, t), rho0)| {
                    let state = self.mixture.constant_volume_update(y, *t, *rho0);
                    (state.p, state.rho)
                })
                .unzip()
        } else {
            let p = ctx.fields.field(PRESSURE)?.to_vec();
            let rho = y
                .iter()
                .zip(&t)
                .zip(&p)
                .map(|((y, t), p)| self.mixture.rho(y, *p, *t))
                .collect();
            (p, rho)
        };

        let old = ctx.fields.field(DENSITY)?;
        let residual = old
            .iter()
            .zip(&rho)
            .map(|(a, b)| (a - b).abs() / b.abs().max(Real::MIN_POSITIVE))
            .fold(0.0, Real::max);
        ctx.fields.insert_field(PRESSURE, p)?;
        ctx.fields.insert_field(DENSITY, rho)?;
        Ok(SolveOutcome::residual(residual))
    }

    fn diagnostics(&self, fields: &FieldRegistry) -> Vec<(String, Real)> {
        fields
            .mean(PRESSURE)
            .map(|p| vec![("p".to_string(), p)])
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::objects::testing;

    fn heat_to(fields: &mut FieldRegistry, t: Real, pressure: &mut Pressure) {
        fields.insert_uniform(TEMPERATURE, t);
        let mut ctx = SolveContext {
            time: 0.1,
            delta_t: 0.1,
            outer_iteration: 1,
            final_iteration: true,
            fields,
        };
        pressure.correct("pressure", &mut ctx).unwrap();
    }

    #[test]
    fn closed_cell_keeps_density_and_raises_pressure() {
        let mut fields = testing::fields();
        let rho0 = fields.field(DENSITY).unwrap()[0];
        let mut pressure = Pressure::new(testing::decay_mechanism().mixture().clone(), true);
        pressure.initialise(&mut fields).unwrap();

        heat_to(&mut fields, 2000.0, &mut pressure);
        assert_eq!(fields.field(DENSITY).unwrap()[0], rho0);
        assert!((fields.field(PRESSURE).unwrap()[0] - 2.0e5).abs() < 1e-6);
    }

    #[test]
    fn open_cell_keeps_pressure_and_expands() {
        let mut fields = testing::fields();
        let rho0 = fields.field(DENSITY).unwrap()[0];
        let mut pressure = Pressure::new(testing::decay_mechanism().mixture().clone(), false);
        pressure.initialise(&mut fields).unwrap();

        heat_to(&mut fields, 2000.0, &mut pressure);
        assert_eq!(fields.field(PRESSURE).unwrap()[0], 1.0e5);
        assert!((fields.field(DENSITY).unwrap()[0] - 0.5 * rho0).abs() < 1e-12);
    }
}
