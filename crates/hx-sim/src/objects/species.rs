//! Specie transport: mass fractions advanced by the reaction rates.

use hx_chemistry::Mixture;
use hx_core::Real;
use hx_graph::SolveContribution;

use super::{DENSITY, mass_fractions, rate_field, unknown_step};
use crate::error::SimResult;
use crate::fields::FieldRegistry;
use crate::solver_object::{SolveContext, SolveOutcome, SolverObject};

#[derive(Debug)]
pub struct Species {
    mixture: Mixture,
    /// Old-time mass fractions `[cell][specie]`.
    y_old: Vec<Vec<Real>>,
}

impl Species {
    pub fn new(mixture: Mixture) -> Self {
        Self {
            mixture,
            y_old: Vec::new(),
        }
    }
}

impl SolverObject for Species {
    fn name(&self) -> &str {
        "species"
    }

    fn solve_graph(&self) -> SolveContribution {
        SolveContribution::new()
            .solves(["species"])
            .requires("species", ["reactions"])
    }

    fn correct(&mut self, solve: &str, ctx: &mut SolveContext<'_>) -> SimResult<SolveOutcome> {
        if solve != "species" {
            return Err(unknown_step(self.name(), solve));
        }
        if ctx.first_outer_iteration() || self.y_old.is_empty() {
            self.y_old = mass_fractions(ctx.fields, &self.mixture)?;
        }
        let rho = ctx.fields.field(DENSITY)?.to_vec();

        let mut residual: Real = 0.0;
        for (i, specie) in self.mixture.species().iter().enumerate() {
            let rr = ctx.fields.field(&rate_field(&specie.name))?.to_vec();
            let y = ctx.fields.field_mut(&specie.name)?;
            for cell in 0..y.len() {
                let next = self.y_old[cell][i] + ctx.delta_t * rr[cell] / rho[cell];
                residual = residual.max((next - y[cell]).abs());
                y[cell] = next;
            }
        }
        Ok(SolveOutcome::residual(residual))
    }

    fn diagnostics(&self, fields: &FieldRegistry) -> Vec<(String, Real)> {
        self.mixture
            .species()
            .first()
            .and_then(|s| fields.mean(&s.name).ok().map(|y| (s.name.clone(), y)))
            .into_iter()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::objects::testing;

    fn run(species: &mut Species, fields: &mut FieldRegistry, outer_iteration: usize) -> SolveOutcome {
        let mut ctx = SolveContext {
            time: 0.1,
            delta_t: 0.1,
            outer_iteration,
            final_iteration: false,
            fields,
        };
        species.correct("species", &mut ctx).unwrap()
    }

    #[test]
    fn mass_fractions_follow_the_rates() {
        let mut fields = testing::fields();
        let rho = fields.field(DENSITY).unwrap()[0];
        fields.insert_uniform("RR.A", -rho);
        fields.insert_uniform("RR.B", rho);

        let mut species = Species::new(testing::decay_mechanism().mixture().clone());
        let first = run(&mut species, &mut fields, 1);
        assert!((fields.field("A").unwrap()[0] - 0.9).abs() < 1e-12);
        assert!((fields.field("B").unwrap()[0] - 0.1).abs() < 1e-12);
        assert!((first.residual.unwrap() - 0.1).abs() < 1e-12);

        // a second outer pass starts again from the old-time state
        let second = run(&mut species, &mut fields, 2);
        assert!((fields.field("A").unwrap()[0] - 0.9).abs() < 1e-12);
        assert_eq!(second.residual, Some(0.0));
    }

    #[test]
    fn missing_rate_field_is_reported() {
        let mut fields = testing::fields();
        let mut species = Species::new(testing::decay_mechanism().mixture().clone());
        let mut ctx = SolveContext {
            time: 0.1,
            delta_t: 0.1,
            outer_iteration: 1,
            final_iteration: true,
            fields: &mut fields,
        };
        let err = species.correct("species", &mut ctx).unwrap_err();
        assert_eq!(err.to_string(), "Unknown field 'RR.A'");
    }
}
