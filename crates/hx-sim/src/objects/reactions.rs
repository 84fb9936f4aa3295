//! Finite-rate chemistry over each macro time step.

use hx_chemistry::{ChemistryModel, ChemistryReport, chemistry_solvers};
use hx_core::Real;
use hx_graph::SolveContribution;

use super::{DENSITY, HEAT_RELEASE, cell_states, rate_field, unknown_step};
use crate::error::SimResult;
use crate::fields::FieldRegistry;
use crate::solver_object::{SolveContext, SolveOutcome, SolverObject, SolverObjectArgs};
use crate::time_step::StabilityLimit;

#[derive(Debug)]
pub struct Reactions {
    model: ChemistryModel,
    report: Option<ChemistryReport>,
}

impl Reactions {
    pub fn new(model: ChemistryModel) -> Self {
        Self { model, report: None }
    }

    pub fn from_args(args: &SolverObjectArgs) -> SimResult<Self> {
        let registry = chemistry_solvers()?;
        let model = ChemistryModel::select(
            args.mechanism.clone(),
            &registry,
            &args.chemistry_solver,
            &args.chemistry_solver_settings,
            args.chemistry_settings,
        )?;
        Ok(Self::new(model))
    }

    pub fn model(&self) -> &ChemistryModel {
        &self.model
    }

    /// Report of the most recent chemistry solve.
    pub fn last_report(&self) -> Option<&ChemistryReport> {
        self.report.as_ref()
    }

    fn publish(&self, report: &ChemistryReport, fields: &mut FieldRegistry) -> SimResult<()> {
        for (i, specie) in self.model.mechanism().mixture().species().iter().enumerate() {
            let rr = report.rr.iter().map(|cell| cell[i]).collect();
            fields.insert_field(rate_field(&specie.name), rr)?;
        }
        fields.insert_field(HEAT_RELEASE, report.qdot.clone())
    }
}

impl SolverObject for Reactions {
    fn name(&self) -> &str {
        "reactions"
    }

    fn solve_graph(&self) -> SolveContribution {
        SolveContribution::new()
            .solves(["reactions"])
            .optionally_after("reactions", ["fvMesh"])
    }

    fn initialise(&mut self, fields: &mut FieldRegistry) -> SimResult<()> {
        for specie in self.model.mechanism().mixture().species() {
            fields.field(&specie.name)?;
            fields.insert_uniform(rate_field(&specie.name), 0.0);
        }
        fields.insert_uniform(HEAT_RELEASE, 0.0);
        Ok(())
    }

    /// Before the first solve only a configured initial chemical step limits.
    fn max_time_step(&self, _fields: &FieldRegistry) -> Option<StabilityLimit> {
        match &self.report {
            Some(r) => Some(StabilityLimit::step_limit("chemistry", r.delta_t_chem)),
            None => self
                .model
                .settings()
                .initial_chemical_time_step
                .map(|dt| StabilityLimit::step_limit("chemistry", dt)),
        }
    }

    fn correct(&mut self, solve: &str, ctx: &mut SolveContext<'_>) -> SimResult<SolveOutcome> {
        if solve != "reactions" {
            return Err(unknown_step(self.name(), solve));
        }
        // kinetics are integrated once per time step from the old-time state
        if !ctx.first_outer_iteration() {
            return Ok(SolveOutcome::default());
        }
        let cells = cell_states(ctx.fields, self.model.mechanism().mixture())?;
        let report = self.model.solve(&cells, ctx.delta_t)?;
        tracing::debug!(
            sub_steps = report.sub_steps,
            delta_t_chem = report.delta_t_chem,
            "chemistry solved"
        );
        self.publish(&report, ctx.fields)?;
        self.report = Some(report);
        Ok(SolveOutcome::default())
    }

    fn diagnostics(&self, fields: &FieldRegistry) -> Vec<(String, Real)> {
        let (Ok(qdot), Ok(rho)) = (fields.field(HEAT_RELEASE), fields.field(DENSITY)) else {
            return Vec::new();
        };
        let n = qdot.len().max(1) as Real;
        let specific = qdot.iter().zip(rho).map(|(q, r)| q / r).sum::<Real>() / n;
        vec![("Qdot".to_string(), specific)]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::objects::testing;

    #[test]
    fn publishes_rates_and_step_limit() {
        let mut fields = testing::fields();
        let mut reactions = Reactions::from_args(&testing::args(false)).unwrap();
        reactions.initialise(&mut fields).unwrap();
        assert!(reactions.max_time_step(&fields).is_none());

        let mut ctx = SolveContext {
            time: 1.0e-3,
            delta_t: 1.0e-3,
            outer_iteration: 1,
            final_iteration: true,
            fields: &mut fields,
        };
        reactions.correct("reactions", &mut ctx).unwrap();

        let rr_a = fields.field("RR.A").unwrap()[0];
        let rr_b = fields.field("RR.B").unwrap()[0];
        assert!(rr_a < 0.0);
        assert!((rr_a + rr_b).abs() < 1e-9 * rr_a.abs());
        assert!(fields.field(HEAT_RELEASE).unwrap()[0] > 0.0);
        match reactions.max_time_step(&fields) {
            Some(StabilityLimit::StepLimit { source, .. }) => assert_eq!(source, "chemistry"),
            other => panic!("unexpected limit {other:?}"),
        }
    }

    #[test]
    fn later_outer_passes_reuse_the_report() {
        let mut fields = testing::fields();
        let mut reactions = Reactions::from_args(&testing::args(false)).unwrap();
        reactions.initialise(&mut fields).unwrap();
        for outer_iteration in 1..=3 {
            let mut ctx = SolveContext {
                time: 1.0e-3,
                delta_t: 1.0e-3,
                outer_iteration,
                final_iteration: outer_iteration == 3,
                fields: &mut fields,
            };
            reactions.correct("reactions", &mut ctx).unwrap();
        }
        assert_eq!(reactions.model().reports_emitted(), 1);
    }

    #[test]
    fn rejects_foreign_steps() {
        let mut fields = testing::fields();
        let mut reactions = Reactions::from_args(&testing::args(false)).unwrap();
        let mut ctx = SolveContext {
            time: 1.0,
            delta_t: 1.0,
            outer_iteration: 1,
            final_iteration: true,
            fields: &mut fields,
        };
        assert!(reactions.correct("energy", &mut ctx).is_err());
    }
}
