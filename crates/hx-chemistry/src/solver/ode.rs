use hx_core::Real;

use crate::error::ChemistryResult;
use crate::mechanism::Mechanism;
use crate::ode::OdeSolver;
use crate::solver::{ChemistrySolver, ReactorState};

/// Integrates the full `[c, T, p]` system with an adaptive ODE solver.
///
/// Covers the whole requested interval in one call; the ODE solver's own
/// step suggestion becomes the cell's chemical time step.
#[derive(Debug)]
pub struct OdeChemistrySolver {
    ode: Box<dyn OdeSolver>,
}

impl OdeChemistrySolver {
    pub fn new(ode: Box<dyn OdeSolver>) -> Self {
        Self { ode }
    }

    pub fn ode_solver(&self) -> &dyn OdeSolver {
        self.ode.as_ref()
    }
}

impl ChemistrySolver for OdeChemistrySolver {
    fn name(&self) -> &'static str {
        "ode"
    }

    fn solve(
        &self,
        mechanism: &Mechanism,
        state: &mut ReactorState,
        dt: &mut Real,
        sub_dt: &mut Real,
    ) -> ChemistryResult<()> {
        let n = mechanism.n_species();
        let mut y = mechanism.state_vector(&state.c, state.t, state.p);

        let steps = self.ode.integrate(mechanism, 0.0, *dt, &mut y, sub_dt)?;
        tracing::trace!(solver = self.ode.name(), steps, "ode chemistry step");

        for (ci, yi) in state.c.iter_mut().zip(y.iter()) {
            *ci = yi.max(0.0);
        }
        state.t = y[n];
        state.p = y[n + 1];
        Ok(())
    }
}
