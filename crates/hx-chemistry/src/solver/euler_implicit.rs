use hx_core::{GREAT, Real, SMALL, stabilise};
use nalgebra::{DMatrix, DVector};

use crate::error::{ChemistryError, ChemistryResult};
use crate::mechanism::Mechanism;
use crate::ode::OdeSystem;
use crate::solver::{ChemistrySolver, ReactorState};

/// Linearised backward Euler on the species with enthalpy-conserving
/// temperature update.
///
/// Each call covers at most `c_tau_chem` times the fastest specie depletion
/// time, so the caller sub-cycles through the macro step.
#[derive(Debug, Clone, Copy)]
pub struct EulerImplicit {
    c_tau_chem: Real,
}

impl EulerImplicit {
    pub fn new(c_tau_chem: Real) -> ChemistryResult<Self> {
        if !(c_tau_chem > 0.0) || !c_tau_chem.is_finite() {
            return Err(ChemistryError::InvalidArg {
                what: format!("cTauChem must be positive, got {c_tau_chem}"),
            });
        }
        Ok(Self { c_tau_chem })
    }

    pub fn c_tau_chem(&self) -> Real {
        self.c_tau_chem
    }
}

/// Shortest time in which any consumed specie would be depleted at its
/// current rate.
fn depletion_time(c: &[Real], dcdt: &[Real]) -> Real {
    c.iter()
        .zip(dcdt)
        .filter(|(_, r)| **r < 0.0)
        .map(|(ci, r)| ci.max(0.0) / stabilise(-r, SMALL))
        .fold(GREAT, Real::min)
}

impl ChemistrySolver for EulerImplicit {
    fn name(&self) -> &'static str {
        "EulerImplicit"
    }

    fn solve(
        &self,
        mechanism: &Mechanism,
        state: &mut ReactorState,
        dt: &mut Real,
        sub_dt: &mut Real,
    ) -> ChemistryResult<()> {
        let n = mechanism.n_species();
        let dcdt = mechanism.species_rates(&state.c, state.t)?;
        let tau = self.c_tau_chem * depletion_time(&state.c, &dcdt);
        let h = dt.min(tau);

        let enthalpy = mechanism.enthalpy_density(&state.c, state.t);
        let y = mechanism.state_vector(&state.c, state.t, state.p);
        let (_, dfdy) = mechanism.jacobian(0.0, &y)?;

        let a = DMatrix::identity(n, n) - h * dfdy.view((0, 0), (n, n));
        let rhs = h * DVector::from_column_slice(&dcdt);
        let dc = a.lu().solve(&rhs).ok_or(ChemistryError::SingularMatrix {
            what: "EulerImplicit species matrix",
        })?;

        for (ci, dci) in state.c.iter_mut().zip(dc.iter()) {
            *ci = (*ci + dci).max(0.0);
        }
        state.t = mechanism.temperature_for_enthalpy(&state.c, enthalpy)?;

        *dt = h;
        *sub_dt = tau.min(2.0 * h);
        Ok(())
    }
}
