//! Stiff ODE solvers.
//!
//! An [`OdeSystem`] provides derivatives (and optionally an analytic
//! Jacobian); an [`OdeSolver`] advances it. The built-in solvers are
//! adaptive Rosenbrock schemes selected by name from an
//! [`OdeSolverRegistry`].

pub mod adaptive;
pub mod rosenbrock;

use std::fmt;

use hx_core::{Real, SMALL};
use hx_models::{ModelRegistry, RegistryError};
use nalgebra::{DMatrix, DVector};

use crate::error::{ChemistryError, ChemistryResult};
use crate::jacobian::{JACOBIAN_EPSILON, finite_difference_jacobian};

pub use adaptive::{AdaptiveSolver, StepControl, StepScheme};
pub use rosenbrock::{Rosenbrock12, Rosenbrock23};

/// A first-order system `dy/dx = f(x, y)`.
pub trait OdeSystem: Sync {
    fn n_eqns(&self) -> usize;

    fn derivatives(&self, x: Real, y: &DVector<Real>) -> ChemistryResult<DVector<Real>>;

    /// Partial derivatives `(df/dx, df/dy)`.
    ///
    /// Defaults to forward differences of [`derivatives`](Self::derivatives)
    /// for an autonomous system.
    fn jacobian(&self, x: Real, y: &DVector<Real>) -> ChemistryResult<(DVector<Real>, DMatrix<Real>)> {
        let floor = DVector::from_element(y.len(), 1.0);
        let dfdy = finite_difference_jacobian(y, |v| self.derivatives(x, v), JACOBIAN_EPSILON, &floor)?;
        Ok((DVector::zeros(y.len()), dfdy))
    }
}

/// Tolerances and step budget shared by every ODE solver.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OdeSettings {
    pub abs_tol: Real,
    pub rel_tol: Real,
    /// Maximum number of accepted steps per `integrate` call.
    pub max_steps: usize,
}

impl Default for OdeSettings {
    fn default() -> Self {
        Self {
            abs_tol: SMALL,
            rel_tol: 1e-4,
            max_steps: 10_000,
        }
    }
}

/// An ODE solver selected at run time.
pub trait OdeSolver: Send + Sync + fmt::Debug {
    fn name(&self) -> &'static str;

    fn settings(&self) -> &OdeSettings;

    /// Take one accepted step from `x`, trying `dx_try` first.
    ///
    /// On return `x` and `y` are advanced and `dx_try` holds the suggested
    /// size of the next step.
    fn step(
        &self,
        system: &dyn OdeSystem,
        x: &mut Real,
        y: &mut DVector<Real>,
        dx_try: &mut Real,
    ) -> ChemistryResult<()>;

    /// Integrate from `x_start` to `x_end`, returning the number of
    /// accepted steps.
    ///
    /// `dx_try` is the initial step on entry and the suggested next step on
    /// return. The final step is shortened to land on `x_end`; it does not
    /// shrink the suggestion.
    fn integrate(
        &self,
        system: &dyn OdeSystem,
        x_start: Real,
        x_end: Real,
        y: &mut DVector<Real>,
        dx_try: &mut Real,
    ) -> ChemistryResult<usize> {
        let max_steps = self.settings().max_steps;
        let mut x = x_start;
        let mut dx = if *dx_try > 0.0 { *dx_try } else { x_end - x_start };

        for n in 0..max_steps {
            let dx0 = dx;
            let last = (x + dx - x_end) * (x + dx - x_start) > 0.0;
            if last {
                dx = x_end - x;
            }

            self.step(system, &mut x, y, &mut dx)?;

            if (x - x_end) * (x_end - x_start) >= 0.0 {
                if n > 0 && last {
                    dx = dx0;
                }
                *dx_try = dx;
                return Ok(n + 1);
            }
        }

        Err(ChemistryError::TooManySteps { max_steps })
    }
}

pub type OdeSolverRegistry = ModelRegistry<dyn OdeSolver, OdeSettings, ChemistryError>;

/// Add the built-in ODE solvers.
pub fn register_builtin(registry: &mut OdeSolverRegistry) -> Result<(), RegistryError> {
    registry.register("Rosenbrock12", |settings: &OdeSettings| -> ChemistryResult<Box<dyn OdeSolver>> {
        Ok(Box::new(AdaptiveSolver::new(Rosenbrock12, *settings)))
    })?;
    registry.register("Rosenbrock23", |settings: &OdeSettings| -> ChemistryResult<Box<dyn OdeSolver>> {
        Ok(Box::new(AdaptiveSolver::new(Rosenbrock23, *settings)))
    })?;
    Ok(())
}

/// Registry holding every built-in ODE solver.
pub fn ode_solvers() -> Result<OdeSolverRegistry, RegistryError> {
    let mut registry = OdeSolverRegistry::new("ODESolver");
    register_builtin(&mut registry)?;
    Ok(registry)
}
