//! Error-controlled step size adaptation around an embedded scheme.

use std::fmt;

use hx_core::{Real, VSMALL};
use nalgebra::DVector;

use crate::error::{ChemistryError, ChemistryResult};
use crate::ode::{OdeSettings, OdeSolver, OdeSystem};

/// A single-step scheme with an embedded error estimate.
pub trait StepScheme: Send + Sync + fmt::Debug {
    const NAME: &'static str;

    /// Attempt one step of size `dx` from `(x0, y0)`.
    ///
    /// Writes the new state into `y` and returns the error estimate vector.
    fn trial(
        &self,
        system: &dyn OdeSystem,
        x0: Real,
        y0: &DVector<Real>,
        dydx0: &DVector<Real>,
        dx: Real,
        y: &mut DVector<Real>,
    ) -> ChemistryResult<DVector<Real>>;
}

/// Step size control constants.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepControl {
    pub safe_scale: Real,
    pub alpha_inc: Real,
    pub alpha_dec: Real,
    pub min_scale: Real,
    pub max_scale: Real,
}

impl Default for StepControl {
    fn default() -> Self {
        Self {
            safe_scale: 0.9,
            alpha_inc: 0.2,
            alpha_dec: 0.25,
            min_scale: 0.2,
            max_scale: 10.0,
        }
    }
}

impl StepControl {
    /// Factor applied to a rejected step.
    fn shrink(&self, err: Real) -> Real {
        (self.safe_scale * err.powf(-self.alpha_dec)).max(self.min_scale)
    }

    /// Factor applied to the next step after an accepted one.
    fn grow(&self, err: Real) -> Real {
        if err > (self.max_scale / self.safe_scale).powf(-1.0 / self.alpha_inc) {
            (self.safe_scale * err.powf(-self.alpha_inc)).clamp(self.min_scale, self.max_scale)
        } else {
            self.safe_scale * self.max_scale
        }
    }
}

/// Adaptive solver driving an embedded [`StepScheme`].
#[derive(Debug, Clone)]
pub struct AdaptiveSolver<S> {
    scheme: S,
    settings: OdeSettings,
    control: StepControl,
}

impl<S: StepScheme> AdaptiveSolver<S> {
    pub fn new(scheme: S, settings: OdeSettings) -> Self {
        Self {
            scheme,
            settings,
            control: StepControl::default(),
        }
    }

    pub fn with_control(mut self, control: StepControl) -> Self {
        self.control = control;
        self
    }

    /// Largest error component scaled by `abs_tol + rel_tol max(|y0|, |y|)`.
    pub fn normalise_error(&self, y0: &DVector<Real>, y: &DVector<Real>, err: &DVector<Real>) -> Real {
        let mut max_err: Real = 0.0;
        for i in 0..err.len() {
            let tol = self.settings.abs_tol + self.settings.rel_tol * y0[i].abs().max(y[i].abs());
            let e = err[i].abs() / tol;
            if !e.is_finite() {
                return Real::INFINITY;
            }
            max_err = max_err.max(e);
        }
        max_err
    }
}

impl<S: StepScheme> OdeSolver for AdaptiveSolver<S> {
    fn name(&self) -> &'static str {
        S::NAME
    }

    fn settings(&self) -> &OdeSettings {
        &self.settings
    }

    fn step(
        &self,
        system: &dyn OdeSystem,
        x: &mut Real,
        y: &mut DVector<Real>,
        dx_try: &mut Real,
    ) -> ChemistryResult<()> {
        let dydx0 = system.derivatives(*x, y)?;
        let mut y_new = y.clone();
        let mut dx = *dx_try;

        let err = loop {
            let estimate = self.scheme.trial(system, *x, y, &dydx0, dx, &mut y_new)?;
            let err = self.normalise_error(y, &y_new, &estimate);
            if err <= 1.0 {
                break err;
            }
            dx *= self.control.shrink(err);
            if dx < VSMALL {
                return Err(ChemistryError::StepUnderflow { x: *x, dx });
            }
        };

        *x += dx;
        *y = y_new;
        *dx_try = self.control.grow(err) * dx;
        Ok(())
    }
}
