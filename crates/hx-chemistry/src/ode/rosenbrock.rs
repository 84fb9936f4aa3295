//! Linearly implicit Rosenbrock schemes with embedded error estimates.

use hx_core::Real;
use nalgebra::linalg::LU;
use nalgebra::{DMatrix, DVector, Dyn};

use crate::error::{ChemistryError, ChemistryResult};
use crate::ode::OdeSystem;
use crate::ode::adaptive::StepScheme;

/// LU factorisation of `I/(gamma dx) - df/dy`.
struct IterationMatrix {
    lu: LU<Real, Dyn, Dyn>,
}

impl IterationMatrix {
    fn new(dfdy: &DMatrix<Real>, gamma: Real, dx: Real) -> Self {
        let mut a = -dfdy;
        let diag = 1.0 / (gamma * dx);
        for i in 0..a.nrows() {
            a[(i, i)] += diag;
        }
        Self { lu: a.lu() }
    }

    fn solve(&self, rhs: DVector<Real>) -> ChemistryResult<DVector<Real>> {
        self.lu.solve(&rhs).ok_or(ChemistryError::SingularMatrix {
            what: "Rosenbrock iteration matrix",
        })
    }
}

/// Two-stage L-stable scheme, order 2 with an embedded order 1 estimate.
#[derive(Debug, Clone, Copy, Default)]
pub struct Rosenbrock12;

impl Rosenbrock12 {
    const GAMMA: Real = 1.0 + std::f64::consts::FRAC_1_SQRT_2;
    // stage values are scaled by 1/gamma to match the iteration matrix
    const A21: Real = 1.0 / Self::GAMMA;
    const C21: Real = -2.0 / Self::GAMMA;
    const B1: Real = 1.5 / Self::GAMMA;
    const B2: Real = 0.5 / Self::GAMMA;
    const E1: Real = Self::B1 - 1.0 / Self::GAMMA;
    const E2: Real = Self::B2;
    const C2: Real = 1.0;
    const D1: Real = Self::GAMMA;
    const D2: Real = -Self::GAMMA;
}

impl StepScheme for Rosenbrock12 {
    const NAME: &'static str = "Rosenbrock12";

    fn trial(
        &self,
        system: &dyn OdeSystem,
        x0: Real,
        y0: &DVector<Real>,
        dydx0: &DVector<Real>,
        dx: Real,
        y: &mut DVector<Real>,
    ) -> ChemistryResult<DVector<Real>> {
        let (dfdx, dfdy) = system.jacobian(x0, y0)?;
        let a = IterationMatrix::new(&dfdy, Self::GAMMA, dx);

        let k1 = a.solve(dydx0 + (dx * Self::D1) * &dfdx)?;

        let y1 = y0 + Self::A21 * &k1;
        let dydx = system.derivatives(x0 + Self::C2 * dx, &y1)?;
        let k2 = a.solve(dydx + (dx * Self::D2) * &dfdx + (Self::C21 / dx) * &k1)?;

        *y = y0 + Self::B1 * &k1 + Self::B2 * &k2;
        Ok(Self::E1 * k1 + Self::E2 * k2)
    }
}

/// Three-stage L-stable scheme, order 3 with an embedded order 2 estimate.
#[derive(Debug, Clone, Copy, Default)]
pub struct Rosenbrock23;

impl Rosenbrock23 {
    const GAMMA: Real = 0.435_866_521_508_458_999_416_019_451_193_56;
    const A21: Real = 1.0;
    const C21: Real = -1.015_617_108_387_770_209_197_560_011_554_5;
    const C31: Real = 4.075_995_645_253_769_982_480_583_535_806_7;
    const C32: Real = 9.207_679_429_833_079_124_215_681_847_400_3;
    const B1: Real = 1.0;
    const B2: Real = 6.169_794_704_382_824_559_255_361_568_973_0;
    const B3: Real = -0.427_722_565_432_185_733_262_383_738_065_1;
    const E1: Real = 0.5;
    const E2: Real = -2.907_955_871_680_546_982_171_823_620_801_7;
    const E3: Real = 0.223_540_698_978_115_696_273_609_092_761_9;
    const C2: Real = Self::GAMMA;
    const D1: Real = Self::GAMMA;
    const D2: Real = 0.242_919_964_548_163_668_045_922_496_833_14;
    const D3: Real = 2.185_138_002_766_405_851_151_316_948_583_2;
}

impl StepScheme for Rosenbrock23 {
    const NAME: &'static str = "Rosenbrock23";

    fn trial(
        &self,
        system: &dyn OdeSystem,
        x0: Real,
        y0: &DVector<Real>,
        dydx0: &DVector<Real>,
        dx: Real,
        y: &mut DVector<Real>,
    ) -> ChemistryResult<DVector<Real>> {
        let (dfdx, dfdy) = system.jacobian(x0, y0)?;
        let a = IterationMatrix::new(&dfdy, Self::GAMMA, dx);

        let k1 = a.solve(dydx0 + (dx * Self::D1) * &dfdx)?;

        let y1 = y0 + Self::A21 * &k1;
        let dydx = system.derivatives(x0 + Self::C2 * dx, &y1)?;
        let k2 = a.solve(&dydx + (dx * Self::D2) * &dfdx + (Self::C21 / dx) * &k1)?;

        // third stage reuses the second-stage derivatives
        let k3 = a.solve(
            &dydx + (dx * Self::D3) * &dfdx + (Self::C31 / dx) * &k1 + (Self::C32 / dx) * &k2,
        )?;

        *y = y0 + Self::B1 * &k1 + Self::B2 * &k2 + Self::B3 * &k3;
        Ok(Self::E1 * k1 + Self::E2 * k2 + Self::E3 * k3)
    }
}
