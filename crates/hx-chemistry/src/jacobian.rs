//! Finite difference Jacobian computation.

use hx_core::Real;
use nalgebra::{DMatrix, DVector};

use crate::error::ChemistryResult;

/// Relative perturbation used for forward differences.
pub const JACOBIAN_EPSILON: Real = 1.0e-8;

/// Compute a Jacobian using forward finite differences.
///
/// Column `j` perturbs `x[j]` by `epsilon * max(|x[j]|, floor[j])`, so
/// variables that sit at zero are still perturbed on their natural scale.
pub fn finite_difference_jacobian<F>(
    x: &DVector<Real>,
    f: F,
    epsilon: Real,
    floor: &DVector<Real>,
) -> ChemistryResult<DMatrix<Real>>
where
    F: Fn(&DVector<Real>) -> ChemistryResult<DVector<Real>>,
{
    let n = x.len();
    let f_x = f(x)?;
    let m = f_x.len();

    let mut jac = DMatrix::zeros(m, n);
    let mut x_perturbed = x.clone();

    for j in 0..n {
        let xj = x[j];
        x_perturbed[j] = xj + epsilon * xj.abs().max(floor[j]);
        // exactly representable step
        let dx = x_perturbed[j] - xj;

        let f_perturbed = f(&x_perturbed)?;
        jac.set_column(j, &((f_perturbed - &f_x) / dx));
        x_perturbed[j] = xj;
    }

    Ok(jac)
}
