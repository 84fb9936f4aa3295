use crate::HxError;

/// Floating point type used throughout system
pub type Real = f64;

/// Small positive number added before dividing by a near-zero quantity.
pub const SMALL: Real = 1e-15;

/// Smallest step an adaptive integrator may take before giving up.
pub const VSMALL: Real = 1e-300;

/// Stand-in for "no limit" in min() reductions.
pub const GREAT: Real = 1e15;

/// One tolerance for everything
#[derive(Clone, Copy, Debug)]
pub struct Tolerances {
    pub abs: Real,
    pub rel: Real,
}

impl Default for Tolerances {
    fn default() -> Self {
        Self {
            abs: 1e-12,
            rel: 1e-9,
        }
    }
}

pub fn nearly_equal(a: Real, b: Real, tol: Tolerances) -> bool {
    let diff = (a - b).abs();
    if diff <= tol.abs {
        return true;
    }
    diff <= tol.rel * a.abs().max(b.abs())
}

pub fn ensure_finite(v: Real, what: &'static str) -> Result<Real, HxError> {
    if v.is_finite() {
        Ok(v)
    } else {
        Err(HxError::NonFinite { what, value: v })
    }
}

/// Push `x` away from zero by `small`, keeping its sign.
///
/// Every division by an observed stability number or chemical rate goes
/// through here so there is exactly one epsilon policy in the code base.
pub fn stabilise(x: Real, small: Real) -> Real {
    if x >= 0.0 { x + small } else { x - small }
}

/// Returns the ratio if it can take part in a min() reduction.
///
/// Non-finite values are unusable; callers substitute a negligible
/// placeholder and log the substitution.
pub fn usable_ratio(x: Real) -> Option<Real> {
    x.is_finite().then_some(x)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nearly_equal_basic() {
        let tol = Tolerances {
            abs: 1e-12,
            rel: 1e-9,
        };
        assert!(nearly_equal(1.0, 1.0 + 1e-12, tol));
        assert!(nearly_equal(0.0, 1e-13, tol));
        assert!(!nearly_equal(1.0, 1.0 + 1e-6, tol));
    }

    #[test]
    fn ensure_finite_detects_nan() {
        let err = ensure_finite(Real::NAN, "test").unwrap_err();
        let msg = format!("{err}");
        assert!(msg.contains("Non-finite"));
    }

    #[test]
    fn stabilise_moves_away_from_zero() {
        assert_eq!(stabilise(0.0, SMALL), SMALL);
        assert!(stabilise(-1.0, 0.5) < -1.0);
        assert!(stabilise(2.0, 0.5) > 2.0);
    }

    #[test]
    fn usable_ratio_rejects_non_finite() {
        assert_eq!(usable_ratio(0.3), Some(0.3));
        assert!(usable_ratio(Real::NAN).is_none());
        assert!(usable_ratio(Real::INFINITY).is_none());
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn stabilised_value_is_never_zero(x in -1e3_f64..1e3_f64) {
            prop_assert!(stabilise(x, SMALL) != 0.0);
            prop_assert!(stabilise(x, SMALL).abs() >= x.abs());
        }
    }
}
