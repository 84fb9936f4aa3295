//! Reaction mechanism and the per-cell kinetics ODE.
//!
//! State vector layout is `[c_1 .. c_n, T, p]` with concentrations in
//! kmol/m^3. The reactor is adiabatic and closed, so the absolute enthalpy
//! per unit volume `Σ c_i W_i ha_i(T)` is conserved and `p` is carried
//! unchanged.

use hx_core::{Real, VSMALL};
use nalgebra::{DMatrix, DVector};

use crate::error::{ChemistryError, ChemistryResult};
use crate::jacobian::{JACOBIAN_EPSILON, finite_difference_jacobian};
use crate::mixture::Mixture;
use crate::ode::OdeSystem;
use crate::reaction::Reaction;

/// Relative size of the perturbation floor for concentrations.
const CONCENTRATION_FLOOR: Real = 1e-3;

#[derive(Debug, Clone, PartialEq)]
pub struct Mechanism {
    mixture: Mixture,
    reactions: Vec<Reaction>,
}

impl Mechanism {
    pub fn new(mixture: Mixture, reactions: Vec<Reaction>) -> ChemistryResult<Self> {
        if let Some(r) = reactions.iter().find(|r| r.max_index() >= mixture.len()) {
            return Err(ChemistryError::InvalidArg {
                what: format!("reaction '{}' refers to a specie outside the mixture", r.name),
            });
        }
        Ok(Self { mixture, reactions })
    }

    pub fn mixture(&self) -> &Mixture {
        &self.mixture
    }

    pub fn reactions(&self) -> &[Reaction] {
        &self.reactions
    }

    pub fn n_species(&self) -> usize {
        self.mixture.len()
    }

    /// Net production rate of every specie [kmol/m^3/s].
    pub fn species_rates(&self, c: &[Real], t: Real) -> ChemistryResult<Vec<Real>> {
        if !(t > 0.0) || !t.is_finite() {
            return Err(ChemistryError::NonPhysical {
                what: format!("temperature {t} K in reaction rate evaluation"),
            });
        }
        let mut dcdt = vec![0.0; self.n_species()];
        for r in &self.reactions {
            r.add_rates(c, t, &mut dcdt);
        }
        Ok(dcdt)
    }

    /// Absolute enthalpy per unit volume [J/m^3].
    pub fn enthalpy_density(&self, c: &[Real], t: Real) -> Real {
        self.mixture
            .species()
            .iter()
            .zip(c)
            .map(|(s, ci)| ci * s.molar_mass * s.ha(t))
            .sum()
    }

    /// Temperature at which `c` carries the given enthalpy density.
    pub fn temperature_for_enthalpy(&self, c: &[Real], h: Real) -> ChemistryResult<Real> {
        let (y, rho) = self.mixture.mass_fractions(c);
        if !(rho > 0.0) {
            return Err(ChemistryError::NonPhysical {
                what: "cell has no mass left".into(),
            });
        }
        self.mixture.t_from_ha(&y, h / rho)
    }

    /// Pack a reactor state into the ODE state vector.
    pub fn state_vector(&self, c: &[Real], t: Real, p: Real) -> DVector<Real> {
        let n = self.n_species();
        let mut y = DVector::zeros(n + 2);
        y.rows_mut(0, n).copy_from_slice(c);
        y[n] = t;
        y[n + 1] = p;
        y
    }

    /// `dT/dt = -Σ ċ_i W_i ha_i / Σ c_i W_i cp_i`.
    fn temperature_rate(&self, c: &[Real], dcdt: &[Real], t: Real) -> Real {
        let mut release = 0.0;
        let mut capacity = 0.0;
        for ((s, ci), dci) in self.mixture.species().iter().zip(c).zip(dcdt) {
            release += dci * s.molar_mass * s.ha(t);
            capacity += ci.max(0.0) * s.molar_mass * s.cp;
        }
        if capacity > VSMALL { -release / capacity } else { 0.0 }
    }
}

impl OdeSystem for Mechanism {
    fn n_eqns(&self) -> usize {
        self.n_species() + 2
    }

    fn derivatives(&self, _x: Real, y: &DVector<Real>) -> ChemistryResult<DVector<Real>> {
        let n = self.n_species();
        let c = &y.as_slice()[..n];
        let t = y[n];

        let dcdt = self.species_rates(c, t)?;
        let dtdt = self.temperature_rate(c, &dcdt, t);

        let mut dydt = DVector::zeros(n + 2);
        dydt.rows_mut(0, n).copy_from_slice(&dcdt);
        dydt[n] = dtdt;
        Ok(dydt)
    }

    fn jacobian(&self, x: Real, y: &DVector<Real>) -> ChemistryResult<(DVector<Real>, DMatrix<Real>)> {
        let n = self.n_species();
        let c_scale = y.rows(0, n).amax().max(VSMALL);
        let mut floor = DVector::from_element(n + 2, 1.0);
        floor.rows_mut(0, n).fill(CONCENTRATION_FLOOR * c_scale);

        let dfdy = finite_difference_jacobian(y, |v| self.derivatives(x, v), JACOBIAN_EPSILON, &floor)?;
        Ok((DVector::zeros(n + 2), dfdy))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reaction::{ArrheniusRate, SpecieCoeff};
    use crate::species::SpecieThermo;

    /// A -> B releasing heat, both species with equal W and cp.
    fn exothermic() -> Mechanism {
        let mixture = Mixture::new(vec![
            SpecieThermo::new("A", 20.0, 1000.0, 1.0e6).unwrap(),
            SpecieThermo::new("B", 20.0, 1000.0, 0.0).unwrap(),
        ])
        .unwrap();
        let r = Reaction::irreversible(
            "A=B",
            vec![SpecieCoeff::new(0, 1.0)],
            vec![SpecieCoeff::new(1, 1.0)],
            ArrheniusRate::constant(10.0),
        )
        .unwrap();
        Mechanism::new(mixture, vec![r]).unwrap()
    }

    #[test]
    fn heat_release_raises_temperature() {
        let m = exothermic();
        let y = m.state_vector(&[0.05, 0.0], 1000.0, 1e5);
        let dydt = m.derivatives(0.0, &y).unwrap();
        assert!((dydt[0] + 0.5).abs() < 1e-12);
        assert!((dydt[1] - 0.5).abs() < 1e-12);
        // 0.5 kmol/m3/s * 20 kg/kmol * 1e6 J/kg over 0.05*20*1000 J/m3/K
        assert!((dydt[2] - 1.0e4).abs() < 1e-6);
        assert_eq!(dydt[3], 0.0);
    }

    #[test]
    fn enthalpy_round_trips_through_temperature() {
        let m = exothermic();
        let c = [0.02, 0.03];
        let h = m.enthalpy_density(&c, 1500.0);
        assert!((m.temperature_for_enthalpy(&c, h).unwrap() - 1500.0).abs() < 1e-9);
    }

    #[test]
    fn jacobian_matches_linear_kinetics() {
        let m = exothermic();
        let y = m.state_vector(&[0.05, 0.0], 1000.0, 1e5);
        let (_, j) = m.jacobian(0.0, &y).unwrap();
        assert!((j[(0, 0)] + 10.0).abs() < 1e-4);
        assert!((j[(1, 0)] - 10.0).abs() < 1e-4);
        assert!(j[(0, 1)].abs() < 1e-9);
    }

    #[test]
    fn rejects_reaction_outside_mixture() {
        let mixture = Mixture::new(vec![SpecieThermo::new("A", 20.0, 1000.0, 0.0).unwrap()]).unwrap();
        let r = Reaction::irreversible(
            "A=B",
            vec![SpecieCoeff::new(0, 1.0)],
            vec![SpecieCoeff::new(1, 1.0)],
            ArrheniusRate::constant(1.0),
        )
        .unwrap();
        assert!(Mechanism::new(mixture, vec![r]).is_err());
    }

    #[test]
    fn non_physical_temperature_is_an_error() {
        let m = exothermic();
        assert!(m.species_rates(&[0.05, 0.0], 0.0).is_err());
    }
}
