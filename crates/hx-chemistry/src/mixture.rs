//! Ideal-gas mixture of constant-cp species.

use std::collections::HashMap;

use hx_core::Real;
use hx_core::constants::{RR, TSTD};

use crate::error::{ChemistryError, ChemistryResult};
use crate::species::SpecieThermo;

/// Basis of a user-given composition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FractionBasis {
    Mass,
    Mole,
}

/// Density, pressure and gas constant of a closed constant-volume cell.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConstantVolumeState {
    pub rho: Real,
    pub p: Real,
    /// Specific gas constant [J/kg/K]
    pub gas_constant: Real,
}

/// Ordered set of species sharing one mass-fraction vector.
#[derive(Debug, Clone, PartialEq)]
pub struct Mixture {
    species: Vec<SpecieThermo>,
    index: HashMap<String, usize>,
}

impl Mixture {
    pub fn new(species: Vec<SpecieThermo>) -> ChemistryResult<Self> {
        if species.is_empty() {
            return Err(ChemistryError::InvalidArg {
                what: "mixture has no species".into(),
            });
        }
        let mut index = HashMap::with_capacity(species.len());
        for (i, s) in species.iter().enumerate() {
            if index.insert(s.name.clone(), i).is_some() {
                return Err(ChemistryError::InvalidArg {
                    what: format!("specie '{}' listed twice", s.name),
                });
            }
        }
        Ok(Self { species, index })
    }

    pub fn len(&self) -> usize {
        self.species.len()
    }

    pub fn is_empty(&self) -> bool {
        self.species.is_empty()
    }

    pub fn species(&self) -> &[SpecieThermo] {
        &self.species
    }

    pub fn names(&self) -> Vec<&str> {
        self.species.iter().map(|s| s.name.as_str()).collect()
    }

    /// Index of a specie by name.
    pub fn index_of(&self, name: &str) -> ChemistryResult<usize> {
        self.index
            .get(name)
            .copied()
            .ok_or_else(|| ChemistryError::UnknownSpecie {
                name: name.to_string(),
                valid: self.names().into_iter().map(str::to_string).collect(),
            })
    }

    /// Mixture gas constant `R = RR Σ Y_i/W_i` [J/kg/K].
    pub fn gas_constant(&self, y: &[Real]) -> Real {
        RR * self.moles_per_mass(y)
    }

    /// Mean molar mass [kg/kmol].
    pub fn molar_mass(&self, y: &[Real]) -> Real {
        1.0 / self.moles_per_mass(y)
    }

    fn moles_per_mass(&self, y: &[Real]) -> Real {
        self.species
            .iter()
            .zip(y)
            .map(|(s, yi)| yi / s.molar_mass)
            .sum()
    }

    pub fn cp(&self, y: &[Real]) -> Real {
        self.species.iter().zip(y).map(|(s, yi)| yi * s.cp).sum()
    }

    pub fn hs(&self, y: &[Real], t: Real) -> Real {
        self.species.iter().zip(y).map(|(s, yi)| yi * s.hs(t)).sum()
    }

    pub fn ha(&self, y: &[Real], t: Real) -> Real {
        self.species.iter().zip(y).map(|(s, yi)| yi * s.ha(t)).sum()
    }

    /// Temperature with the given sensible enthalpy.
    pub fn t_from_hs(&self, y: &[Real], hs: Real) -> ChemistryResult<Real> {
        let cp = self.cp(y);
        if !(cp > 0.0) {
            return Err(ChemistryError::NonPhysical {
                what: "mixture cp is not positive".into(),
            });
        }
        Ok(TSTD + hs / cp)
    }

    /// Temperature with the given absolute enthalpy.
    pub fn t_from_ha(&self, y: &[Real], ha: Real) -> ChemistryResult<Real> {
        let hf: Real = self.species.iter().zip(y).map(|(s, yi)| yi * s.hf).sum();
        self.t_from_hs(y, ha - hf)
    }

    /// Ideal-gas density.
    pub fn rho(&self, y: &[Real], p: Real, t: Real) -> Real {
        p / (self.gas_constant(y) * t)
    }

    /// Molar concentrations [kmol/m^3].
    pub fn concentrations(&self, y: &[Real], rho: Real) -> Vec<Real> {
        self.species
            .iter()
            .zip(y)
            .map(|(s, yi)| rho * yi / s.molar_mass)
            .collect()
    }

    /// Mass fractions and density of a concentration vector.
    pub fn mass_fractions(&self, c: &[Real]) -> (Vec<Real>, Real) {
        let partial: Vec<Real> = self
            .species
            .iter()
            .zip(c)
            .map(|(s, ci)| ci * s.molar_mass)
            .collect();
        let rho: Real = partial.iter().sum();
        if rho > 0.0 {
            (partial.iter().map(|m| m / rho).collect(), rho)
        } else {
            (vec![0.0; partial.len()], 0.0)
        }
    }

    /// Normalized mass fractions from named fractions on either basis.
    ///
    /// Species not named get zero.
    pub fn fractions(&self, basis: FractionBasis, entries: &[(String, Real)]) -> ChemistryResult<Vec<Real>> {
        let mut x = vec![0.0; self.len()];
        for (name, value) in entries {
            if !value.is_finite() || *value < 0.0 {
                return Err(ChemistryError::NonPhysical {
                    what: format!("fraction of '{name}' must be finite and non-negative"),
                });
            }
            x[self.index_of(name)?] += value;
        }

        let mut y: Vec<Real> = match basis {
            FractionBasis::Mass => x,
            FractionBasis::Mole => self
                .species
                .iter()
                .zip(&x)
                .map(|(s, xi)| xi * s.molar_mass)
                .collect(),
        };
        let sum: Real = y.iter().sum();
        if !(sum > 0.0) || !sum.is_finite() {
            return Err(ChemistryError::NonPhysical {
                what: "fractions sum to zero or non-finite".into(),
            });
        }
        for yi in &mut y {
            *yi /= sum;
        }
        Ok(y)
    }

    /// Closed-cell update: density stays `rho0`, pressure follows the
    /// ideal-gas law with the current composition.
    pub fn constant_volume_update(&self, y: &[Real], t: Real, rho0: Real) -> ConstantVolumeState {
        let gas_constant = self.gas_constant(y);
        ConstantVolumeState {
            rho: rho0,
            p: rho0 * gas_constant * t,
            gas_constant,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hx_core::{Tolerances, nearly_equal};

    fn air() -> Mixture {
        Mixture::new(vec![
            SpecieThermo::new("O2", 31.9988, 918.0, 0.0).unwrap(),
            SpecieThermo::new("N2", 28.0134, 1040.0, 0.0).unwrap(),
        ])
        .unwrap()
    }

    const TOL: Tolerances = Tolerances {
        abs: 1e-12,
        rel: 1e-9,
    };

    #[test]
    fn mole_fractions_convert_to_mass_fractions() {
        let m = air();
        let y = m
            .fractions(FractionBasis::Mole, &[("O2".into(), 0.21), ("N2".into(), 0.79)])
            .unwrap();
        let w = 0.21 * 31.9988 + 0.79 * 28.0134;
        assert!(nearly_equal(y[0], 0.21 * 31.9988 / w, TOL));
        assert!(nearly_equal(m.molar_mass(&y), w, TOL));
    }

    #[test]
    fn mass_fractions_are_normalized() {
        let m = air();
        let y = m
            .fractions(FractionBasis::Mass, &[("O2".into(), 2.0), ("N2".into(), 6.0)])
            .unwrap();
        assert_eq!(y, vec![0.25, 0.75]);
    }

    #[test]
    fn unknown_specie_lists_alternatives() {
        let err = air()
            .fractions(FractionBasis::Mass, &[("H2".into(), 1.0)])
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Unknown specie 'H2'. Valid species are: O2, N2"
        );
    }

    #[test]
    fn concentrations_round_trip_density() {
        let m = air();
        let y = vec![0.23, 0.77];
        let rho = m.rho(&y, 1e5, 800.0);
        let c = m.concentrations(&y, rho);
        let (y2, rho2) = m.mass_fractions(&c);
        assert!(nearly_equal(rho2, rho, TOL));
        assert!(nearly_equal(y2[1], 0.77, TOL));
    }

    #[test]
    fn temperature_inverts_enthalpy() {
        let m = air();
        let y = vec![0.23, 0.77];
        let hs = m.hs(&y, 1200.0);
        assert!(nearly_equal(m.t_from_hs(&y, hs).unwrap(), 1200.0, TOL));
        let ha = m.ha(&y, 900.0);
        assert!(nearly_equal(m.t_from_ha(&y, ha).unwrap(), 900.0, TOL));
    }

    #[test]
    fn constant_volume_pressure_follows_ideal_gas() {
        let m = air();
        let y = vec![0.23, 0.77];
        let rho0 = m.rho(&y, 1e5, 1000.0);
        let state = m.constant_volume_update(&y, 2000.0, rho0);
        assert_eq!(state.rho, rho0);
        assert!(nearly_equal(state.p, 2e5, Tolerances { abs: 1e-6, rel: 1e-9 }));
    }

    #[test]
    fn rejects_duplicate_species() {
        let o2 = SpecieThermo::new("O2", 31.9988, 918.0, 0.0).unwrap();
        assert!(Mixture::new(vec![o2.clone(), o2]).is_err());
        assert!(Mixture::new(Vec::new()).is_err());
    }
}
