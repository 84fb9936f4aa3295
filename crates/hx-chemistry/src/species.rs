//! Per-specie thermodynamics.

use hx_core::Real;
use hx_core::constants::TSTD;

use crate::error::{ChemistryError, ChemistryResult};

/// Constant-cp ideal-gas specie.
///
/// Enthalpies are per unit mass and referenced to `TSTD`.
#[derive(Debug, Clone, PartialEq)]
pub struct SpecieThermo {
    pub name: String,
    /// Molar mass [kg/kmol]
    pub molar_mass: Real,
    /// Specific heat at constant pressure [J/kg/K]
    pub cp: Real,
    /// Heat of formation at `TSTD` [J/kg]
    pub hf: Real,
}

impl SpecieThermo {
    pub fn new(name: impl Into<String>, molar_mass: Real, cp: Real, hf: Real) -> ChemistryResult<Self> {
        let name = name.into();
        if !(molar_mass.is_finite() && molar_mass > 0.0) {
            return Err(ChemistryError::NonPhysical {
                what: format!("molar mass of '{name}' must be positive"),
            });
        }
        if !(cp.is_finite() && cp > 0.0) {
            return Err(ChemistryError::NonPhysical {
                what: format!("cp of '{name}' must be positive"),
            });
        }
        if !hf.is_finite() {
            return Err(ChemistryError::NonPhysical {
                what: format!("heat of formation of '{name}' is not finite"),
            });
        }
        Ok(Self {
            name,
            molar_mass,
            cp,
            hf,
        })
    }

    /// Sensible enthalpy [J/kg].
    pub fn hs(&self, t: Real) -> Real {
        self.cp * (t - TSTD)
    }

    /// Absolute enthalpy [J/kg].
    pub fn ha(&self, t: Real) -> Real {
        self.hs(t) + self.hf
    }

    /// Specific gas constant [J/kg/K].
    pub fn gas_constant(&self) -> Real {
        hx_core::constants::RR / self.molar_mass
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enthalpy_is_referenced_to_standard_temperature() {
        let n2 = SpecieThermo::new("N2", 28.0134, 1040.0, 0.0).unwrap();
        assert_eq!(n2.hs(TSTD), 0.0);
        assert!((n2.hs(TSTD + 100.0) - 104_000.0).abs() < 1e-9);

        let h2o = SpecieThermo::new("H2O", 18.0153, 1864.0, -1.3423e7).unwrap();
        assert_eq!(h2o.ha(TSTD), -1.3423e7);
    }

    #[test]
    fn rejects_non_physical_data() {
        assert!(SpecieThermo::new("X", 0.0, 1000.0, 0.0).is_err());
        assert!(SpecieThermo::new("X", 10.0, -1.0, 0.0).is_err());
        assert!(SpecieThermo::new("X", 10.0, 1000.0, Real::NAN).is_err());
    }
}
