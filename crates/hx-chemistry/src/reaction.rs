//! Elementary reactions with Arrhenius rate coefficients.

use hx_core::Real;

use crate::error::{ChemistryError, ChemistryResult};

/// `k = A T^beta exp(-Ta/T)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ArrheniusRate {
    pub a: Real,
    pub beta: Real,
    /// Activation temperature [K]
    pub ta: Real,
}

impl ArrheniusRate {
    pub fn new(a: Real, beta: Real, ta: Real) -> Self {
        Self { a, beta, ta }
    }

    /// Temperature-independent rate.
    pub fn constant(k: Real) -> Self {
        Self::new(k, 0.0, 0.0)
    }

    pub fn k(&self, t: Real) -> Real {
        let mut k = self.a;
        if self.beta != 0.0 {
            k *= t.powf(self.beta);
        }
        if self.ta != 0.0 {
            k *= (-self.ta / t).exp();
        }
        k
    }
}

/// One side entry of a reaction equation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpecieCoeff {
    pub index: usize,
    /// Stoichiometric coefficient
    pub stoich: Real,
    /// Concentration exponent in the rate law
    pub exponent: Real,
}

impl SpecieCoeff {
    /// Entry whose exponent equals its stoichiometric coefficient.
    pub fn new(index: usize, stoich: Real) -> Self {
        Self {
            index,
            stoich,
            exponent: stoich,
        }
    }

    pub fn with_exponent(mut self, exponent: Real) -> Self {
        self.exponent = exponent;
        self
    }
}

/// Irreversible or non-equilibrium reversible reaction.
#[derive(Debug, Clone, PartialEq)]
pub struct Reaction {
    pub name: String,
    pub lhs: Vec<SpecieCoeff>,
    pub rhs: Vec<SpecieCoeff>,
    pub kf: ArrheniusRate,
    /// Reverse rate; `None` for an irreversible reaction.
    pub kr: Option<ArrheniusRate>,
}

impl Reaction {
    pub fn irreversible(
        name: impl Into<String>,
        lhs: Vec<SpecieCoeff>,
        rhs: Vec<SpecieCoeff>,
        kf: ArrheniusRate,
    ) -> ChemistryResult<Self> {
        Self::build(name.into(), lhs, rhs, kf, None)
    }

    pub fn reversible(
        name: impl Into<String>,
        lhs: Vec<SpecieCoeff>,
        rhs: Vec<SpecieCoeff>,
        kf: ArrheniusRate,
        kr: ArrheniusRate,
    ) -> ChemistryResult<Self> {
        Self::build(name.into(), lhs, rhs, kf, Some(kr))
    }

    fn build(
        name: String,
        lhs: Vec<SpecieCoeff>,
        rhs: Vec<SpecieCoeff>,
        kf: ArrheniusRate,
        kr: Option<ArrheniusRate>,
    ) -> ChemistryResult<Self> {
        if lhs.is_empty() || rhs.is_empty() {
            return Err(ChemistryError::InvalidArg {
                what: format!("reaction '{name}' needs species on both sides"),
            });
        }
        let bad = lhs
            .iter()
            .chain(&rhs)
            .any(|sc| !(sc.stoich > 0.0 && sc.exponent >= 0.0));
        if bad {
            return Err(ChemistryError::InvalidArg {
                what: format!("reaction '{name}' has a non-positive coefficient"),
            });
        }
        Ok(Self {
            name,
            lhs,
            rhs,
            kf,
            kr,
        })
    }

    /// Highest specie index referenced.
    pub fn max_index(&self) -> usize {
        self.lhs
            .iter()
            .chain(&self.rhs)
            .map(|sc| sc.index)
            .max()
            .unwrap_or(0)
    }

    /// Net rate of progress [kmol/m^3/s].
    ///
    /// Negative concentrations contribute as zero.
    pub fn omega(&self, c: &[Real], t: Real) -> Real {
        let forward = self.kf.k(t) * product(&self.lhs, c);
        match &self.kr {
            Some(kr) => forward - kr.k(t) * product(&self.rhs, c),
            None => forward,
        }
    }

    /// Add this reaction's contribution to `dcdt`.
    pub fn add_rates(&self, c: &[Real], t: Real, dcdt: &mut [Real]) {
        let omega = self.omega(c, t);
        for sc in &self.lhs {
            dcdt[sc.index] -= sc.stoich * omega;
        }
        for sc in &self.rhs {
            dcdt[sc.index] += sc.stoich * omega;
        }
    }
}

fn product(side: &[SpecieCoeff], c: &[Real]) -> Real {
    side.iter()
        .map(|sc| {
            let ci = c[sc.index].max(0.0);
            if sc.exponent == 1.0 { ci } else { ci.powf(sc.exponent) }
        })
        .product()
}
