//! Conversion of a validated case into runtime objects.

use hx_chemistry::{
    ArrheniusRate, ChemistrySettings, ChemistrySolverSettings, FractionBasis, Mechanism, Mixture, OdeSettings,
    Reaction, SpecieCoeff, SpecieThermo,
};
use hx_core::{Pressure, Real, Temperature, k, pa};
use hx_sim::{
    CorrectorSettings, FieldRegistry, SolverObjectArgs, TimeControl, TimeLoop, TimeLoopSettings, WriteControl,
    create_objects, initial_fields, solver_objects,
};
use uom::si::pressure::pascal;
use uom::si::thermodynamic_temperature::kelvin;

use crate::CaseResult;
use crate::schema::{ArrheniusDef, Case, ControlDef, FractionBasisDef, LoopDef, TermDef, WriteControlDef};

impl From<&ControlDef> for TimeControl {
    fn from(c: &ControlDef) -> Self {
        TimeControl {
            adjust_time_step: c.adjust_time_step,
            delta_t: c.delta_t,
            max_delta_t: c.max_delta_t,
            min_delta_t: c.min_delta_t,
            max_growth: c.max_growth,
        }
    }
}

impl From<WriteControlDef> for WriteControl {
    fn from(w: WriteControlDef) -> Self {
        match w {
            WriteControlDef::TimeStep { interval } => WriteControl::TimeStep { interval },
            WriteControlDef::RunTime { interval } => WriteControl::RunTime { interval },
        }
    }
}

impl From<&LoopDef> for CorrectorSettings {
    fn from(l: &LoopDef) -> Self {
        CorrectorSettings {
            max_iterations: l.n_correctors,
            residual_tolerance: l.residual_tolerance,
            convergence_required: l.convergence_required,
        }
    }
}

impl From<ArrheniusDef> for ArrheniusRate {
    fn from(a: ArrheniusDef) -> Self {
        ArrheniusRate::new(a.a, a.beta, a.ta)
    }
}

fn coefficients(mixture: &Mixture, terms: &[TermDef]) -> CaseResult<Vec<SpecieCoeff>> {
    terms
        .iter()
        .map(|t| -> CaseResult<SpecieCoeff> {
            let coeff = SpecieCoeff::new(mixture.index_of(&t.specie)?, t.coeff);
            Ok(match t.exponent {
                Some(e) => coeff.with_exponent(e),
                None => coeff,
            })
        })
        .collect()
}

impl Case {
    pub fn mixture(&self) -> CaseResult<Mixture> {
        let species = self
            .species
            .iter()
            .map(|s| SpecieThermo::new(s.name.clone(), s.molar_mass, s.cp, s.hf))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Mixture::new(species)?)
    }

    pub fn mechanism(&self) -> CaseResult<Mechanism> {
        let mixture = self.mixture()?;
        let mut reactions = Vec::with_capacity(self.reactions.len());
        for r in &self.reactions {
            let lhs = coefficients(&mixture, &r.reactants)?;
            let rhs = coefficients(&mixture, &r.products)?;
            let reaction = match r.reverse {
                Some(kr) => Reaction::reversible(r.name.clone(), lhs, rhs, r.forward.into(), kr.into())?,
                None => Reaction::irreversible(r.name.clone(), lhs, rhs, r.forward.into())?,
            };
            reactions.push(reaction);
        }
        Ok(Mechanism::new(mixture, reactions)?)
    }

    pub fn time_control(&self) -> TimeControl {
        TimeControl::from(&self.control)
    }

    pub fn time_loop_settings(&self) -> TimeLoopSettings {
        TimeLoopSettings {
            start_time: self.control.start_time,
            end_time: self.control.end_time,
            control: self.time_control(),
            write: self.control.write_control.into(),
            outer: CorrectorSettings::from(&self.correctors.outer_corrector),
            inner: self
                .correctors
                .inner
                .iter()
                .map(|(name, def)| (name.clone(), CorrectorSettings::from(def)))
                .collect(),
        }
    }

    pub fn chemistry_solver_settings(&self) -> ChemistrySolverSettings {
        let c = &self.chemistry;
        ChemistrySolverSettings {
            ode_solver: c.ode_solver.clone(),
            ode: OdeSettings {
                abs_tol: c.abs_tol,
                rel_tol: c.rel_tol,
                max_steps: c.max_steps,
            },
            c_tau_chem: c.c_tau_chem,
        }
    }

    pub fn chemistry_settings(&self) -> ChemistrySettings {
        ChemistrySettings {
            initial_chemical_time_step: self.chemistry.initial_chemical_time_step,
            max_chemical_time_step: self.chemistry.max_chemical_time_step,
            max_tiny_sub_steps: self.chemistry.max_tiny_sub_steps,
        }
    }

    pub fn solver_object_args(&self) -> CaseResult<SolverObjectArgs> {
        Ok(SolverObjectArgs {
            mechanism: self.mechanism()?,
            chemistry_solver: self.chemistry.solver.clone(),
            chemistry_solver_settings: self.chemistry_solver_settings(),
            chemistry_settings: self.chemistry_settings(),
            constant_volume: self.initial.constant_volume,
        })
    }

    pub fn initial_temperature(&self) -> Temperature {
        k(self.initial.temperature)
    }

    pub fn initial_pressure(&self) -> Pressure {
        pa(self.initial.pressure)
    }

    /// Normalized initial mass fractions, in mixture order.
    pub fn initial_mass_fractions(&self, mixture: &Mixture) -> CaseResult<Vec<Real>> {
        let entries: Vec<(String, Real)> = self
            .initial
            .fractions
            .iter()
            .map(|(name, value)| (name.clone(), *value))
            .collect();
        let basis = match self.initial.basis {
            FractionBasisDef::Mass => FractionBasis::Mass,
            FractionBasisDef::Mole => FractionBasis::Mole,
        };
        Ok(mixture.fractions(basis, &entries)?)
    }

    pub fn initial_fields(&self, mixture: &Mixture) -> CaseResult<FieldRegistry> {
        let y = self.initial_mass_fractions(mixture)?;
        Ok(initial_fields(
            mixture,
            self.initial.n_cells,
            self.initial_temperature().get::<kelvin>(),
            self.initial_pressure().get::<pascal>(),
            &y,
        )?)
    }

    /// Build the solver objects with the built-in registry and wire them
    /// into a time loop.
    pub fn build_time_loop(&self) -> CaseResult<TimeLoop> {
        let args = self.solver_object_args()?;
        let fields = self.initial_fields(args.mechanism.mixture())?;
        let objects = create_objects(&solver_objects()?, &self.solver_objects, &args)?;
        Ok(TimeLoop::new(objects, fields, self.time_loop_settings())?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::migrate::LATEST_VERSION;
    use crate::schema::testing::minimal;
    use crate::schema::SpecieDef;

    fn air() -> Case {
        let mut case = minimal(LATEST_VERSION);
        case.species.push(SpecieDef {
            name: "O2".to_string(),
            molar_mass: 32.0,
            cp: 918.0,
            hf: 0.0,
        });
        case.initial.basis = FractionBasisDef::Mole;
        case.initial.fractions = [("N2".to_string(), 0.79), ("O2".to_string(), 0.21)].into();
        case.solver_objects = vec!["reactions".to_string(), "species".to_string()];
        case
    }

    #[test]
    fn mole_fractions_are_converted_to_mass() {
        let case = air();
        let mixture = case.mixture().unwrap();
        let y = case.initial_mass_fractions(&mixture).unwrap();
        let w = 0.79 * 28.0134 + 0.21 * 32.0;
        assert!((y[0] - 0.79 * 28.0134 / w).abs() < 1e-12);
        assert!((y[0] + y[1] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn controls_and_loops_carry_over() {
        let mut case = air();
        case.control.adjust_time_step = true;
        case.correctors.outer_corrector.n_correctors = 3;
        let settings = case.time_loop_settings();
        assert!(settings.control.adjust_time_step);
        assert_eq!(settings.outer.max_iterations, 3);
        assert_eq!(settings.write, WriteControl::TimeStep { interval: 1 });
    }

    #[test]
    fn builds_a_runnable_time_loop() {
        let time_loop = air().build_time_loop().unwrap();
        assert_eq!(time_loop.schedule().outer_steps(), vec!["reactions", "species"]);
        assert_eq!(time_loop.fields().n_cells(), 1);
    }

    #[test]
    fn unknown_solver_lists_alternatives() {
        let mut case = air();
        case.chemistry.solver = "TDAC".to_string();
        let err = case.build_time_loop().unwrap_err();
        assert!(
            err.to_string().contains("Valid chemistrySolver types are: EulerImplicit, none, ode"),
            "{err}"
        );
    }
}
