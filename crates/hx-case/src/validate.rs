//! Case validation logic.

use std::collections::HashSet;

use crate::schema::{Case, ChemistryDef, ControlDef, CorrectorsDef, InitialDef, LoopDef, ReactionDef, WriteControlDef};

#[derive(thiserror::Error, Debug)]
pub enum ValidationError {
    #[error("Duplicate name: {name} in {context}")]
    DuplicateName { name: String, context: String },

    #[error("Missing reference: {name} in {context}")]
    MissingReference { name: String, context: String },

    #[error("Invalid value: {field} = {value} ({reason})")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Unsupported version: {version}")]
    UnsupportedVersion { version: u32 },
}

fn invalid(field: &str, value: impl ToString, reason: &str) -> ValidationError {
    ValidationError::InvalidValue {
        field: field.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

fn positive(field: &str, value: f64) -> Result<(), ValidationError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(invalid(field, value, "must be positive"))
    }
}

/// Structural checks; model names are checked when the models are built.
pub fn validate_case(case: &Case) -> Result<(), ValidationError> {
    if case.version > crate::migrate::LATEST_VERSION {
        return Err(ValidationError::UnsupportedVersion {
            version: case.version,
        });
    }

    validate_control(&case.control)?;
    validate_correctors(&case.correctors)?;
    validate_chemistry(&case.chemistry)?;

    if case.species.is_empty() {
        return Err(invalid("species", "[]", "at least one specie is required"));
    }
    let mut names = HashSet::new();
    for specie in &case.species {
        if !names.insert(specie.name.as_str()) {
            return Err(ValidationError::DuplicateName {
                name: specie.name.clone(),
                context: "species".to_string(),
            });
        }
        positive(&format!("species.{}.molarMass", specie.name), specie.molar_mass)?;
        positive(&format!("species.{}.cp", specie.name), specie.cp)?;
        if !specie.hf.is_finite() {
            return Err(invalid(&format!("species.{}.hf", specie.name), specie.hf, "must be finite"));
        }
    }

    let mut reactions = HashSet::new();
    for reaction in &case.reactions {
        if !reactions.insert(reaction.name.as_str()) {
            return Err(ValidationError::DuplicateName {
                name: reaction.name.clone(),
                context: "reactions".to_string(),
            });
        }
        validate_reaction(reaction, &names)?;
    }

    validate_initial(&case.initial, &names)?;

    let mut objects = HashSet::new();
    for object in &case.solver_objects {
        if !objects.insert(object.as_str()) {
            return Err(ValidationError::DuplicateName {
                name: object.clone(),
                context: "solverObjects".to_string(),
            });
        }
    }
    if case.solver_objects.is_empty() {
        return Err(invalid("solverObjects", "[]", "at least one solver object is required"));
    }
    Ok(())
}

pub(crate) fn validate_control(control: &ControlDef) -> Result<(), ValidationError> {
    if !control.start_time.is_finite() {
        return Err(invalid("control.startTime", control.start_time, "must be finite"));
    }
    if !(control.end_time.is_finite() && control.end_time > control.start_time) {
        return Err(invalid("control.endTime", control.end_time, "must be after startTime"));
    }
    positive("control.deltaT", control.delta_t)?;
    positive("control.minDeltaT", control.min_delta_t)?;
    if !(control.max_delta_t > control.min_delta_t) {
        return Err(invalid("control.maxDeltaT", control.max_delta_t, "must exceed minDeltaT"));
    }
    if !(control.max_growth.is_finite() && control.max_growth >= 1.0) {
        return Err(invalid("control.maxGrowth", control.max_growth, "must be at least 1"));
    }
    match control.write_control {
        WriteControlDef::TimeStep { interval } if interval == 0 => {
            Err(invalid("control.writeControl.interval", interval, "must be positive"))
        }
        WriteControlDef::RunTime { interval } => positive("control.writeControl.interval", interval),
        WriteControlDef::TimeStep { .. } => Ok(()),
    }
}

fn validate_loop(name: &str, def: &LoopDef) -> Result<(), ValidationError> {
    if def.n_correctors == 0 {
        return Err(invalid(&format!("correctors.{name}.nCorrectors"), 0, "must be positive"));
    }
    if let Some(tol) = def.residual_tolerance {
        if !(tol.is_finite() && tol >= 0.0) {
            return Err(invalid(
                &format!("correctors.{name}.residualTolerance"),
                tol,
                "must be non-negative",
            ));
        }
    }
    Ok(())
}

fn validate_correctors(correctors: &CorrectorsDef) -> Result<(), ValidationError> {
    validate_loop("outerCorrector", &correctors.outer_corrector)?;
    for (name, def) in &correctors.inner {
        validate_loop(name, def)?;
    }
    Ok(())
}

fn validate_chemistry(chemistry: &ChemistryDef) -> Result<(), ValidationError> {
    positive("chemistry.absTol", chemistry.abs_tol)?;
    positive("chemistry.relTol", chemistry.rel_tol)?;
    positive("chemistry.cTauChem", chemistry.c_tau_chem)?;
    positive("chemistry.maxChemicalTimeStep", chemistry.max_chemical_time_step)?;
    if let Some(dt) = chemistry.initial_chemical_time_step {
        positive("chemistry.initialChemicalTimeStep", dt)?;
    }
    if chemistry.max_steps == 0 {
        return Err(invalid("chemistry.maxSteps", 0, "must be positive"));
    }
    Ok(())
}

fn validate_reaction(reaction: &ReactionDef, species: &HashSet<&str>) -> Result<(), ValidationError> {
    if reaction.reactants.is_empty() {
        return Err(invalid(
            &format!("reactions.{}.reactants", reaction.name),
            "[]",
            "a reaction needs at least one reactant",
        ));
    }
    for term in reaction.reactants.iter().chain(&reaction.products) {
        if !species.contains(term.specie.as_str()) {
            return Err(ValidationError::MissingReference {
                name: term.specie.clone(),
                context: format!("reaction '{}'", reaction.name),
            });
        }
        positive(&format!("reactions.{}.{}.coeff", reaction.name, term.specie), term.coeff)?;
    }
    for rate in std::iter::once(&reaction.forward).chain(&reaction.reverse) {
        if !(rate.a.is_finite() && rate.a >= 0.0 && rate.beta.is_finite() && rate.ta.is_finite()) {
            return Err(invalid(
                &format!("reactions.{}.rate", reaction.name),
                format!("{rate:?}"),
                "Arrhenius parameters must be finite with A >= 0",
            ));
        }
    }
    Ok(())
}

fn validate_initial(initial: &InitialDef, species: &HashSet<&str>) -> Result<(), ValidationError> {
    positive("initial.temperature", initial.temperature)?;
    positive("initial.pressure", initial.pressure)?;
    if initial.n_cells == 0 {
        return Err(invalid("initial.nCells", 0, "must be positive"));
    }
    let mut sum = 0.0;
    for (name, value) in &initial.fractions {
        if !species.contains(name.as_str()) {
            return Err(ValidationError::MissingReference {
                name: name.clone(),
                context: "initial.fractions".to_string(),
            });
        }
        if !(value.is_finite() && *value >= 0.0) {
            return Err(invalid(&format!("initial.fractions.{name}"), value, "must be non-negative"));
        }
        sum += value;
    }
    if !(sum > 0.0) {
        return Err(invalid("initial.fractions", sum, "fractions must not all be zero"));
    }
    Ok(())
}
