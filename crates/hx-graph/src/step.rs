//! Solve steps and how solver objects declare them.

use std::collections::BTreeSet;

/// Loop executed once per time step, possibly several times over.
pub const OUTER_CORRECTOR: &str = "outerCorrector";

/// Loop executed once before the first time step.
pub const INITIALISATION_LOOP: &str = "initialisationLoop";

/// One named unit of work in the dependency-ordered execution graph.
///
/// Immutable once the graph is built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SolveStep {
    pub name: String,
    /// Solver object that declared the step.
    pub owner: String,
    /// Steps that must run before this one.
    pub required: BTreeSet<String>,
    /// Steps that run before this one when present.
    pub optional: BTreeSet<String>,
    /// Named correction loops this step is executed in.
    pub loops: BTreeSet<String>,
}

impl SolveStep {
    pub fn new(name: impl Into<String>, owner: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            owner: owner.into(),
            required: BTreeSet::new(),
            optional: BTreeSet::new(),
            loops: BTreeSet::new(),
        }
    }

    /// True if the step belongs to no named loop at all.
    pub fn is_unassigned(&self) -> bool {
        self.loops.is_empty()
    }

    /// True if the step runs inside the outer corrector.
    ///
    /// Steps that belong to no loop, or only to inner loops, are scheduled
    /// in the outer corrector. An initialisation step joins it only when
    /// listed there explicitly.
    pub fn in_outer_corrector(&self) -> bool {
        self.is_unassigned()
            || self.loops.contains(OUTER_CORRECTOR)
            || !self.loops.contains(INITIALISATION_LOOP)
    }
}

/// Everything one solver object declares about its solves.
///
/// Dependency and membership entries may name steps owned by other
/// objects; entries keyed on a step nobody declares are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SolveContribution {
    pub solve_names: Vec<String>,
    pub required: Vec<(String, Vec<String>)>,
    pub optional: Vec<(String, Vec<String>)>,
    pub correctors: Vec<(String, Vec<String>)>,
}

impl SolveContribution {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare solve names owned by the contributing object.
    pub fn solves<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.solve_names.extend(names.into_iter().map(Into::into));
        self
    }

    /// `step` must run after every step in `deps`.
    pub fn requires<I, S>(mut self, step: impl Into<String>, deps: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.required
            .push((step.into(), deps.into_iter().map(Into::into).collect()));
        self
    }

    /// `step` runs after each step in `deps` that is present.
    pub fn optionally_after<I, S>(mut self, step: impl Into<String>, deps: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.optional
            .push((step.into(), deps.into_iter().map(Into::into).collect()));
        self
    }

    /// Add `members` to the loop called `loop_name`.
    pub fn member_of<I, S>(mut self, loop_name: impl Into<String>, members: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.correctors
            .push((loop_name.into(), members.into_iter().map(Into::into).collect()));
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unassigned_step_runs_in_outer_corrector() {
        let step = SolveStep::new("reactions", "chemistry");
        assert!(step.is_unassigned());
        assert!(step.in_outer_corrector());
    }

    #[test]
    fn initialisation_only_step_is_not_in_outer_corrector() {
        let mut step = SolveStep::new("fvMeshInit", "mesh");
        step.loops.insert(INITIALISATION_LOOP.to_string());
        assert!(!step.in_outer_corrector());
    }

    #[test]
    fn inner_loop_member_runs_in_outer_corrector() {
        let mut step = SolveStep::new("p", "flow");
        step.loops.insert("PISOCorrector".to_string());
        assert!(step.in_outer_corrector());

        step.loops.insert(INITIALISATION_LOOP.to_string());
        assert!(!step.in_outer_corrector());
        step.loops.insert(OUTER_CORRECTOR.to_string());
        assert!(step.in_outer_corrector());
    }

    #[test]
    fn contribution_builder_collects_entries() {
        let c = SolveContribution::new()
            .solves(["a", "b"])
            .requires("b", ["a"])
            .optionally_after("a", ["mesh"])
            .member_of(OUTER_CORRECTOR, ["a", "b"]);
        assert_eq!(c.solve_names, vec!["a", "b"]);
        assert_eq!(c.required, vec![("b".to_string(), vec!["a".to_string()])]);
        assert_eq!(c.optional.len(), 1);
        assert_eq!(c.correctors[0].0, OUTER_CORRECTOR);
    }
}
