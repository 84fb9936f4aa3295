//! Incremental solve-graph builder.

use std::collections::HashMap;

use crate::error::{GraphError, GraphResult};
use crate::order;
use crate::schedule::{self, Schedule};
use crate::step::{SolveContribution, SolveStep};

/// Builder for the solve graph of one region.
///
/// Use `add_step` or `add_contribution` to declare steps, then call
/// `build()` to resolve dependencies and freeze the execution order.
/// Dependency and loop entries are resolved at build time, so objects may
/// refer to steps declared by objects added after them.
#[derive(Debug, Default)]
pub struct SolveGraphBuilder {
    steps: Vec<SolveStep>,
    index: HashMap<String, usize>,
    pending_required: Vec<(String, Vec<String>)>,
    pending_optional: Vec<(String, Vec<String>)>,
    pending_members: Vec<(String, Vec<String>)>,
}

impl SolveGraphBuilder {
    /// Create a new empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a fully described step.
    pub fn add_step(&mut self, step: SolveStep) -> GraphResult<()> {
        if let Some(&existing) = self.index.get(&step.name) {
            return Err(GraphError::DuplicateStep {
                step: step.name,
                first: self.steps[existing].owner.clone(),
                second: step.owner,
            });
        }
        self.index.insert(step.name.clone(), self.steps.len());
        self.steps.push(step);
        Ok(())
    }

    /// Add the steps and declarations of one solver object.
    pub fn add_contribution(
        &mut self,
        owner: impl Into<String>,
        contribution: SolveContribution,
    ) -> GraphResult<()> {
        let owner = owner.into();
        for name in contribution.solve_names {
            self.add_step(SolveStep::new(name, owner.clone()))?;
        }
        self.pending_required.extend(contribution.required);
        self.pending_optional.extend(contribution.optional);
        self.pending_members.extend(contribution.correctors);
        Ok(())
    }

    /// Number of steps declared so far.
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Resolve declarations and compute the execution order.
    pub fn build(mut self) -> GraphResult<SolveGraph> {
        for (step, deps) in std::mem::take(&mut self.pending_required) {
            match self.index.get(&step) {
                Some(&i) => self.steps[i].required.extend(deps),
                None => tracing::debug!(step = %step, "ignoring dependencies of absent step"),
            }
        }
        for (step, deps) in std::mem::take(&mut self.pending_optional) {
            if let Some(&i) = self.index.get(&step) {
                self.steps[i].optional.extend(deps);
            }
        }
        for (loop_name, members) in std::mem::take(&mut self.pending_members) {
            for member in members {
                match self.index.get(&member) {
                    Some(&i) => {
                        self.steps[i].loops.insert(loop_name.clone());
                    }
                    None => tracing::debug!(
                        step = %member,
                        loop_name = %loop_name,
                        "ignoring loop membership of absent step"
                    ),
                }
            }
        }

        let order = order::linearize(&self.steps)?;
        Ok(SolveGraph {
            steps: self.steps,
            index: self.index,
            order,
        })
    }
}

/// The resolved, immutable solve graph.
#[derive(Debug, Clone)]
pub struct SolveGraph {
    /// Steps in declaration order.
    pub(crate) steps: Vec<SolveStep>,
    pub(crate) index: HashMap<String, usize>,
    /// Execution order as indices into `steps`.
    pub(crate) order: Vec<usize>,
}

impl SolveGraph {
    /// Step names in execution order.
    pub fn order(&self) -> Vec<&str> {
        self.order
            .iter()
            .map(|&i| self.steps[i].name.as_str())
            .collect()
    }

    /// Steps in execution order.
    pub fn ordered_steps(&self) -> impl Iterator<Item = &SolveStep> {
        self.order.iter().map(|&i| &self.steps[i])
    }

    /// Steps in declaration order.
    pub fn steps(&self) -> &[SolveStep] {
        &self.steps
    }

    /// Get a step by name.
    pub fn step(&self, name: &str) -> Option<&SolveStep> {
        self.index.get(name).map(|&i| &self.steps[i])
    }

    /// Position of a step in the execution order.
    pub fn position(&self, name: &str) -> GraphResult<usize> {
        let idx = self.index.get(name).ok_or_else(|| GraphError::StepNotFound {
            step: name.to_string(),
        })?;
        Ok(self
            .order
            .iter()
            .position(|i| i == idx)
            .unwrap_or(self.order.len()))
    }

    /// Members of a named loop, in execution order.
    pub fn loop_members(&self, loop_name: &str) -> Vec<&str> {
        self.ordered_steps()
            .filter(|s| s.loops.contains(loop_name))
            .map(|s| s.name.as_str())
            .collect()
    }

    /// Build the correction-loop schedule for this graph.
    pub fn schedule(&self) -> GraphResult<Schedule> {
        schedule::build(self)
    }
}
