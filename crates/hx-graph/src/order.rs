//! Linearisation of solve steps.
//!
//! Kahn's algorithm over required edges, with ties broken by declaration
//! order so identical input always gives the identical order. Optional
//! edges are added afterwards, each one only if it does not close a cycle.

use std::cmp::Reverse;
use std::collections::{BTreeSet, BinaryHeap, HashMap};

use crate::error::{GraphError, GraphResult};
use crate::step::SolveStep;

/// Successor lists: `succ[a]` holds every step that must run after `a`.
type Successors = Vec<BTreeSet<usize>>;

/// Compute the execution order as indices into `steps`.
pub(crate) fn linearize(steps: &[SolveStep]) -> GraphResult<Vec<usize>> {
    let index: HashMap<&str, usize> = steps
        .iter()
        .enumerate()
        .map(|(i, s)| (s.name.as_str(), i))
        .collect();

    let mut succ: Successors = vec![BTreeSet::new(); steps.len()];
    for (i, step) in steps.iter().enumerate() {
        for dep in &step.required {
            let j = *index.get(dep.as_str()).ok_or_else(|| GraphError::MissingDependency {
                step: step.name.clone(),
                dependency: dep.clone(),
            })?;
            succ[j].insert(i);
        }
    }

    let on_cycle = cycle_members(&succ);
    if !on_cycle.is_empty() {
        return Err(GraphError::Cycle {
            steps: on_cycle.into_iter().map(|i| steps[i].name.clone()).collect(),
        });
    }

    for (i, step) in steps.iter().enumerate() {
        for dep in &step.optional {
            let Some(&j) = index.get(dep.as_str()) else {
                continue;
            };
            if i == j || succ[j].contains(&i) {
                continue;
            }
            if reachable(&succ, i, j) {
                tracing::debug!(
                    step = %step.name,
                    dependency = %dep,
                    "dropping optional dependency that would form a cycle"
                );
                continue;
            }
            succ[j].insert(i);
        }
    }

    let order = kahn(&succ);
    debug_assert_eq!(order.len(), steps.len());
    Ok(order)
}

/// Topological order, smallest declaration index first among ready steps.
///
/// Returns fewer indices than there are steps if the graph has a cycle.
fn kahn(succ: &Successors) -> Vec<usize> {
    let mut in_degree = vec![0_usize; succ.len()];
    for targets in succ {
        for &t in targets {
            in_degree[t] += 1;
        }
    }

    let mut ready: BinaryHeap<Reverse<usize>> = in_degree
        .iter()
        .enumerate()
        .filter(|(_, d)| **d == 0)
        .map(|(i, _)| Reverse(i))
        .collect();

    let mut order = Vec::with_capacity(succ.len());
    while let Some(Reverse(i)) = ready.pop() {
        order.push(i);
        for &t in &succ[i] {
            in_degree[t] -= 1;
            if in_degree[t] == 0 {
                ready.push(Reverse(t));
            }
        }
    }
    order
}

/// Steps that lie on (or between) cycles, in declaration order.
///
/// Kahn's algorithm leaves cycle members and everything downstream of
/// them; trimming steps with no remaining successors removes the
/// downstream tail.
fn cycle_members(succ: &Successors) -> BTreeSet<usize> {
    let processed: BTreeSet<usize> = kahn(succ).into_iter().collect();
    let mut remaining: BTreeSet<usize> = (0..succ.len()).filter(|i| !processed.contains(i)).collect();

    loop {
        let sinks: Vec<usize> = remaining
            .iter()
            .copied()
            .filter(|&i| succ[i].iter().all(|t| !remaining.contains(t)))
            .collect();
        if sinks.is_empty() {
            return remaining;
        }
        for s in sinks {
            remaining.remove(&s);
        }
    }
}

/// Is `to` reachable from `from` along successor edges?
fn reachable(succ: &Successors, from: usize, to: usize) -> bool {
    let mut seen = vec![false; succ.len()];
    let mut stack = vec![from];
    while let Some(i) = stack.pop() {
        if i == to {
            return true;
        }
        if std::mem::replace(&mut seen[i], true) {
            continue;
        }
        stack.extend(succ[i].iter().copied());
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    fn step(name: &str, required: &[&str], optional: &[&str]) -> SolveStep {
        let mut s = SolveStep::new(name, "test");
        s.required = required.iter().map(|d| d.to_string()).collect();
        s.optional = optional.iter().map(|d| d.to_string()).collect();
        s
    }

    fn names(steps: &[SolveStep], order: &[usize]) -> Vec<String> {
        order.iter().map(|&i| steps[i].name.clone()).collect()
    }

    #[test]
    fn independent_steps_keep_declaration_order() {
        let steps = vec![step("b", &[], &[]), step("a", &[], &[]), step("c", &[], &[])];
        let order = linearize(&steps).unwrap();
        assert_eq!(names(&steps, &order), vec!["b", "a", "c"]);
    }

    #[test]
    fn self_dependency_is_a_cycle() {
        let steps = vec![step("a", &["a"], &[])];
        assert_eq!(
            linearize(&steps).unwrap_err(),
            GraphError::Cycle {
                steps: vec!["a".into()]
            }
        );
    }

    #[test]
    fn cycle_report_excludes_downstream_steps() {
        // x <-> y cycle, z depends on y, w is independent
        let steps = vec![
            step("w", &[], &[]),
            step("x", &["y"], &[]),
            step("y", &["x"], &[]),
            step("z", &["y"], &[]),
        ];
        assert_eq!(
            linearize(&steps).unwrap_err(),
            GraphError::Cycle {
                steps: vec!["x".into(), "y".into()]
            }
        );
    }

    #[test]
    fn optional_edge_that_closes_cycle_is_dropped() {
        // b requires a; a optionally after b would close a cycle
        let steps = vec![step("a", &[], &["b"]), step("b", &["a"], &[])];
        let order = linearize(&steps).unwrap();
        assert_eq!(names(&steps, &order), vec!["a", "b"]);
    }

    #[test]
    fn optional_edge_reorders_when_present() {
        let steps = vec![step("energy", &[], &["mesh"]), step("mesh", &[], &[])];
        let order = linearize(&steps).unwrap();
        assert_eq!(names(&steps, &order), vec!["mesh", "energy"]);
    }

    #[test]
    fn optional_edge_to_absent_step_is_ignored() {
        let steps = vec![step("energy", &[], &["radiation"])];
        let order = linearize(&steps).unwrap();
        assert_eq!(names(&steps, &order), vec!["energy"]);
    }

    #[test]
    fn missing_required_dependency_is_reported() {
        let steps = vec![step("p", &["UPredictor"], &[])];
        assert!(matches!(
            linearize(&steps),
            Err(GraphError::MissingDependency { .. })
        ));
    }
}
