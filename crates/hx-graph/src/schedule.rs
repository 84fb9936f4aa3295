//! Correction-loop schedule.
//!
//! The outer corrector body is the linear order restricted to its members,
//! with every inner loop collapsed into a block at the position of its
//! first member. Inner loops nest when one's members are a subset of
//! another's.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use crate::builder::SolveGraph;
use crate::error::{GraphError, GraphResult};
use crate::step::{INITIALISATION_LOOP, OUTER_CORRECTOR};

/// One entry of a loop body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScheduleNode {
    /// Run one solve step.
    Step(String),
    /// Run the body repeatedly under the named loop's control.
    Loop { name: String, body: Vec<ScheduleNode> },
}

/// Execution plan for one region.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Schedule {
    /// Steps run once before the first time step.
    pub initialisation: Vec<String>,
    /// Body of the outer corrector.
    pub outer: Vec<ScheduleNode>,
}

impl Schedule {
    /// Outer-corrector steps, each once, in execution order.
    pub fn outer_steps(&self) -> Vec<&str> {
        let mut out = Vec::new();
        flatten(&self.outer, &mut out);
        out
    }

    /// Names of every inner loop, outermost first.
    pub fn inner_loops(&self) -> Vec<&str> {
        let mut out = Vec::new();
        collect_loops(&self.outer, &mut out);
        out
    }
}

fn flatten<'a>(nodes: &'a [ScheduleNode], out: &mut Vec<&'a str>) {
    for node in nodes {
        match node {
            ScheduleNode::Step(name) => out.push(name),
            ScheduleNode::Loop { body, .. } => flatten(body, out),
        }
    }
}

fn collect_loops<'a>(nodes: &'a [ScheduleNode], out: &mut Vec<&'a str>) {
    for node in nodes {
        if let ScheduleNode::Loop { name, body } = node {
            out.push(name);
            collect_loops(body, out);
        }
    }
}

struct InnerLoop<'a> {
    name: &'a str,
    members: BTreeSet<usize>,
}

pub(crate) fn build(graph: &SolveGraph) -> GraphResult<Schedule> {
    let steps = &graph.steps;

    let initialisation = graph
        .loop_members(INITIALISATION_LOOP)
        .into_iter()
        .map(str::to_string)
        .collect();

    let outer_order: Vec<usize> = graph
        .order
        .iter()
        .copied()
        .filter(|&i| steps[i].in_outer_corrector())
        .collect();
    let outer_set: BTreeSet<usize> = outer_order.iter().copied().collect();

    let mut by_name: BTreeMap<&str, BTreeSet<usize>> = BTreeMap::new();
    for (i, step) in steps.iter().enumerate() {
        for l in &step.loops {
            if l != OUTER_CORRECTOR && l != INITIALISATION_LOOP {
                by_name.entry(l.as_str()).or_default().insert(i);
            }
        }
    }

    for (name, members) in &by_name {
        if let Some(&m) = members.iter().find(|m| !outer_set.contains(m)) {
            return Err(GraphError::LoopNotNested {
                loop_name: name.to_string(),
                step: steps[m].name.clone(),
            });
        }
    }

    // largest first so a parent always precedes its children
    let mut loops: Vec<InnerLoop<'_>> = by_name
        .into_iter()
        .map(|(name, members)| InnerLoop { name, members })
        .collect();
    loops.sort_by(|a, b| {
        b.members
            .len()
            .cmp(&a.members.len())
            .then_with(|| a.name.cmp(b.name))
    });

    let mut children: HashMap<Option<usize>, Vec<usize>> = HashMap::new();
    for j in 0..loops.len() {
        let mut parent = None;
        for i in 0..j {
            let (a, b) = (&loops[i].members, &loops[j].members);
            if b.is_subset(a) {
                parent = Some(i);
            } else if !a.is_disjoint(b) {
                return Err(GraphError::OverlappingLoops {
                    first: loops[i].name.to_string(),
                    second: loops[j].name.to_string(),
                });
            }
        }
        children.entry(parent).or_default().push(j);
    }

    let outer = build_body(graph, &outer_order, None, &loops, &children);
    let schedule = Schedule {
        initialisation,
        outer,
    };
    check_required_order(graph, &schedule, &loops)?;
    Ok(schedule)
}

fn build_body(
    graph: &SolveGraph,
    members: &[usize],
    parent: Option<usize>,
    loops: &[InnerLoop<'_>],
    children: &HashMap<Option<usize>, Vec<usize>>,
) -> Vec<ScheduleNode> {
    let kids: &[usize] = children.get(&parent).map(Vec::as_slice).unwrap_or(&[]);
    let mut emitted = HashSet::new();
    let mut body = Vec::new();

    for &s in members {
        match kids.iter().find(|&&k| loops[k].members.contains(&s)) {
            Some(&k) => {
                if emitted.insert(k) {
                    let sub: Vec<usize> = members
                        .iter()
                        .copied()
                        .filter(|m| loops[k].members.contains(m))
                        .collect();
                    body.push(ScheduleNode::Loop {
                        name: loops[k].name.to_string(),
                        body: build_body(graph, &sub, Some(k), loops, children),
                    });
                }
            }
            None => body.push(ScheduleNode::Step(graph.steps[s].name.clone())),
        }
    }
    body
}

fn check_required_order(
    graph: &SolveGraph,
    schedule: &Schedule,
    loops: &[InnerLoop<'_>],
) -> GraphResult<()> {
    let flat = schedule.outer_steps();
    let position: HashMap<&str, usize> = flat.iter().enumerate().map(|(p, n)| (*n, p)).collect();

    for (p, name) in flat.iter().enumerate() {
        let Some(step) = graph.step(name) else {
            continue;
        };
        for dep in &step.required {
            let Some(&dp) = position.get(dep.as_str()) else {
                continue;
            };
            if dp > p {
                let (si, di) = (graph.index[*name], graph.index[dep.as_str()]);
                let loop_name = loops
                    .iter()
                    .find(|l| l.members.contains(&si) != l.members.contains(&di))
                    .map_or(OUTER_CORRECTOR, |l| l.name);
                return Err(GraphError::NonContiguousLoop {
                    loop_name: loop_name.to_string(),
                    step: name.to_string(),
                    dependency: dep.clone(),
                });
            }
        }
    }
    Ok(())
}
