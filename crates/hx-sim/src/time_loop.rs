//! The time loop: step selection, correction loops and output.

use std::collections::{BTreeMap, HashMap};

use hx_core::{Real, RunClock};
use hx_graph::{INITIALISATION_LOOP, OUTER_CORRECTOR, Schedule, ScheduleNode, SolveGraph, SolveGraphBuilder};

use crate::correction::{CorrectionLoop, CorrectorSettings};
use crate::error::{SimError, SimResult};
use crate::fields::FieldRegistry;
use crate::solver_object::{SolveContext, SolverObject};
use crate::time_step::{AdaptiveTimeStep, StabilityLimit, StepDecision, TimeControl, TimeStepState};
use crate::write::{WriteControl, WriteEvent, WriteSink};

/// Run-level settings of the time loop.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeLoopSettings {
    pub start_time: Real,
    pub end_time: Real,
    pub control: TimeControl,
    pub write: WriteControl,
    pub outer: CorrectorSettings,
    /// Settings of named inner loops; unlisted loops run one pass.
    pub inner: BTreeMap<String, CorrectorSettings>,
}

impl Default for TimeLoopSettings {
    fn default() -> Self {
        Self {
            start_time: 0.0,
            end_time: 1.0,
            control: TimeControl::default(),
            write: WriteControl::default(),
            outer: CorrectorSettings::default(),
            inner: BTreeMap::new(),
        }
    }
}

impl TimeLoopSettings {
    pub fn validate(&self) -> SimResult<()> {
        if !(self.start_time.is_finite() && self.end_time.is_finite() && self.end_time > self.start_time) {
            return Err(SimError::InvalidArg {
                what: format!(
                    "endTime ({}) must be finite and after startTime ({})",
                    self.end_time, self.start_time
                ),
            });
        }
        self.control.validate()?;
        self.write.validate()?;
        self.outer.validate(OUTER_CORRECTOR)?;
        for (name, settings) in &self.inner {
            settings.validate(name)?;
        }
        Ok(())
    }
}

/// Source of updated time controls between steps, e.g. a watched case file.
pub trait ControlSource {
    /// New controls if they changed since the last call.
    fn refresh(&mut self) -> Option<TimeControl>;
}

/// Totals of a completed run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunSummary {
    pub steps: usize,
    pub end_time: Real,
    pub last_delta_t: Real,
    pub writes: usize,
    pub elapsed_s: f64,
}

#[derive(Debug)]
pub struct TimeLoop {
    objects: Vec<Box<dyn SolverObject>>,
    /// Solve step name to index into `objects`.
    owners: HashMap<String, usize>,
    graph: SolveGraph,
    schedule: Schedule,
    fields: FieldRegistry,
    settings: TimeLoopSettings,
    controller: AdaptiveTimeStep,
    state: TimeStepState,
    diagnostics: Vec<(String, Real)>,
    initialised: bool,
}

impl TimeLoop {
    /// Build the solve graph of `objects` and prepare to run from `start_time`.
    pub fn new(
        objects: Vec<Box<dyn SolverObject>>,
        fields: FieldRegistry,
        settings: TimeLoopSettings,
    ) -> SimResult<Self> {
        settings.validate()?;

        let mut builder = SolveGraphBuilder::new();
        let mut object_index = HashMap::new();
        for (i, object) in objects.iter().enumerate() {
            if object_index.insert(object.name().to_string(), i).is_some() {
                return Err(SimError::InvalidArg {
                    what: format!("solver object '{}' listed twice", object.name()),
                });
            }
            builder.add_contribution(object.name(), object.solve_graph())?;
        }
        let graph = builder.build()?;
        let schedule = graph.schedule()?;

        let mut owners = HashMap::new();
        for step in graph.steps() {
            let i = object_index
                .get(&step.owner)
                .copied()
                .ok_or_else(|| SimError::UnownedStep {
                    step: step.name.clone(),
                })?;
            owners.insert(step.name.clone(), i);
        }
        tracing::info!(order = ?graph.order(), "solve order");

        let controller = AdaptiveTimeStep::new(settings.control)?;
        let state = TimeStepState::new(settings.start_time, &settings.control);
        Ok(Self {
            objects,
            owners,
            graph,
            schedule,
            fields,
            settings,
            controller,
            state,
            diagnostics: Vec::new(),
            initialised: false,
        })
    }

    pub fn graph(&self) -> &SolveGraph {
        &self.graph
    }

    pub fn schedule(&self) -> &Schedule {
        &self.schedule
    }

    pub fn fields(&self) -> &FieldRegistry {
        &self.fields
    }

    pub fn state(&self) -> &TimeStepState {
        &self.state
    }

    pub fn controller(&self) -> &AdaptiveTimeStep {
        &self.controller
    }

    pub fn settings(&self) -> &TimeLoopSettings {
        &self.settings
    }

    /// Diagnostics of the last completed step.
    pub fn diagnostics(&self) -> &[(String, Real)] {
        &self.diagnostics
    }

    pub fn objects(&self) -> impl Iterator<Item = &dyn SolverObject> {
        self.objects.iter().map(|o| o.as_ref())
    }

    /// Swap the time controls between steps.
    ///
    /// Invalid controls are rejected and the current ones kept.
    pub fn set_control(&mut self, control: TimeControl) -> SimResult<()> {
        self.controller.set_control(control)?;
        self.settings.control = control;
        self.state.apply_control(&control);
        Ok(())
    }

    /// Initialise every object and run the initialisation loop once.
    pub fn initialise(&mut self) -> SimResult<()> {
        if self.initialised {
            return Ok(());
        }
        for object in &mut self.objects {
            object.initialise(&mut self.fields)?;
        }
        let steps: Vec<ScheduleNode> = self
            .schedule
            .initialisation
            .iter()
            .cloned()
            .map(ScheduleNode::Step)
            .collect();
        let mut stack = vec![CorrectionLoop::new(INITIALISATION_LOOP, CorrectorSettings::iterations(1))];
        while stack[0].next_iteration() {
            self.run_nodes(&steps, &mut stack)?;
        }
        stack[0].finish()?;
        self.initialised = true;
        tracing::debug!(steps = ?self.schedule.initialisation, "initialisation loop complete");
        Ok(())
    }

    /// Select the next time step, advance time and solve every step.
    pub fn step(&mut self) -> SimResult<StepDecision> {
        self.initialise()?;
        let limits: Vec<StabilityLimit> = self
            .objects
            .iter()
            .filter_map(|o| o.max_time_step(&self.fields))
            .collect();
        let decision = if self.state.step_index == 0 {
            self.controller.select_initial(&limits)?
        } else {
            self.controller.select(self.state.delta_t, &limits)?
        };
        self.state.advance(decision.delta_t);
        tracing::info!(
            time = self.state.time,
            delta_t = decision.delta_t,
            limiter = ?decision.limiter,
            "time step {}",
            self.state.step_index
        );

        let outer = self.schedule.outer.clone();
        let mut stack = vec![CorrectionLoop::new(OUTER_CORRECTOR, self.settings.outer.clone())];
        while stack[0].next_iteration() {
            self.run_nodes(&outer, &mut stack)?;
        }
        stack[0].finish()?;

        self.diagnostics = self
            .objects
            .iter()
            .flat_map(|o| o.diagnostics(&self.fields))
            .collect();
        if !self.diagnostics.is_empty() {
            let line = self
                .diagnostics
                .iter()
                .map(|(name, value)| format!("{name} = {value:e}"))
                .collect::<Vec<_>>()
                .join(", ");
            tracing::info!(time = self.state.time, "{line}");
        }
        Ok(decision)
    }

    /// Step until `end_time`, writing at the configured cadence.
    ///
    /// The final state is always written.
    pub fn run(
        &mut self,
        sink: &mut dyn WriteSink,
        mut control: Option<&mut dyn ControlSource>,
    ) -> SimResult<RunSummary> {
        let clock = RunClock::start();
        self.initialise()?;
        tracing::info!(
            start_time = self.settings.start_time,
            end_time = self.settings.end_time,
            "starting time loop"
        );

        let start_time = self.settings.start_time;
        let mut last_index = self.settings.write.index(&self.state, start_time);
        let mut writes = 0;
        let mut written = true;
        while self.state.running(self.settings.end_time) {
            if let Some(source) = control.as_deref_mut()
                && let Some(update) = source.refresh()
                && let Err(e) = self.set_control(update)
            {
                tracing::warn!(error = %e, "ignoring invalid time control");
            }
            self.step()?;

            let index = self.settings.write.index(&self.state, start_time);
            written = index > last_index;
            if written {
                last_index = index;
                self.write(sink)?;
                writes += 1;
            }
        }
        if !written {
            self.write(sink)?;
            writes += 1;
        }

        let summary = RunSummary {
            steps: self.state.step_index,
            end_time: self.state.time,
            last_delta_t: self.state.delta_t,
            writes,
            elapsed_s: clock.elapsed_s(),
        };
        tracing::info!(
            steps = summary.steps,
            end_time = summary.end_time,
            elapsed_s = summary.elapsed_s,
            "run complete"
        );
        Ok(summary)
    }

    fn write(&self, sink: &mut dyn WriteSink) -> SimResult<()> {
        tracing::debug!(time = self.state.time, "writing");
        sink.write(&WriteEvent {
            time: self.state.time,
            step_index: self.state.step_index,
            delta_t: self.state.delta_t,
            fields: &self.fields,
            diagnostics: &self.diagnostics,
        })
    }

    fn run_nodes(&mut self, nodes: &[ScheduleNode], stack: &mut Vec<CorrectionLoop>) -> SimResult<()> {
        for node in nodes {
            match node {
                ScheduleNode::Step(name) => self.run_step(name, stack)?,
                ScheduleNode::Loop { name, body } => {
                    let settings = self.settings.inner.get(name).cloned().unwrap_or_default();
                    stack.push(CorrectionLoop::new(name.clone(), settings));
                    while stack.last_mut().is_some_and(CorrectionLoop::next_iteration) {
                        self.run_nodes(body, stack)?;
                    }
                    if let Some(mut inner) = stack.pop() {
                        inner.finish()?;
                    }
                }
            }
        }
        Ok(())
    }

    fn run_step(&mut self, name: &str, stack: &mut [CorrectionLoop]) -> SimResult<()> {
        let index = *self.owners.get(name).ok_or_else(|| SimError::UnownedStep {
            step: name.to_string(),
        })?;
        let object = &mut self.objects[index];
        let (outer_iteration, final_iteration) = match (stack.first(), stack.last()) {
            (Some(outer), Some(innermost)) => (
                outer.iteration(),
                object.is_final_corrector(innermost.name(), innermost.is_final_iteration()),
            ),
            _ => (1, true),
        };
        let mut ctx = SolveContext {
            time: self.state.time,
            delta_t: self.state.delta_t,
            outer_iteration,
            final_iteration,
            fields: &mut self.fields,
        };
        let outcome = object.correct(name, &mut ctx)?;
        if let Some(residual) = outcome.residual {
            for corrector in stack.iter_mut() {
                corrector.report_residual(name, residual);
            }
        }
        Ok(())
    }
}
