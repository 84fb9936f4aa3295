//! End-to-end runs of the time loop.

use std::sync::{Arc, Mutex};

use hx_chemistry::{ArrheniusRate, ChemistrySettings, Mechanism, Mixture, Reaction, SpecieCoeff, SpecieThermo};
use hx_core::constants::RR;
use hx_graph::{GraphError, SolveContribution};
use hx_sim::{
    ControlSource, CorrectorSettings, FieldRegistry, SimError, SimResult, SolveContext, SolveOutcome, SolverObject,
    SolverObjectArgs, StabilityLimit, StepLimiter, TimeControl, TimeLoop, TimeLoopSettings, WriteControl, WriteEvent,
    create_objects, initial_fields, solver_objects,
};

const HEAT_OF_REACTION: f64 = 1.0e6;

/// `A -> B` at 2 1/s releasing 1 MJ/kg; both species at W = 28, cp = 1000.
fn decay_mechanism() -> Mechanism {
    let mixture = Mixture::new(vec![
        SpecieThermo::new("A", 28.0, 1000.0, 0.0).unwrap(),
        SpecieThermo::new("B", 28.0, 1000.0, -HEAT_OF_REACTION).unwrap(),
    ])
    .unwrap();
    let reaction = Reaction::irreversible(
        "A = B",
        vec![SpecieCoeff::new(0, 1.0)],
        vec![SpecieCoeff::new(1, 1.0)],
        ArrheniusRate::constant(2.0),
    )
    .unwrap();
    Mechanism::new(mixture, vec![reaction]).unwrap()
}

fn reactor(constant_volume: bool, settings: TimeLoopSettings) -> TimeLoop {
    reactor_with(constant_volume, settings, ChemistrySettings::default())
}

fn reactor_with(constant_volume: bool, settings: TimeLoopSettings, chemistry: ChemistrySettings) -> TimeLoop {
    let mechanism = decay_mechanism();
    let fields = initial_fields(mechanism.mixture(), 1, 1000.0, 1.0e5, &[1.0, 0.0]).unwrap();
    let args = SolverObjectArgs {
        mechanism,
        chemistry_solver: "ode".into(),
        chemistry_solver_settings: Default::default(),
        chemistry_settings: chemistry,
        constant_volume,
    };
    let objects = create_objects(&solver_objects().unwrap(), &hx_sim::DEFAULT_SOLVER_OBJECTS, &args).unwrap();
    TimeLoop::new(objects, fields, settings).unwrap()
}

fn fixed_step(delta_t: f64, end_time: f64) -> TimeLoopSettings {
    TimeLoopSettings {
        end_time,
        control: TimeControl {
            delta_t,
            ..TimeControl::default()
        },
        ..TimeLoopSettings::default()
    }
}

fn discard(_: &WriteEvent<'_>) -> SimResult<()> {
    Ok(())
}

#[test]
fn constant_pressure_reactor_matches_analytic_decay() {
    let mut time_loop = reactor(false, fixed_step(0.01, 0.5));
    let summary = time_loop.run(&mut discard, None).unwrap();
    assert_eq!(summary.steps, 50);
    assert!(summary.elapsed_s >= 0.0);

    let fields = time_loop.fields();
    let y_a = fields.field("A").unwrap()[0];
    let y_b = fields.field("B").unwrap()[0];
    assert!((y_a - (-1.0f64).exp()).abs() < 1e-3, "Y_A = {y_a}");
    assert!((y_a + y_b - 1.0).abs() < 1e-9);

    // adiabatic at constant cp: every kg of B raises T by hf / cp
    let t = fields.field("T").unwrap()[0];
    assert!((t - (1000.0 + 1000.0 * y_b)).abs() < 1e-6, "T = {t}");
    assert_eq!(fields.field("p").unwrap()[0], 1.0e5);
    let rho = fields.field("rho").unwrap()[0];
    assert!((rho - 1.0e5 * 28.0 / (RR * t)).abs() < 1e-9 * rho);
}

#[test]
fn constant_volume_reactor_heats_at_cv() {
    let settings = TimeLoopSettings {
        outer: CorrectorSettings {
            max_iterations: 60,
            residual_tolerance: Some(1e-10),
            convergence_required: true,
        },
        ..fixed_step(0.05, 0.2)
    };
    let mut time_loop = reactor(true, settings);
    let rho0 = time_loop.fields().field("rho").unwrap()[0];
    time_loop.run(&mut discard, None).unwrap();

    let fields = time_loop.fields();
    let y_b = fields.field("B").unwrap()[0];
    let t = fields.field("T").unwrap()[0];
    let cv = 1000.0 - RR / 28.0;
    assert!(((t - 1000.0) * cv - y_b * HEAT_OF_REACTION).abs() < 1e-3 * HEAT_OF_REACTION * y_b);
    assert_eq!(fields.field("rho").unwrap()[0], rho0);
    let p = fields.field("p").unwrap()[0];
    assert!((p - rho0 * RR / 28.0 * t).abs() < 1e-9 * p);
}

#[test]
fn run_time_writes_land_on_intervals_and_final_time() {
    let settings = TimeLoopSettings {
        write: WriteControl::RunTime { interval: 0.1 },
        ..fixed_step(0.01, 0.45)
    };
    let mut time_loop = reactor(false, settings);
    let mut times = Vec::new();
    let mut sink = |e: &WriteEvent<'_>| -> SimResult<()> {
        times.push(e.time);
        Ok(())
    };
    let summary = time_loop.run(&mut sink, None).unwrap();

    assert_eq!(summary.writes, 5);
    let expected = [0.1, 0.2, 0.3, 0.4, 0.45];
    assert_eq!(times.len(), expected.len());
    for (t, e) in times.iter().zip(expected) {
        assert!((t - e).abs() < 1e-9, "wrote at {t}, expected {e}");
    }
}

#[test]
fn time_step_writes_include_final_state_once() {
    let settings = TimeLoopSettings {
        write: WriteControl::TimeStep { interval: 7 },
        ..fixed_step(0.01, 0.1)
    };
    let mut time_loop = reactor(false, settings);
    let mut steps = Vec::new();
    let mut sink = |e: &WriteEvent<'_>| -> SimResult<()> {
        steps.push(e.step_index);
        assert!(e.fields.has_field("Qdot"));
        Ok(())
    };
    time_loop.run(&mut sink, None).unwrap();
    assert_eq!(steps, vec![7, 10]);
}

#[test]
fn adaptive_steps_grow_under_growth_limit_and_ceiling() {
    let settings = TimeLoopSettings {
        end_time: 0.1,
        control: TimeControl {
            adjust_time_step: true,
            delta_t: 1.0e-4,
            max_delta_t: 0.002,
            ..TimeControl::default()
        },
        ..TimeLoopSettings::default()
    };
    let mut time_loop = reactor(false, settings);
    let mut previous = 1.0e-4;
    let mut limiters = Vec::new();
    while time_loop.state().running(0.1) {
        let decision = time_loop.step().unwrap();
        assert!(decision.delta_t <= 1.2 * previous * (1.0 + 1e-12));
        assert!(decision.delta_t <= 0.002);
        previous = decision.delta_t;
        limiters.push(decision.limiter);
    }
    assert_eq!(limiters[0], StepLimiter::Initial);
    assert_eq!(limiters[1], StepLimiter::Growth);
    assert_eq!(limiters.last(), Some(&StepLimiter::Ceiling));
    let y_a = time_loop.fields().field("A").unwrap()[0];
    assert!((y_a - (-2.0 * time_loop.state().time).exp()).abs() < 1e-3);
}

#[test]
fn first_adaptive_step_honours_initial_chemical_time_step() {
    let settings = TimeLoopSettings {
        end_time: 0.1,
        control: TimeControl {
            adjust_time_step: true,
            delta_t: 1.0e-3,
            ..TimeControl::default()
        },
        ..TimeLoopSettings::default()
    };
    let chemistry = ChemistrySettings {
        initial_chemical_time_step: Some(1.0e-5),
        ..ChemistrySettings::default()
    };
    let mut time_loop = reactor_with(false, settings.clone(), chemistry);
    let first = time_loop.step().unwrap();
    assert_eq!(first.delta_t, 1.0e-5);
    assert_eq!(first.limiter, StepLimiter::Source("chemistry".into()));

    // without an initial chemical step the first step is the configured one
    let mut time_loop = reactor(false, settings);
    let first = time_loop.step().unwrap();
    assert_eq!(first.delta_t, 1.0e-3);
    assert_eq!(first.limiter, StepLimiter::Initial);
}

/// Object asking for an ever smaller step.
#[derive(Debug)]
struct Unstable {
    max_step: f64,
}

impl SolverObject for Unstable {
    fn name(&self) -> &str {
        "unstable"
    }

    fn solve_graph(&self) -> SolveContribution {
        SolveContribution::new().solves(["blowUp"])
    }

    fn max_time_step(&self, _fields: &FieldRegistry) -> Option<StabilityLimit> {
        Some(StabilityLimit::step_limit("unstable", self.max_step))
    }

    fn correct(&mut self, _solve: &str, _ctx: &mut SolveContext<'_>) -> SimResult<SolveOutcome> {
        self.max_step *= 1.0e-3;
        Ok(SolveOutcome::default())
    }
}

#[test]
fn step_below_floor_stops_the_run() {
    let settings = TimeLoopSettings {
        control: TimeControl {
            adjust_time_step: true,
            delta_t: 1.0e-3,
            min_delta_t: 1.0e-7,
            ..TimeControl::default()
        },
        ..TimeLoopSettings::default()
    };
    let objects: Vec<Box<dyn SolverObject>> = vec![Box::new(Unstable { max_step: 1.0e-3 })];
    let mut time_loop = TimeLoop::new(objects, FieldRegistry::new(1), settings).unwrap();

    let err = time_loop.run(&mut discard, None).unwrap_err();
    match err {
        SimError::StepBelowMinimum { computed, min_delta_t } => {
            assert_eq!(min_delta_t, 1.0e-7);
            assert!(computed < min_delta_t);
        }
        other => panic!("unexpected error {other}"),
    }
    // 1e-3 and 1e-6 are taken, 1e-9 is not
    assert_eq!(time_loop.state().step_index, 2);
}

/// Switches to a larger fixed step after a few refreshes.
struct SwitchAfter {
    calls: usize,
    after: usize,
    control: TimeControl,
}

impl ControlSource for SwitchAfter {
    fn refresh(&mut self) -> Option<TimeControl> {
        self.calls += 1;
        (self.calls == self.after).then_some(self.control)
    }
}

#[test]
fn refreshed_controls_apply_from_the_next_step() {
    let mut time_loop = reactor(false, fixed_step(0.01, 0.1));
    let mut source = SwitchAfter {
        calls: 0,
        after: 4,
        control: TimeControl {
            delta_t: 0.025,
            ..TimeControl::default()
        },
    };
    let mut steps = Vec::new();
    let mut sink = |e: &WriteEvent<'_>| -> SimResult<()> {
        steps.push(e.delta_t);
        Ok(())
    };
    let summary = time_loop.run(&mut sink, Some(&mut source)).unwrap();

    assert_eq!(steps[..3], [0.01, 0.01, 0.01]);
    assert_eq!(steps[3..], [0.025, 0.025, 0.025]);
    assert_eq!(summary.steps, 6);
    assert!((summary.end_time - 0.105).abs() < 1e-9);
}

/// Records every solve with the loop flags it saw.
#[derive(Debug)]
struct Flow {
    log: Arc<Mutex<Vec<(String, usize, bool)>>>,
}

impl SolverObject for Flow {
    fn name(&self) -> &str {
        "flow"
    }

    fn solve_graph(&self) -> SolveContribution {
        SolveContribution::new()
            .solves(["U", "p"])
            .requires("p", ["U"])
            .member_of("PISOCorrector", ["p"])
    }

    fn correct(&mut self, solve: &str, ctx: &mut SolveContext<'_>) -> SimResult<SolveOutcome> {
        if let Ok(mut log) = self.log.lock() {
            log.push((solve.to_string(), ctx.outer_iteration, ctx.final_iteration));
        }
        Ok(SolveOutcome::default())
    }
}

#[test]
fn inner_loops_run_their_own_iteration_budget() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let settings = TimeLoopSettings {
        outer: CorrectorSettings::iterations(2),
        inner: [("PISOCorrector".to_string(), CorrectorSettings::iterations(3))].into(),
        ..fixed_step(1.0, 1.0)
    };
    let objects: Vec<Box<dyn SolverObject>> = vec![Box::new(Flow { log: Arc::clone(&log) })];
    let mut time_loop = TimeLoop::new(objects, FieldRegistry::new(1), settings).unwrap();
    time_loop.step().unwrap();

    let log = log.lock().unwrap();
    let sequence: Vec<(&str, usize, bool)> = log.iter().map(|(s, i, f)| (s.as_str(), *i, *f)).collect();
    assert_eq!(
        sequence,
        vec![
            ("U", 1, false),
            ("p", 1, false),
            ("p", 1, false),
            ("p", 1, true),
            ("U", 2, true),
            ("p", 2, false),
            ("p", 2, false),
            ("p", 2, true),
        ]
    );
}

/// Declares a single step with one required dependency.
#[derive(Debug)]
struct Chain {
    name: &'static str,
    step: &'static str,
    after: &'static str,
}

impl SolverObject for Chain {
    fn name(&self) -> &str {
        self.name
    }

    fn solve_graph(&self) -> SolveContribution {
        SolveContribution::new()
            .solves([self.step])
            .requires(self.step, [self.after])
    }

    fn correct(&mut self, _solve: &str, _ctx: &mut SolveContext<'_>) -> SimResult<SolveOutcome> {
        Ok(SolveOutcome::default())
    }
}

#[test]
fn cyclic_declarations_are_rejected_before_running() {
    let objects: Vec<Box<dyn SolverObject>> = vec![
        Box::new(Chain {
            name: "momentum",
            step: "U",
            after: "p",
        }),
        Box::new(Chain {
            name: "pressure",
            step: "p",
            after: "U",
        }),
    ];
    let err = TimeLoop::new(objects, FieldRegistry::new(1), TimeLoopSettings::default()).unwrap_err();
    assert!(
        matches!(err, SimError::Graph(GraphError::Cycle { ref steps }) if steps == &["U", "p"]),
        "{err}"
    );
}
