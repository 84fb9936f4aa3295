//! Run execution and caching service.

use std::path::Path;

use hx_case::{Case, ControlWatcher};
use hx_sim::ControlSource;

use crate::recorder::Recorder;
use crate::store::RunStore;
use crate::types::{RunManifest, RunOutcome, TimeseriesRecord};
use crate::{ResultsResult, compute_run_id};

/// Options for running a case.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub use_cache: bool,
    pub solver_version: String,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            use_cache: true,
            solver_version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RunResponse {
    pub run_id: String,
    pub manifest: RunManifest,
    pub loaded_from_cache: bool,
}

/// Run `case` unless an identical run is already stored.
///
/// `case_path` is only read again while running, for the run-time
/// modifiable control entries, when the case asks for it.
pub fn ensure_run(
    case: &Case,
    case_path: Option<&Path>,
    store: &RunStore,
    options: &RunOptions,
) -> ResultsResult<RunResponse> {
    let run_id = compute_run_id(case, &options.solver_version);

    if options.use_cache && store.has_run(&run_id) {
        tracing::info!(%run_id, "loaded from cache");
        let manifest = store.load_manifest(&run_id)?;
        return Ok(RunResponse {
            run_id,
            manifest,
            loaded_from_cache: true,
        });
    }

    let mixture = case.mixture()?;
    let species = mixture.species().iter().map(|s| s.name.clone()).collect();
    let mut time_loop = case.build_time_loop()?;
    let mut recorder = Recorder::new(species);

    let mut watcher = match case_path {
        Some(path) if case.control.run_time_modifiable => {
            Some(ControlWatcher::new(path.to_path_buf(), case.time_control()))
        }
        _ => None,
    };
    let control = watcher.as_mut().map(|w| w as &mut dyn ControlSource);

    let summary = time_loop.run(&mut recorder, control)?;

    let manifest = RunManifest {
        run_id: run_id.clone(),
        case_name: case.name.clone(),
        timestamp: chrono::Utc::now().to_rfc3339(),
        solver_version: options.solver_version.clone(),
        summary: RunOutcome::from(&summary),
    };
    store.save_run(&manifest, recorder.records())?;

    Ok(RunResponse {
        run_id,
        manifest,
        loaded_from_cache: false,
    })
}

pub fn load_run(store: &RunStore, run_id: &str) -> ResultsResult<(RunManifest, Vec<TimeseriesRecord>)> {
    let manifest = store.load_manifest(run_id)?;
    let records = store.load_timeseries(run_id)?;
    Ok((manifest, records))
}
