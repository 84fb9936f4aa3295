//! hx-results: run cache and time-series storage.

pub mod hash;
pub mod recorder;
pub mod service;
pub mod store;
pub mod types;

pub use hash::compute_run_id;
pub use recorder::Recorder;
pub use service::{RunOptions, RunResponse, ensure_run, load_run};
pub use store::RunStore;
pub use types::*;

pub type ResultsResult<T> = Result<T, ResultsError>;

#[derive(thiserror::Error, Debug)]
pub enum ResultsError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Run not found: {run_id}")]
    RunNotFound { run_id: String },

    #[error("Case error: {0}")]
    Case(#[from] hx_case::CaseError),

    #[error("Simulation error: {0}")]
    Sim(#[from] hx_sim::SimError),

    #[error("Invalid path: {message}")]
    InvalidPath { message: String },
}
