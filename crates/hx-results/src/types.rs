//! Result data types.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

pub type RunId = String;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RunManifest {
    pub run_id: RunId,
    pub case_name: String,
    pub timestamp: String,
    pub solver_version: String,
    pub summary: RunOutcome,
}

/// What the time loop reported when it stopped.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct RunOutcome {
    pub steps: usize,
    pub end_time_s: f64,
    pub last_delta_t_s: f64,
    pub writes: usize,
    pub elapsed_s: f64,
}

impl From<&hx_sim::RunSummary> for RunOutcome {
    fn from(summary: &hx_sim::RunSummary) -> Self {
        Self {
            steps: summary.steps,
            end_time_s: summary.end_time,
            last_delta_t_s: summary.last_delta_t,
            writes: summary.writes,
            elapsed_s: summary.elapsed_s,
        }
    }
}

/// Cell-averaged state at one write time.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TimeseriesRecord {
    pub time_s: f64,
    pub step: usize,
    pub delta_t_s: f64,
    pub t_k: f64,
    pub p_pa: f64,
    pub rho_kg_m3: f64,
    pub qdot_w_m3: Option<f64>,
    pub mass_fractions: BTreeMap<String, f64>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub diagnostics: BTreeMap<String, f64>,
}
