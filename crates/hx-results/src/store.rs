//! Run storage API.
//!
//! Each run lives in `<root>/<run_id>/` as `manifest.json`, one JSON record
//! per line in `timeseries.jsonl`, and a tab-separated `post.dat` of the
//! same records for plotting.

use crate::types::{RunManifest, TimeseriesRecord};
use crate::{ResultsError, ResultsResult};
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct RunStore {
    root_dir: PathBuf,
}

impl RunStore {
    pub fn new(root_dir: PathBuf) -> ResultsResult<Self> {
        if !root_dir.exists() {
            fs::create_dir_all(&root_dir)?;
        }
        Ok(Self { root_dir })
    }

    /// Store next to a case file, under `.helyx/runs`.
    pub fn for_case(case_path: &Path) -> ResultsResult<Self> {
        let case_dir = case_path.parent().ok_or_else(|| ResultsError::InvalidPath {
            message: "case path has no parent directory".to_string(),
        })?;
        let runs_dir = case_dir.join(".helyx").join("runs");
        Self::new(runs_dir)
    }

    pub fn root_dir(&self) -> &Path {
        &self.root_dir
    }

    pub fn run_dir(&self, run_id: &str) -> PathBuf {
        self.root_dir.join(run_id)
    }

    pub fn has_run(&self, run_id: &str) -> bool {
        self.run_dir(run_id).join("manifest.json").exists()
    }

    pub fn save_run(&self, manifest: &RunManifest, records: &[TimeseriesRecord]) -> ResultsResult<()> {
        let run_dir = self.run_dir(&manifest.run_id);
        fs::create_dir_all(&run_dir)?;

        let timeseries_path = run_dir.join("timeseries.jsonl");
        let mut timeseries_content = String::new();
        for record in records {
            let line = serde_json::to_string(record)?;
            timeseries_content.push_str(&line);
            timeseries_content.push('\n');
        }
        fs::write(timeseries_path, timeseries_content)?;
        fs::write(run_dir.join("post.dat"), post_table(records))?;

        // manifest last: its presence marks the run complete
        let manifest_json = serde_json::to_string_pretty(manifest)?;
        fs::write(run_dir.join("manifest.json"), manifest_json)?;

        tracing::info!(run_id = %manifest.run_id, records = records.len(), "saved run");
        Ok(())
    }

    pub fn load_manifest(&self, run_id: &str) -> ResultsResult<RunManifest> {
        let manifest_path = self.run_dir(run_id).join("manifest.json");

        if !manifest_path.exists() {
            return Err(ResultsError::RunNotFound {
                run_id: run_id.to_string(),
            });
        }

        let content = fs::read_to_string(manifest_path)?;
        let manifest = serde_json::from_str(&content)?;
        Ok(manifest)
    }

    pub fn load_timeseries(&self, run_id: &str) -> ResultsResult<Vec<TimeseriesRecord>> {
        let timeseries_path = self.run_dir(run_id).join("timeseries.jsonl");

        if !timeseries_path.exists() {
            return Err(ResultsError::RunNotFound {
                run_id: run_id.to_string(),
            });
        }

        let content = fs::read_to_string(timeseries_path)?;
        let mut records = Vec::new();
        for line in content.lines() {
            if !line.trim().is_empty() {
                let record: TimeseriesRecord = serde_json::from_str(line)?;
                records.push(record);
            }
        }

        Ok(records)
    }

    /// Runs of one case, oldest first.
    pub fn list_runs(&self, case_name: &str) -> ResultsResult<Vec<RunManifest>> {
        let mut runs = Vec::new();

        if !self.root_dir.exists() {
            return Ok(runs);
        }

        for entry in fs::read_dir(&self.root_dir)? {
            let entry = entry?;
            if entry.path().is_dir() {
                let run_id = entry.file_name().to_string_lossy().to_string();
                if let Ok(manifest) = self.load_manifest(&run_id)
                    && manifest.case_name == case_name
                {
                    runs.push(manifest);
                }
            }
        }
        runs.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));

        Ok(runs)
    }

    pub fn delete_run(&self, run_id: &str) -> ResultsResult<()> {
        let run_dir = self.run_dir(run_id);
        if run_dir.exists() {
            fs::remove_dir_all(run_dir)?;
        }
        Ok(())
    }
}

/// `# Time  T  p  Qdot  <species...>`, one tab-separated row per record.
fn post_table(records: &[TimeseriesRecord]) -> String {
    let mut out = String::from("# Time\tT\tp\tQdot");
    if let Some(first) = records.first() {
        for specie in first.mass_fractions.keys() {
            let _ = write!(out, "\t{specie}");
        }
    }
    out.push('\n');
    for record in records {
        let _ = write!(
            out,
            "{:e}\t{:e}\t{:e}\t{:e}",
            record.time_s,
            record.t_k,
            record.p_pa,
            record.qdot_w_m3.unwrap_or(0.0)
        );
        for y in record.mass_fractions.values() {
            let _ = write!(out, "\t{y:e}");
        }
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn record(time_s: f64) -> TimeseriesRecord {
        TimeseriesRecord {
            time_s,
            step: 1,
            delta_t_s: 0.1,
            t_k: 1000.0,
            p_pa: 1e5,
            rho_kg_m3: 0.35,
            qdot_w_m3: Some(2.5e6),
            mass_fractions: BTreeMap::from([("A".to_string(), 0.25), ("B".to_string(), 0.75)]),
            diagnostics: BTreeMap::new(),
        }
    }

    #[test]
    fn post_table_has_header_and_one_row_per_record() {
        let table = post_table(&[record(0.1), record(0.2)]);
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines[0], "# Time\tT\tp\tQdot\tA\tB");
        assert_eq!(lines.len(), 3);
        let cols: Vec<f64> = lines[2].split('\t').map(|c| c.parse().unwrap()).collect();
        assert_eq!(cols, vec![0.2, 1000.0, 1e5, 2.5e6, 0.25, 0.75]);
    }

    #[test]
    fn empty_run_writes_header_only() {
        assert_eq!(post_table(&[]), "# Time\tT\tp\tQdot\n");
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn post_table_rows_match_records(times in prop::collection::vec(0.0f64..10.0, 0..20)) {
                let records: Vec<_> = times.iter().map(|t| record(*t)).collect();
                let table = post_table(&records);
                prop_assert_eq!(table.lines().count(), records.len() + 1);
                for (line, t) in table.lines().skip(1).zip(&times) {
                    let first: f64 = line.split('\t').next().unwrap().parse().unwrap();
                    prop_assert_eq!(first, *t);
                }
            }
        }
    }
}
