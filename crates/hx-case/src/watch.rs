//! Re-reading of the run-time tunables while a case runs.

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use hx_sim::{ControlSource, TimeControl};
use serde::Deserialize;

use crate::CaseResult;
use crate::schema::ControlDef;

#[derive(Deserialize)]
struct ControlOnly {
    control: ControlDef,
}

fn read_control(path: &Path) -> CaseResult<ControlDef> {
    let content = std::fs::read_to_string(path)?;
    let parsed: ControlOnly = serde_yaml::from_str(&content)?;
    crate::validate::validate_control(&parsed.control)?;
    Ok(parsed.control)
}

/// Watches the case file and reports changed step-size tunables.
///
/// Only `adjustTimeStep`, `maxDeltaT`, `minDeltaT` and `maxGrowth` are
/// picked up; the file is re-read only when its modification time moves.
#[derive(Debug, Clone)]
pub struct ControlWatcher {
    path: PathBuf,
    modified: Option<SystemTime>,
    current: TimeControl,
}

impl ControlWatcher {
    pub fn new(path: impl Into<PathBuf>, current: TimeControl) -> Self {
        let path = path.into();
        let modified = modified_time(&path).ok();
        Self {
            path,
            modified,
            current,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn current(&self) -> &TimeControl {
        &self.current
    }
}

fn modified_time(path: &Path) -> std::io::Result<SystemTime> {
    std::fs::metadata(path)?.modified()
}

impl ControlSource for ControlWatcher {
    fn refresh(&mut self) -> Option<TimeControl> {
        let modified = match modified_time(&self.path) {
            Ok(t) => t,
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "cannot stat case file; keeping time controls");
                return None;
            }
        };
        if self.modified == Some(modified) {
            return None;
        }
        self.modified = Some(modified);

        let def = match read_control(&self.path) {
            Ok(def) => def,
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "cannot re-read controls; keeping previous values");
                return None;
            }
        };
        let next = TimeControl {
            adjust_time_step: def.adjust_time_step,
            max_delta_t: def.max_delta_t,
            min_delta_t: def.min_delta_t,
            max_growth: def.max_growth,
            ..self.current
        };
        if next == self.current {
            return None;
        }
        tracing::info!(path = %self.path.display(), "time controls re-read");
        self.current = next;
        Some(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    const CASE: &str = "\
version: 2
name: watched
control:
  endTime: 1.0
  deltaT: 0.01
  maxDeltaT: 0.1
species: []
initial:
  temperature: 300
  pressure: 100000
  fractions: {}
";

    fn touch(path: &Path, content: &str, seconds: u64) {
        std::fs::write(path, content).unwrap();
        let file = std::fs::File::options().write(true).open(path).unwrap();
        file.set_modified(SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000 + seconds))
            .unwrap();
    }

    fn temp_case(tag: &str) -> PathBuf {
        std::env::temp_dir().join(format!("hx_case_watch_{tag}_{}.yaml", std::process::id()))
    }

    #[test]
    fn unchanged_file_reports_nothing() {
        let path = temp_case("unchanged");
        touch(&path, CASE, 0);
        let mut watcher = ControlWatcher::new(&path, TimeControl::default());
        assert_eq!(watcher.refresh(), None);
        assert_eq!(watcher.refresh(), None);
    }

    #[test]
    fn edited_tunables_are_picked_up_but_delta_t_is_kept() {
        let path = temp_case("edited");
        touch(&path, CASE, 0);
        let start = TimeControl {
            delta_t: 0.01,
            max_delta_t: 0.1,
            ..TimeControl::default()
        };
        let mut watcher = ControlWatcher::new(&path, start);

        let edited = CASE
            .replace("maxDeltaT: 0.1", "maxDeltaT: 0.05\n  adjustTimeStep: true")
            .replace("deltaT: 0.01", "deltaT: 0.5");
        touch(&path, &edited, 10);
        let next = watcher.refresh().unwrap();
        assert!(next.adjust_time_step);
        assert_eq!(next.max_delta_t, 0.05);
        assert_eq!(next.delta_t, 0.01);
        assert_eq!(watcher.refresh(), None);
    }

    #[test]
    fn broken_file_keeps_previous_values() {
        let path = temp_case("broken");
        touch(&path, CASE, 0);
        let mut watcher = ControlWatcher::new(&path, TimeControl::default());
        touch(&path, "control: [unterminated", 20);
        assert_eq!(watcher.refresh(), None);
        assert_eq!(watcher.current(), &TimeControl::default());

        // an invalid but well-formed edit is rejected the same way
        touch(&path, &CASE.replace("maxDeltaT: 0.1", "maxGrowth: 0.5"), 30);
        assert_eq!(watcher.refresh(), None);
    }
}
