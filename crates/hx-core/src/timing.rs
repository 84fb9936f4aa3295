//! Wall-clock timing for run diagnostics.
//!
//! The time loop reports execution time per step and in total; extra
//! per-phase timing is printed only when enabled via `HX_TIMING` or
//! [`enable_timing`].

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

static ENABLED: AtomicBool = AtomicBool::new(false);

/// Enable per-phase timing globally.
pub fn enable_timing() {
    ENABLED.store(true, Ordering::Relaxed);
}

/// Disable per-phase timing globally.
pub fn disable_timing() {
    ENABLED.store(false, Ordering::Relaxed);
}

/// Check if per-phase timing is enabled.
pub fn is_enabled() -> bool {
    ENABLED.load(Ordering::Relaxed) || std::env::var("HX_TIMING").is_ok()
}

/// A simple timer that measures elapsed time.
pub struct Timer {
    label: &'static str,
    start: Instant,
    enabled: bool,
}

impl Timer {
    /// Create and start a new timer with the given label.
    pub fn start(label: &'static str) -> Self {
        Self {
            label,
            start: Instant::now(),
            enabled: is_enabled(),
        }
    }

    pub fn label(&self) -> &'static str {
        self.label
    }

    /// Stop the timer and return elapsed time in seconds.
    /// If timing is disabled, returns None.
    pub fn stop(self) -> Option<f64> {
        if self.enabled {
            Some(self.start.elapsed().as_secs_f64())
        } else {
            None
        }
    }
}

/// Elapsed wall-clock time since the start of a run.
#[derive(Debug, Clone, Copy)]
pub struct RunClock {
    start: Instant,
}

impl Default for RunClock {
    fn default() -> Self {
        Self::start()
    }
}

impl RunClock {
    pub fn start() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    /// Seconds since the clock was started.
    pub fn elapsed_s(&self) -> f64 {
        self.start.elapsed().as_secs_f64()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_clock_is_monotonic() {
        let clock = RunClock::start();
        let a = clock.elapsed_s();
        let b = clock.elapsed_s();
        assert!(b >= a);
    }

    #[test]
    fn timer_reports_only_when_enabled() {
        enable_timing();
        let timer = Timer::start("t");
        assert_eq!(timer.label(), "t");
        assert!(timer.stop().is_some());
        disable_timing();
    }
}
