//! Adaptive macro time-step selection.
//!
//! Before each time step the controller takes the minimum of
//! - one target per stability limit (chemistry stable step, Courant numbers)
//! - the previous step times the growth damping factor
//!
//! clips it to `maxDeltaT` and fails if the result lies below `minDeltaT`.

use hx_core::{GREAT, Real, SMALL, stabilise, usable_ratio};

use crate::error::{SimError, SimResult};

/// Time-step tunables; re-readable between steps.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeControl {
    pub adjust_time_step: bool,
    /// Fixed step, and the first "previous" step when adjusting.
    pub delta_t: Real,
    pub max_delta_t: Real,
    pub min_delta_t: Real,
    /// Largest allowed ratio between consecutive steps.
    pub max_growth: Real,
}

impl Default for TimeControl {
    fn default() -> Self {
        Self {
            adjust_time_step: false,
            delta_t: 1e-3,
            max_delta_t: GREAT,
            min_delta_t: SMALL,
            max_growth: 1.2,
        }
    }
}

impl TimeControl {
    pub fn validate(&self) -> SimResult<()> {
        let positive = |v: Real| v.is_finite() && v > 0.0;
        if !positive(self.delta_t) {
            return Err(SimError::InvalidArg {
                what: format!("deltaT must be positive, got {}", self.delta_t),
            });
        }
        if !positive(self.min_delta_t) || !(self.max_delta_t > self.min_delta_t) {
            return Err(SimError::InvalidArg {
                what: format!(
                    "need maxDeltaT > minDeltaT > 0, got maxDeltaT = {} and minDeltaT = {}",
                    self.max_delta_t, self.min_delta_t
                ),
            });
        }
        if !(self.max_growth >= 1.0) || !self.max_growth.is_finite() {
            return Err(SimError::InvalidArg {
                what: format!("maxGrowth must be at least 1, got {}", self.max_growth),
            });
        }
        Ok(())
    }
}

/// One source's constraint on the next step.
#[derive(Debug, Clone, PartialEq)]
pub enum StabilityLimit {
    /// Target `desired / observed * current step`.
    Courant {
        source: String,
        desired: Real,
        observed: Real,
    },
    /// An absolute stable step, e.g. the chemistry's own estimate.
    StepLimit { source: String, max_step: Real },
}

impl StabilityLimit {
    pub fn courant(source: impl Into<String>, desired: Real, observed: Real) -> Self {
        Self::Courant {
            source: source.into(),
            desired,
            observed,
        }
    }

    pub fn step_limit(source: impl Into<String>, max_step: Real) -> Self {
        Self::StepLimit {
            source: source.into(),
            max_step,
        }
    }

    pub fn source(&self) -> &str {
        match self {
            Self::Courant { source, .. } | Self::StepLimit { source, .. } => source,
        }
    }

    /// Step this limit allows given the current step.
    ///
    /// Unusable (non-finite) inputs yield a target that never limits; the
    /// substitution is logged.
    pub fn target(&self, current: Real) -> Real {
        match self {
            Self::Courant {
                source,
                desired,
                observed,
            } => match (usable_ratio(*desired), usable_ratio(*observed)) {
                (Some(desired), Some(observed)) => desired / stabilise(observed.max(0.0), SMALL) * current,
                _ => {
                    tracing::warn!(
                        source = %source,
                        desired,
                        observed,
                        "non-finite Courant number ignored for time-step selection"
                    );
                    GREAT
                }
            },
            Self::StepLimit { source, max_step } => match usable_ratio(*max_step) {
                Some(step) if step > 0.0 => step,
                _ => {
                    tracing::warn!(
                        source = %source,
                        max_step,
                        "unusable stable step ignored for time-step selection"
                    );
                    GREAT
                }
            },
        }
    }
}

/// What bound the chosen step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepLimiter {
    /// Adaptive stepping is off.
    Fixed,
    /// First step, bounded by the configured `deltaT`.
    Initial,
    Growth,
    Ceiling,
    Source(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct StepDecision {
    pub delta_t: Real,
    pub limiter: StepLimiter,
}

/// Time and step bookkeeping owned by the time-loop driver.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeStepState {
    pub time: Real,
    pub delta_t: Real,
    pub step_index: usize,
    pub min_delta_t: Real,
    pub max_delta_t: Real,
}

impl TimeStepState {
    pub fn new(start_time: Real, control: &TimeControl) -> Self {
        Self {
            time: start_time,
            delta_t: control.delta_t,
            step_index: 0,
            min_delta_t: control.min_delta_t,
            max_delta_t: control.max_delta_t,
        }
    }

    /// True while another step fits before `end_time`.
    pub fn running(&self, end_time: Real) -> bool {
        self.time < end_time - 0.5 * self.delta_t
    }

    pub fn advance(&mut self, delta_t: Real) {
        self.delta_t = delta_t;
        self.time += delta_t;
        self.step_index += 1;
    }

    pub fn apply_control(&mut self, control: &TimeControl) {
        self.min_delta_t = control.min_delta_t;
        self.max_delta_t = control.max_delta_t;
    }
}

/// The adaptive time-step controller.
#[derive(Debug, Clone)]
pub struct AdaptiveTimeStep {
    control: TimeControl,
}

impl AdaptiveTimeStep {
    pub fn new(control: TimeControl) -> SimResult<Self> {
        control.validate()?;
        Ok(Self { control })
    }

    pub fn control(&self) -> &TimeControl {
        &self.control
    }

    /// Replace the tunables, e.g. after the control file changed.
    pub fn set_control(&mut self, control: TimeControl) -> SimResult<()> {
        control.validate()?;
        if control != self.control {
            tracing::info!(
                adjust_time_step = control.adjust_time_step,
                max_delta_t = control.max_delta_t,
                min_delta_t = control.min_delta_t,
                max_growth = control.max_growth,
                "time control updated"
            );
        }
        self.control = control;
        Ok(())
    }

    /// Choose the next step after a step of size `previous`.
    pub fn select(&self, previous: Real, limits: &[StabilityLimit]) -> SimResult<StepDecision> {
        self.choose(previous, previous * self.control.max_growth, StepLimiter::Growth, limits)
    }

    /// Choose the first step: never larger than the configured `deltaT`.
    pub fn select_initial(&self, limits: &[StabilityLimit]) -> SimResult<StepDecision> {
        let delta_t = self.control.delta_t;
        self.choose(delta_t, delta_t, StepLimiter::Initial, limits)
    }

    fn choose(
        &self,
        previous: Real,
        bound: Real,
        bound_limiter: StepLimiter,
        limits: &[StabilityLimit],
    ) -> SimResult<StepDecision> {
        let c = &self.control;
        if !c.adjust_time_step {
            return Ok(StepDecision {
                delta_t: c.delta_t,
                limiter: StepLimiter::Fixed,
            });
        }

        let mut delta_t = bound;
        let mut limiter = bound_limiter;
        for limit in limits {
            let target = limit.target(previous);
            if target < delta_t {
                delta_t = target;
                limiter = StepLimiter::Source(limit.source().to_string());
            }
        }
        if delta_t > c.max_delta_t {
            delta_t = c.max_delta_t;
            limiter = StepLimiter::Ceiling;
        }

        if !(delta_t >= c.min_delta_t) {
            return Err(SimError::StepBelowMinimum {
                computed: delta_t,
                min_delta_t: c.min_delta_t,
            });
        }
        Ok(StepDecision { delta_t, limiter })
    }
}
