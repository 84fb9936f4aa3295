//! When and where the time loop publishes its state.

use hx_core::Real;

use crate::error::{SimError, SimResult};
use crate::fields::FieldRegistry;
use crate::time_step::TimeStepState;

/// Output cadence.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum WriteControl {
    /// Every `interval` time steps.
    TimeStep { interval: usize },
    /// Every `interval` seconds of simulated time.
    RunTime { interval: Real },
}

impl Default for WriteControl {
    fn default() -> Self {
        Self::TimeStep { interval: 1 }
    }
}

impl WriteControl {
    pub fn validate(&self) -> SimResult<()> {
        let ok = match *self {
            Self::TimeStep { interval } => interval > 0,
            Self::RunTime { interval } => interval.is_finite() && interval > 0.0,
        };
        if ok {
            Ok(())
        } else {
            Err(SimError::InvalidArg {
                what: format!("write interval must be positive, got {self:?}"),
            })
        }
    }

    /// Index of the output interval `state` falls in; a write is due
    /// whenever it moves past the last one written.
    pub fn index(&self, state: &TimeStepState, start_time: Real) -> usize {
        match *self {
            Self::TimeStep { interval } => state.step_index / interval.max(1),
            Self::RunTime { interval } => {
                let elapsed = state.time - start_time + 0.5 * state.delta_t;
                (elapsed / interval).floor().max(0.0) as usize
            }
        }
    }
}

/// State handed to a [`WriteSink`].
#[derive(Debug, Clone, Copy)]
pub struct WriteEvent<'a> {
    pub time: Real,
    pub step_index: usize,
    pub delta_t: Real,
    pub fields: &'a FieldRegistry,
    /// Diagnostics of the step just completed.
    pub diagnostics: &'a [(String, Real)],
}

pub trait WriteSink {
    fn write(&mut self, event: &WriteEvent<'_>) -> SimResult<()>;
}

impl<F> WriteSink for F
where
    F: FnMut(&WriteEvent<'_>) -> SimResult<()>,
{
    fn write(&mut self, event: &WriteEvent<'_>) -> SimResult<()> {
        self(event)
    }
}
