use hx_core::{GREAT, Real};

use crate::error::ChemistryResult;
use crate::mechanism::Mechanism;
use crate::solver::{ChemistrySolver, ReactorState};

/// Leaves the state untouched; chemistry never limits the time step.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoChemistrySolver;

impl ChemistrySolver for NoChemistrySolver {
    fn name(&self) -> &'static str {
        "none"
    }

    fn solve(
        &self,
        _mechanism: &Mechanism,
        _state: &mut ReactorState,
        _dt: &mut Real,
        sub_dt: &mut Real,
    ) -> ChemistryResult<()> {
        *sub_dt = GREAT;
        Ok(())
    }
}
