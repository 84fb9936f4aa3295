//! Static mesh: contributes the mesh-update steps other objects order against.

use hx_graph::{INITIALISATION_LOOP, SolveContribution};

use super::unknown_step;
use crate::error::{SimError, SimResult};
use crate::solver_object::{SolveContext, SolveOutcome, SolverObject};

/// Scalar holding the number of cells seen by `fvMeshInit`.
pub const MESH_CELLS: &str = "meshCells";

#[derive(Debug, Default)]
pub struct MeshMotion {
    initialised: bool,
    updates: usize,
}

impl MeshMotion {
    /// Mesh updates performed so far.
    pub fn updates(&self) -> usize {
        self.updates
    }
}

impl SolverObject for MeshMotion {
    fn name(&self) -> &str {
        "meshMotion"
    }

    fn solve_graph(&self) -> SolveContribution {
        SolveContribution::new()
            .solves(["fvMeshInit", "fvMesh"])
            .member_of(INITIALISATION_LOOP, ["fvMeshInit"])
    }

    fn correct(&mut self, solve: &str, ctx: &mut SolveContext<'_>) -> SimResult<SolveOutcome> {
        match solve {
            "fvMeshInit" => {
                let n = ctx.fields.n_cells();
                if n == 0 {
                    return Err(SimError::Solve {
                        object: self.name().to_string(),
                        step: solve.to_string(),
                        message: "mesh has no cells".into(),
                    });
                }
                ctx.fields.set_scalar(MESH_CELLS, n as f64);
                self.initialised = true;
                tracing::debug!(cells = n, "static mesh initialised");
            }
            "fvMesh" => {
                if !self.initialised {
                    return Err(SimError::Solve {
                        object: self.name().to_string(),
                        step: solve.to_string(),
                        message: "mesh updated before fvMeshInit".into(),
                    });
                }
                self.updates += 1;
            }
            other => return Err(unknown_step(self.name(), other)),
        }
        Ok(SolveOutcome::default())
    }
}
