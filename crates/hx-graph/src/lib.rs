//! hx-graph: dependency-ordered solve steps.
//!
//! Provides:
//! - Solve steps and the per-object contribution they are declared through
//! - A builder that resolves required/optional dependencies into a
//!   deterministic linear order
//! - A correction-loop schedule (outer corrector with nested inner loops,
//!   plus the initialisation loop)
//!
//! # Example
//!
//! ```
//! use hx_graph::{SolveContribution, SolveGraphBuilder, OUTER_CORRECTOR};
//!
//! let mut builder = SolveGraphBuilder::new();
//! builder
//!     .add_contribution(
//!         "flow",
//!         SolveContribution::new()
//!             .solves(["UPredictor", "p", "U"])
//!             .requires("p", ["UPredictor"])
//!             .requires("U", ["p"])
//!             .member_of(OUTER_CORRECTOR, ["UPredictor", "p", "U"]),
//!     )
//!     .unwrap();
//! let graph = builder.build().unwrap();
//! assert_eq!(graph.order(), vec!["UPredictor", "p", "U"]);
//! ```

pub mod builder;
pub mod error;
pub mod order;
pub mod schedule;
pub mod step;

pub use builder::{SolveGraph, SolveGraphBuilder};
pub use error::{GraphError, GraphResult};
pub use schedule::{Schedule, ScheduleNode};
pub use step::{INITIALISATION_LOOP, OUTER_CORRECTOR, SolveContribution, SolveStep};
