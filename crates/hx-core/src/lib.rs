//! hx-core: shared foundation for the helyx chemistry/time-integration core.
//!
//! Contains:
//! - units (uom SI types + constructors)
//! - numeric (Real, tolerances, the single stabilisation policy)
//! - timing (wall-clock run timing)
//! - error (shared error types)

pub mod error;
pub mod numeric;
pub mod timing;
pub mod units;

pub use error::{HxError, HxResult};
pub use timing::RunClock;
pub use numeric::*;
pub use units::*;
