//! Schema migration framework.

use hx_sim::DEFAULT_SOLVER_OBJECTS;

use crate::CaseError;
use crate::schema::Case;

pub const LATEST_VERSION: u32 = 2;

pub fn migrate_to_latest(mut case: Case) -> Result<Case, CaseError> {
    while case.version < LATEST_VERSION {
        case = migrate_one_version(case)?;
    }
    Ok(case)
}

fn migrate_one_version(case: Case) -> Result<Case, CaseError> {
    match case.version {
        0 => migrate_v0_to_v1(case),
        1 => migrate_v1_to_v2(case),
        v => Err(CaseError::Migration {
            what: format!("No migration path from version {}", v),
        }),
    }
}

fn migrate_v0_to_v1(mut case: Case) -> Result<Case, CaseError> {
    case.version = 1;
    Ok(case)
}

/// Version 1 always ran the single-cell reactor objects; version 2 lists
/// them explicitly.
fn migrate_v1_to_v2(mut case: Case) -> Result<Case, CaseError> {
    if case.solver_objects.is_empty() {
        case.solver_objects = DEFAULT_SOLVER_OBJECTS.iter().map(|s| s.to_string()).collect();
    }
    case.version = 2;
    Ok(case)
}
