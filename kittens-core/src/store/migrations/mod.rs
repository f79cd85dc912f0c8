//! Versioned schema for the kitten store
//!
//! The schema version lives in `PRAGMA user_version`. Each step runs in its own
//! transaction together with the version bump, so an interrupted upgrade
//! resumes at the step that failed.

use rusqlite::Connection;
use tracing::info;

use super::StoreError;

struct Step {
    name: &'static str,
    sql: &'static str,
}

const STEPS: &[Step] = &[
    Step {
        name: "v001_initial",
        sql: include_str!("v001_initial.sql"),
    },
    Step {
        name: "v002_revision_paths",
        sql: include_str!("v002_revision_paths.sql"),
    },
];

/// Schema version this build writes
pub fn latest_version() -> i32 {
    STEPS.len() as i32
}

pub fn schema_version(conn: &Connection) -> Result<i32, StoreError> {
    Ok(conn.pragma_query_value(None, "user_version", |row| row.get(0))?)
}

/// Bring the schema up to [`latest_version`], returning the number of steps run
///
/// A database written by a newer build is refused rather than downgraded.
pub fn upgrade(conn: &mut Connection) -> Result<usize, StoreError> {
    let current = schema_version(conn)?;
    let latest = latest_version();
    if current > latest {
        return Err(StoreError::Migration(format!(
            "database schema v{current} is newer than supported v{latest}"
        )));
    }

    let pending = STEPS.iter().zip(1..).skip(current as usize);
    let mut applied = 0;
    for (step, version) in pending {
        info!(version, step = step.name, "Applying store migration");
        let tx = conn.transaction()?;
        tx.execute_batch(step.sql)
            .map_err(|e| StoreError::Migration(format!("{}: {e}", step.name)))?;
        tx.pragma_update(None, "user_version", version)?;
        tx.commit()?;
        applied += 1;
    }
    Ok(applied)
}
