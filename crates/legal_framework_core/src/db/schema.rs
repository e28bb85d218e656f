//! Schema snapshot loader.
//!
//! # Responsibility
//! - Create the `matter_types`, `merits_tasks` and `proceeding_types` tables
//!   and their indexes on a fresh database.
//! - Refuse databases stamped by a newer build.
//!
//! # Invariants
//! - The loaded snapshot version is mirrored to `PRAGMA user_version`.
//! - Loading is atomic: either every table and index exists afterwards, or
//!   none of the statements are committed.

use crate::db::{DbError, DbResult};
use rusqlite::{Connection, TransactionBehavior};

const SCHEMA_SQL: &str = include_str!("schema.sql");

/// Version stamped into `PRAGMA user_version` once the snapshot is loaded.
pub const SCHEMA_VERSION: u32 = 1;

/// Tables and columns every repository expects on a ready connection.
pub(crate) const REQUIRED_COLUMNS: &[(&str, &[&str])] = &[
    (
        "matter_types",
        &[
            "id",
            "name",
            "upper_gross_income_waiver",
            "upper_disposable_income_waiver",
            "upper_capital_waiver",
            "created_at",
            "updated_at",
        ],
    ),
    (
        "merits_tasks",
        &["id", "name", "type", "created_at", "updated_at"],
    ),
    (
        "proceeding_types",
        &[
            "id",
            "code",
            "ccms_code",
            "meaning",
            "description",
            "matter_type_id",
            "created_at",
            "updated_at",
        ],
    ),
];

/// Loads the schema snapshot unless the connection already carries it.
pub fn load_schema(conn: &mut Connection) -> DbResult<()> {
    if current_user_version(conn)? == SCHEMA_VERSION {
        return Ok(());
    }

    // Immediate: two processes opening the same fresh file must not both
    // observe version 0 and race on the DDL.
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    let version = current_user_version(&tx)?;
    if version > SCHEMA_VERSION {
        return Err(DbError::UnsupportedSchemaVersion {
            db_version: version,
            latest_supported: SCHEMA_VERSION,
        });
    }
    if version < SCHEMA_VERSION {
        tx.execute_batch(SCHEMA_SQL)?;
        tx.execute_batch(&format!("PRAGMA user_version = {SCHEMA_VERSION};"))?;
    }
    tx.commit()?;

    Ok(())
}

/// Reads `PRAGMA user_version` from the connection.
pub fn current_user_version(conn: &Connection) -> DbResult<u32> {
    let version = conn.query_row("PRAGMA user_version;", [], |row| row.get::<_, u32>(0))?;
    Ok(version)
}

#[cfg(test)]
mod tests {
    use super::{current_user_version, load_schema, REQUIRED_COLUMNS, SCHEMA_VERSION};
    use rusqlite::Connection;

    #[test]
    fn load_schema_creates_every_required_column() {
        let mut conn = Connection::open_in_memory().unwrap();
        load_schema(&mut conn).unwrap();

        assert_eq!(current_user_version(&conn).unwrap(), SCHEMA_VERSION);
        for (table, columns) in REQUIRED_COLUMNS {
            let mut stmt = conn
                .prepare(&format!("PRAGMA table_info({table});"))
                .unwrap();
            let present: Vec<String> = stmt
                .query_map([], |row| row.get(1))
                .unwrap()
                .collect::<Result<_, _>>()
                .unwrap();
            for column in *columns {
                assert!(
                    present.iter().any(|name| name == column),
                    "{table}.{column} missing"
                );
            }
        }
    }

    #[test]
    fn load_schema_twice_is_a_no_op() {
        let mut conn = Connection::open_in_memory().unwrap();
        load_schema(&mut conn).unwrap();
        load_schema(&mut conn).unwrap();
        assert_eq!(current_user_version(&conn).unwrap(), SCHEMA_VERSION);
    }
}
