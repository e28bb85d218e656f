//! Repository layer contracts and SQLite implementations.
//!
//! # Responsibility
//! - Define per-entity data access contracts.
//! - Enforce uniqueness and referential rules inside the write transaction
//!   that performs the mutation.
//! - Isolate SQLite query details from the store facade.
//!
//! # Invariants
//! - Write paths validate records before SQL mutations.
//! - Every write runs inside one `WriteScope`; a failed check leaves the
//!   database untouched.
//! - Read paths reject invalid persisted state instead of masking it.
//! - List and lookup results are returned in insertion order (`rowid`).

use crate::db::schema::{current_user_version, REQUIRED_COLUMNS, SCHEMA_VERSION};
use log::warn;
use rusqlite::types::Value;
use rusqlite::Connection;
use std::ops::Deref;
use uuid::Uuid;

pub mod error;
pub mod matter_type_repo;
pub mod merits_task_repo;
pub mod proceeding_type_repo;

pub use error::{EntityKind, StoreError, StoreErrorKind, StoreResult};

const SAVEPOINT_NAME: &str = "entity_store_write";

/// Pagination options for list operations.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListQuery {
    /// Maximum rows to return. `None` returns every remaining row.
    pub limit: Option<u32>,
    /// Number of rows to skip.
    pub offset: u32,
}

impl ListQuery {
    /// Appends `LIMIT`/`OFFSET` clauses and their bind values.
    pub(crate) fn push_sql(&self, sql: &mut String, bind_values: &mut Vec<Value>) {
        if let Some(limit) = self.limit {
            sql.push_str(" LIMIT ?");
            bind_values.push(Value::Integer(i64::from(limit)));
            if self.offset > 0 {
                sql.push_str(" OFFSET ?");
                bind_values.push(Value::Integer(i64::from(self.offset)));
            }
        } else if self.offset > 0 {
            sql.push_str(" LIMIT -1 OFFSET ?");
            bind_values.push(Value::Integer(i64::from(self.offset)));
        }
    }
}

/// Write transaction guard.
///
/// On an autocommit connection this is `BEGIN IMMEDIATE`, which takes the
/// database write lock up front so check-then-write sequences from other
/// connections are serialized. Inside a caller-owned transaction it is a
/// savepoint, so the caller keeps control of the outer commit.
///
/// Dropping the guard without `commit` rolls the write back.
pub(crate) struct WriteScope<'conn> {
    conn: &'conn Connection,
    nested: bool,
    finished: bool,
}

impl<'conn> WriteScope<'conn> {
    pub(crate) fn begin(conn: &'conn Connection) -> rusqlite::Result<Self> {
        let nested = !conn.is_autocommit();
        if nested {
            conn.execute_batch(&format!("SAVEPOINT {SAVEPOINT_NAME};"))?;
        } else {
            conn.execute_batch("BEGIN IMMEDIATE;")?;
        }
        Ok(Self {
            conn,
            nested,
            finished: false,
        })
    }

    pub(crate) fn commit(mut self) -> rusqlite::Result<()> {
        self.finished = true;
        if self.nested {
            self.conn
                .execute_batch(&format!("RELEASE {SAVEPOINT_NAME};"))
        } else {
            self.conn.execute_batch("COMMIT;")
        }
    }
}

impl Deref for WriteScope<'_> {
    type Target = Connection;

    fn deref(&self) -> &Connection {
        self.conn
    }
}

impl Drop for WriteScope<'_> {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        let sql = if self.nested {
            format!("ROLLBACK TO {SAVEPOINT_NAME}; RELEASE {SAVEPOINT_NAME};")
        } else {
            "ROLLBACK;".to_string()
        };
        if let Err(err) = self.conn.execute_batch(&sql) {
            warn!(
                "event=write_rollback module=repo status=error nested={} error={}",
                self.nested,
                err
            );
        }
    }
}

/// Checks that `conn` carries the loaded schema snapshot.
pub(crate) fn ensure_connection_ready(conn: &Connection) -> StoreResult<()> {
    let actual_version = current_user_version(conn)?;
    if actual_version != SCHEMA_VERSION {
        return Err(StoreError::UninitializedConnection {
            expected_version: SCHEMA_VERSION,
            actual_version,
        });
    }

    for &(table, columns) in REQUIRED_COLUMNS {
        if !table_exists(conn, table)? {
            return Err(StoreError::MissingRequiredTable(table));
        }
        for &column in columns {
            if !table_has_column(conn, table, column)? {
                return Err(StoreError::MissingRequiredColumn { table, column });
            }
        }
    }

    Ok(())
}

fn table_exists(conn: &Connection, table: &str) -> StoreResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = ?1
        );",
        [table],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

fn table_has_column(conn: &Connection, table: &str, column: &str) -> StoreResult<bool> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table});"))?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let current: String = row.get(1)?;
        if current == column {
            return Ok(true);
        }
    }
    Ok(false)
}

pub(crate) fn parse_uuid(value: &str, column: &'static str) -> StoreResult<Uuid> {
    Uuid::parse_str(value)
        .map_err(|_| StoreError::InvalidData(format!("invalid uuid `{value}` in {column}")))
}

pub(crate) fn parse_flag(value: i64, column: &'static str) -> StoreResult<bool> {
    match value {
        0 => Ok(false),
        1 => Ok(true),
        other => Err(StoreError::InvalidData(format!(
            "invalid boolean value `{other}` in {column}"
        ))),
    }
}

pub(crate) fn bool_to_int(value: bool) -> i64 {
    if value {
        1
    } else {
        0
    }
}

pub(crate) fn count_rows(conn: &Connection, table: &'static str) -> StoreResult<u64> {
    let count: i64 = conn.query_row(&format!("SELECT COUNT(*) FROM {table};"), [], |row| {
        row.get(0)
    })?;
    u64::try_from(count)
        .map_err(|_| StoreError::InvalidData(format!("negative row count in {table}")))
}

#[cfg(test)]
mod tests {
    use super::{ensure_connection_ready, ListQuery, StoreError, WriteScope};
    use crate::db::open_db_in_memory;
    use crate::db::schema::SCHEMA_VERSION;
    use rusqlite::types::Value;
    use rusqlite::Connection;

    fn row_count(conn: &Connection) -> i64 {
        conn.query_row("SELECT COUNT(*) FROM merits_tasks;", [], |row| row.get(0))
            .unwrap()
    }

    fn insert_task(conn: &Connection, id: &str) {
        conn.execute(
            "INSERT INTO merits_tasks (id, name, type, created_at, updated_at)
             VALUES (?1, 'task', 'ApplicationTask', 1, 1);",
            [id],
        )
        .unwrap();
    }

    #[test]
    fn dropped_scope_rolls_back() {
        let conn = open_db_in_memory().unwrap();
        {
            let scope = WriteScope::begin(&conn).unwrap();
            insert_task(&scope, "a");
        }
        assert_eq!(row_count(&conn), 0);
        assert!(conn.is_autocommit());
    }

    #[test]
    fn nested_scope_leaves_outer_transaction_open() {
        let conn = open_db_in_memory().unwrap();
        conn.execute_batch("BEGIN IMMEDIATE;").unwrap();

        let committed = WriteScope::begin(&conn).unwrap();
        insert_task(&committed, "a");
        committed.commit().unwrap();

        {
            let abandoned = WriteScope::begin(&conn).unwrap();
            insert_task(&abandoned, "b");
        }

        assert!(!conn.is_autocommit());
        conn.execute_batch("COMMIT;").unwrap();
        assert_eq!(row_count(&conn), 1);
    }

    #[test]
    fn list_query_builds_limit_and_offset_clauses() {
        let mut sql = String::new();
        let mut binds = Vec::new();
        ListQuery {
            limit: None,
            offset: 3,
        }
        .push_sql(&mut sql, &mut binds);
        assert_eq!(sql, " LIMIT -1 OFFSET ?");
        assert_eq!(binds, vec![Value::Integer(3)]);

        let mut sql = String::new();
        let mut binds = Vec::new();
        ListQuery::default().push_sql(&mut sql, &mut binds);
        assert!(sql.is_empty());
        assert!(binds.is_empty());
    }

    #[test]
    fn unprepared_connection_is_rejected() {
        let conn = Connection::open_in_memory().unwrap();
        let err = ensure_connection_ready(&conn).unwrap_err();
        assert!(matches!(
            err,
            StoreError::UninitializedConnection {
                expected_version: SCHEMA_VERSION,
                actual_version: 0,
            }
        ));
    }
}
