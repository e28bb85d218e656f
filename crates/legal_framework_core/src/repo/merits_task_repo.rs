//! Merits task repository contract and SQLite implementation.
//!
//! # Invariants
//! - `type` is written from `MeritsTaskKind::as_db_str` only.
//! - Rows carrying an unknown discriminator are reported as invalid data.

use crate::model::merits_task::{MeritsTask, MeritsTaskId, MeritsTaskKind, MeritsTaskPatch};
use crate::model::Timestamp;
use crate::repo::{
    count_rows, ensure_connection_ready, parse_uuid, EntityKind, ListQuery, StoreError,
    StoreResult, WriteScope,
};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row};

const MERITS_TASK_SELECT_SQL: &str = "SELECT
    id,
    name,
    type,
    created_at,
    updated_at
FROM merits_tasks";

/// Repository interface for merits tasks.
pub trait MeritsTaskRepository {
    fn create_merits_task(&self, record: &MeritsTask) -> StoreResult<MeritsTaskId>;
    fn get_merits_task(&self, id: MeritsTaskId) -> StoreResult<Option<MeritsTask>>;
    fn update_merits_task(
        &self,
        id: MeritsTaskId,
        patch: MeritsTaskPatch,
        now: Timestamp,
    ) -> StoreResult<MeritsTask>;
    fn delete_merits_task(&self, id: MeritsTaskId) -> StoreResult<()>;
    fn list_merits_tasks(&self, query: &ListQuery) -> StoreResult<Vec<MeritsTask>>;
    fn find_merits_tasks_by_kind(&self, kind: MeritsTaskKind) -> StoreResult<Vec<MeritsTask>>;
    fn count_merits_tasks(&self) -> StoreResult<u64>;
}

/// SQLite-backed merits task repository.
pub struct SqliteMeritsTaskRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteMeritsTaskRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> StoreResult<Self> {
        ensure_connection_ready(conn)?;
        Ok(Self { conn })
    }

    /// Wraps a connection already checked by `ensure_connection_ready`.
    pub(crate) fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl MeritsTaskRepository for SqliteMeritsTaskRepository<'_> {
    fn create_merits_task(&self, record: &MeritsTask) -> StoreResult<MeritsTaskId> {
        record.validate()?;

        self.conn.execute(
            "INSERT INTO merits_tasks (
                id,
                name,
                type,
                created_at,
                updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5);",
            params![
                record.id.to_string(),
                record.name.as_str(),
                record.kind.as_db_str(),
                record.created_at,
                record.updated_at,
            ],
        )?;

        Ok(record.id)
    }

    fn get_merits_task(&self, id: MeritsTaskId) -> StoreResult<Option<MeritsTask>> {
        load_merits_task(self.conn, id)
    }

    fn update_merits_task(
        &self,
        id: MeritsTaskId,
        patch: MeritsTaskPatch,
        now: Timestamp,
    ) -> StoreResult<MeritsTask> {
        let scope = WriteScope::begin(self.conn)?;
        let mut record = load_merits_task(&scope, id)?
            .ok_or_else(|| StoreError::not_found(EntityKind::MeritsTask, id))?;

        record.apply(patch, now);
        record.validate()?;

        scope.execute(
            "UPDATE merits_tasks
             SET
                name = ?2,
                type = ?3,
                updated_at = ?4
             WHERE id = ?1;",
            params![
                id.to_string(),
                record.name.as_str(),
                record.kind.as_db_str(),
                record.updated_at,
            ],
        )?;
        scope.commit()?;

        Ok(record)
    }

    fn delete_merits_task(&self, id: MeritsTaskId) -> StoreResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM merits_tasks WHERE id = ?1;", [id.to_string()])?;
        if changed == 0 {
            return Err(StoreError::not_found(EntityKind::MeritsTask, id));
        }
        Ok(())
    }

    fn list_merits_tasks(&self, query: &ListQuery) -> StoreResult<Vec<MeritsTask>> {
        let mut sql = format!("{MERITS_TASK_SELECT_SQL} ORDER BY rowid ASC");
        let mut bind_values: Vec<Value> = Vec::new();
        query.push_sql(&mut sql, &mut bind_values);
        collect_merits_tasks(self.conn, &sql, bind_values)
    }

    fn find_merits_tasks_by_kind(&self, kind: MeritsTaskKind) -> StoreResult<Vec<MeritsTask>> {
        collect_merits_tasks(
            self.conn,
            &format!("{MERITS_TASK_SELECT_SQL} WHERE type = ? ORDER BY rowid ASC"),
            vec![Value::Text(kind.as_db_str().to_string())],
        )
    }

    fn count_merits_tasks(&self) -> StoreResult<u64> {
        count_rows(self.conn, EntityKind::MeritsTask.table())
    }
}

fn load_merits_task(conn: &Connection, id: MeritsTaskId) -> StoreResult<Option<MeritsTask>> {
    let mut stmt = conn.prepare(&format!("{MERITS_TASK_SELECT_SQL} WHERE id = ?1;"))?;
    let mut rows = stmt.query([id.to_string()])?;
    if let Some(row) = rows.next()? {
        return Ok(Some(parse_merits_task_row(row)?));
    }
    Ok(None)
}

fn collect_merits_tasks(
    conn: &Connection,
    sql: &str,
    bind_values: Vec<Value>,
) -> StoreResult<Vec<MeritsTask>> {
    let mut stmt = conn.prepare(sql)?;
    let mut rows = stmt.query(params_from_iter(bind_values))?;
    let mut records = Vec::new();
    while let Some(row) = rows.next()? {
        records.push(parse_merits_task_row(row)?);
    }
    Ok(records)
}

fn parse_merits_task_row(row: &Row<'_>) -> StoreResult<MeritsTask> {
    let id_text: String = row.get("id")?;
    let type_text: String = row.get("type")?;
    let kind = MeritsTaskKind::from_db_str(&type_text).ok_or_else(|| {
        StoreError::InvalidData(format!(
            "invalid merits task type `{type_text}` in merits_tasks.type"
        ))
    })?;

    let record = MeritsTask {
        id: parse_uuid(&id_text, "merits_tasks.id")?,
        name: row.get("name")?,
        kind,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    };
    record
        .validate()
        .map_err(|err| StoreError::InvalidData(format!("merits task {}: {err}", record.id)))?;
    Ok(record)
}
