//! Proceeding type repository contract and SQLite implementation.
//!
//! # Responsibility
//! - Provide CRUD and code lookup over `proceeding_types`.
//! - Enforce the `matter_type_id` linkage that the table itself does not
//!   declare as a foreign key.
//!
//! # Invariants
//! - `matter_type_id` is resolved inside the same `WriteScope` as the write,
//!   so a concurrent matter type delete is serialized before or after it.
//! - `code` lookups return every match in insertion order.

use crate::model::matter_type::MatterTypeId;
use crate::model::proceeding_type::{ProceedingType, ProceedingTypeId, ProceedingTypePatch};
use crate::model::Timestamp;
use crate::repo::matter_type_repo::matter_type_exists;
use crate::repo::{
    count_rows, ensure_connection_ready, parse_uuid, EntityKind, ListQuery, StoreError,
    StoreResult, WriteScope,
};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row};

const PROCEEDING_TYPE_SELECT_SQL: &str = "SELECT
    id,
    code,
    ccms_code,
    meaning,
    description,
    matter_type_id,
    created_at,
    updated_at
FROM proceeding_types";

/// Repository interface for proceeding types.
pub trait ProceedingTypeRepository {
    fn create_proceeding_type(&self, record: &ProceedingType) -> StoreResult<ProceedingTypeId>;
    fn get_proceeding_type(&self, id: ProceedingTypeId) -> StoreResult<Option<ProceedingType>>;
    fn update_proceeding_type(
        &self,
        id: ProceedingTypeId,
        patch: ProceedingTypePatch,
        now: Timestamp,
    ) -> StoreResult<ProceedingType>;
    fn delete_proceeding_type(&self, id: ProceedingTypeId) -> StoreResult<()>;
    fn find_proceeding_types_by_code(&self, code: &str) -> StoreResult<Vec<ProceedingType>>;
    /// Lists proceeding types owned by one matter type.
    ///
    /// Fails with `NotFound` when the matter type itself does not exist.
    fn list_proceeding_types_for_matter_type(
        &self,
        matter_type_id: MatterTypeId,
    ) -> StoreResult<Vec<ProceedingType>>;
    fn list_proceeding_types(&self, query: &ListQuery) -> StoreResult<Vec<ProceedingType>>;
    fn count_proceeding_types(&self) -> StoreResult<u64>;
}

/// SQLite-backed proceeding type repository.
pub struct SqliteProceedingTypeRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteProceedingTypeRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> StoreResult<Self> {
        ensure_connection_ready(conn)?;
        Ok(Self { conn })
    }

    /// Wraps a connection already checked by `ensure_connection_ready`.
    pub(crate) fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl ProceedingTypeRepository for SqliteProceedingTypeRepository<'_> {
    fn create_proceeding_type(&self, record: &ProceedingType) -> StoreResult<ProceedingTypeId> {
        record.validate()?;

        let scope = WriteScope::begin(self.conn)?;
        ensure_matter_type_resolves(&scope, record.matter_type_id)?;
        scope.execute(
            "INSERT INTO proceeding_types (
                id,
                code,
                ccms_code,
                meaning,
                description,
                matter_type_id,
                created_at,
                updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8);",
            params![
                record.id.to_string(),
                record.code.as_str(),
                record.ccms_code.as_str(),
                record.meaning.as_str(),
                record.description.as_str(),
                record.matter_type_id.to_string(),
                record.created_at,
                record.updated_at,
            ],
        )?;
        scope.commit()?;

        Ok(record.id)
    }

    fn get_proceeding_type(&self, id: ProceedingTypeId) -> StoreResult<Option<ProceedingType>> {
        let mut records = collect_proceeding_types(
            self.conn,
            &format!("{PROCEEDING_TYPE_SELECT_SQL} WHERE id = ?"),
            vec![Value::Text(id.to_string())],
        )?;
        Ok(records.pop())
    }

    fn update_proceeding_type(
        &self,
        id: ProceedingTypeId,
        patch: ProceedingTypePatch,
        now: Timestamp,
    ) -> StoreResult<ProceedingType> {
        let scope = WriteScope::begin(self.conn)?;
        let mut record = collect_proceeding_types(
            &scope,
            &format!("{PROCEEDING_TYPE_SELECT_SQL} WHERE id = ?"),
            vec![Value::Text(id.to_string())],
        )?
        .pop()
        .ok_or_else(|| StoreError::not_found(EntityKind::ProceedingType, id))?;

        let reference_changed = record.apply(patch, now);
        record.validate()?;
        if reference_changed {
            ensure_matter_type_resolves(&scope, record.matter_type_id)?;
        }

        scope.execute(
            "UPDATE proceeding_types
             SET
                code = ?2,
                ccms_code = ?3,
                meaning = ?4,
                description = ?5,
                matter_type_id = ?6,
                updated_at = ?7
             WHERE id = ?1;",
            params![
                id.to_string(),
                record.code.as_str(),
                record.ccms_code.as_str(),
                record.meaning.as_str(),
                record.description.as_str(),
                record.matter_type_id.to_string(),
                record.updated_at,
            ],
        )?;
        scope.commit()?;

        Ok(record)
    }

    fn delete_proceeding_type(&self, id: ProceedingTypeId) -> StoreResult<()> {
        let changed = self.conn.execute(
            "DELETE FROM proceeding_types WHERE id = ?1;",
            [id.to_string()],
        )?;
        if changed == 0 {
            return Err(StoreError::not_found(EntityKind::ProceedingType, id));
        }
        Ok(())
    }

    fn find_proceeding_types_by_code(&self, code: &str) -> StoreResult<Vec<ProceedingType>> {
        collect_proceeding_types(
            self.conn,
            &format!("{PROCEEDING_TYPE_SELECT_SQL} WHERE code = ? ORDER BY rowid ASC"),
            vec![Value::Text(code.to_string())],
        )
    }

    fn list_proceeding_types_for_matter_type(
        &self,
        matter_type_id: MatterTypeId,
    ) -> StoreResult<Vec<ProceedingType>> {
        if !matter_type_exists(self.conn, matter_type_id)? {
            return Err(StoreError::not_found(
                EntityKind::MatterType,
                matter_type_id,
            ));
        }
        collect_proceeding_types(
            self.conn,
            &format!("{PROCEEDING_TYPE_SELECT_SQL} WHERE matter_type_id = ? ORDER BY rowid ASC"),
            vec![Value::Text(matter_type_id.to_string())],
        )
    }

    fn list_proceeding_types(&self, query: &ListQuery) -> StoreResult<Vec<ProceedingType>> {
        let mut sql = format!("{PROCEEDING_TYPE_SELECT_SQL} ORDER BY rowid ASC");
        let mut bind_values: Vec<Value> = Vec::new();
        query.push_sql(&mut sql, &mut bind_values);
        collect_proceeding_types(self.conn, &sql, bind_values)
    }

    fn count_proceeding_types(&self) -> StoreResult<u64> {
        count_rows(self.conn, EntityKind::ProceedingType.table())
    }
}

fn ensure_matter_type_resolves(conn: &Connection, id: MatterTypeId) -> StoreResult<()> {
    if !matter_type_exists(conn, id)? {
        return Err(StoreError::DanglingReference {
            field: "matter_type_id",
            id,
        });
    }
    Ok(())
}

fn collect_proceeding_types(
    conn: &Connection,
    sql: &str,
    bind_values: Vec<Value>,
) -> StoreResult<Vec<ProceedingType>> {
    let mut stmt = conn.prepare(sql)?;
    let mut rows = stmt.query(params_from_iter(bind_values))?;
    let mut records = Vec::new();
    while let Some(row) = rows.next()? {
        records.push(parse_proceeding_type_row(row)?);
    }
    Ok(records)
}

fn parse_proceeding_type_row(row: &Row<'_>) -> StoreResult<ProceedingType> {
    let id_text: String = row.get("id")?;
    let matter_type_text: String = row.get("matter_type_id")?;
    let record = ProceedingType {
        id: parse_uuid(&id_text, "proceeding_types.id")?,
        code: row.get("code")?,
        ccms_code: row.get("ccms_code")?,
        meaning: row.get("meaning")?,
        description: row.get("description")?,
        matter_type_id: parse_uuid(&matter_type_text, "proceeding_types.matter_type_id")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    };
    record
        .validate()
        .map_err(|err| StoreError::InvalidData(format!("proceeding type {}: {err}", record.id)))?;
    Ok(record)
}
