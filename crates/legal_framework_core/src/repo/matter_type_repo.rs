//! Matter type repository contract and SQLite implementation.
//!
//! # Responsibility
//! - Provide CRUD and name lookup over `matter_types`.
//! - Apply the configured delete policy to referencing proceeding types.
//!
//! # Invariants
//! - Names are compared case-sensitively and byte-exactly, the same way the
//!   unique index `index_matter_types_on_name` compares them.
//! - The name pre-check and the write share one `WriteScope`; the unique
//!   index stays as the backstop and is reported as `UniquenessConflict`.
//! - A rejected delete leaves the matter type and its dependents unchanged.

use crate::config::MatterTypeDeletePolicy;
use crate::model::matter_type::{MatterType, MatterTypeId, MatterTypePatch};
use crate::model::Timestamp;
use crate::repo::error::map_name_conflict;
use crate::repo::{
    bool_to_int, count_rows, ensure_connection_ready, parse_flag, parse_uuid, EntityKind,
    ListQuery, StoreError, StoreResult, WriteScope,
};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};

const MATTER_TYPE_SELECT_SQL: &str = "SELECT
    id,
    name,
    upper_gross_income_waiver,
    upper_disposable_income_waiver,
    upper_capital_waiver,
    created_at,
    updated_at
FROM matter_types";

/// Repository interface for matter types.
pub trait MatterTypeRepository {
    /// Inserts a fully built record and returns its id.
    fn create_matter_type(&self, record: &MatterType) -> StoreResult<MatterTypeId>;
    fn get_matter_type(&self, id: MatterTypeId) -> StoreResult<Option<MatterType>>;
    /// Applies `patch` atomically and returns the stored result.
    fn update_matter_type(
        &self,
        id: MatterTypeId,
        patch: MatterTypePatch,
        now: Timestamp,
    ) -> StoreResult<MatterType>;
    /// Deletes one matter type and returns how many proceeding types were
    /// removed along with it.
    fn delete_matter_type(
        &self,
        id: MatterTypeId,
        policy: MatterTypeDeletePolicy,
    ) -> StoreResult<usize>;
    fn find_matter_type_by_name(&self, name: &str) -> StoreResult<Option<MatterType>>;
    fn list_matter_types(&self, query: &ListQuery) -> StoreResult<Vec<MatterType>>;
    fn count_matter_types(&self) -> StoreResult<u64>;
}

/// SQLite-backed matter type repository.
pub struct SqliteMatterTypeRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteMatterTypeRepository<'conn> {
    /// Constructs a repository from a connection with the schema loaded.
    pub fn try_new(conn: &'conn Connection) -> StoreResult<Self> {
        ensure_connection_ready(conn)?;
        Ok(Self { conn })
    }

    /// Wraps a connection already checked by `ensure_connection_ready`.
    pub(crate) fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl MatterTypeRepository for SqliteMatterTypeRepository<'_> {
    fn create_matter_type(&self, record: &MatterType) -> StoreResult<MatterTypeId> {
        record.validate()?;

        let scope = WriteScope::begin(self.conn)?;
        ensure_name_available(&scope, &record.name, None)?;
        scope
            .execute(
                "INSERT INTO matter_types (
                    id,
                    name,
                    upper_gross_income_waiver,
                    upper_disposable_income_waiver,
                    upper_capital_waiver,
                    created_at,
                    updated_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7);",
                params![
                    record.id.to_string(),
                    record.name.as_str(),
                    bool_to_int(record.upper_gross_income_waiver),
                    bool_to_int(record.upper_disposable_income_waiver),
                    bool_to_int(record.upper_capital_waiver),
                    record.created_at,
                    record.updated_at,
                ],
            )
            .map_err(|err| map_name_conflict(err, &record.name))?;
        scope.commit()?;

        Ok(record.id)
    }

    fn get_matter_type(&self, id: MatterTypeId) -> StoreResult<Option<MatterType>> {
        load_matter_type(self.conn, id)
    }

    fn update_matter_type(
        &self,
        id: MatterTypeId,
        patch: MatterTypePatch,
        now: Timestamp,
    ) -> StoreResult<MatterType> {
        let scope = WriteScope::begin(self.conn)?;
        let mut record = load_matter_type(&scope, id)?
            .ok_or_else(|| StoreError::not_found(EntityKind::MatterType, id))?;

        let name_changed = record.apply(patch, now);
        record.validate()?;
        if name_changed {
            ensure_name_available(&scope, &record.name, Some(id))?;
        }

        scope
            .execute(
                "UPDATE matter_types
                 SET
                    name = ?2,
                    upper_gross_income_waiver = ?3,
                    upper_disposable_income_waiver = ?4,
                    upper_capital_waiver = ?5,
                    updated_at = ?6
                 WHERE id = ?1;",
                params![
                    id.to_string(),
                    record.name.as_str(),
                    bool_to_int(record.upper_gross_income_waiver),
                    bool_to_int(record.upper_disposable_income_waiver),
                    bool_to_int(record.upper_capital_waiver),
                    record.updated_at,
                ],
            )
            .map_err(|err| map_name_conflict(err, &record.name))?;
        scope.commit()?;

        Ok(record)
    }

    fn delete_matter_type(
        &self,
        id: MatterTypeId,
        policy: MatterTypeDeletePolicy,
    ) -> StoreResult<usize> {
        let scope = WriteScope::begin(self.conn)?;
        if !matter_type_exists(&scope, id)? {
            return Err(StoreError::not_found(EntityKind::MatterType, id));
        }

        let dependents: i64 = scope.query_row(
            "SELECT COUNT(*) FROM proceeding_types WHERE matter_type_id = ?1;",
            [id.to_string()],
            |row| row.get(0),
        )?;
        let dependents = usize::try_from(dependents).map_err(|_| {
            StoreError::InvalidData("negative dependent count in proceeding_types".to_string())
        })?;

        let mut cascaded = 0;
        if dependents > 0 {
            match policy {
                MatterTypeDeletePolicy::Reject => {
                    return Err(StoreError::ReferentialConflict {
                        matter_type_id: id,
                        dependents,
                    });
                }
                MatterTypeDeletePolicy::Cascade => {
                    cascaded = scope.execute(
                        "DELETE FROM proceeding_types WHERE matter_type_id = ?1;",
                        [id.to_string()],
                    )?;
                }
            }
        }

        scope.execute("DELETE FROM matter_types WHERE id = ?1;", [id.to_string()])?;
        scope.commit()?;

        Ok(cascaded)
    }

    fn find_matter_type_by_name(&self, name: &str) -> StoreResult<Option<MatterType>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{MATTER_TYPE_SELECT_SQL} WHERE name = ?1;"))?;
        let mut rows = stmt.query([name])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_matter_type_row(row)?));
        }
        Ok(None)
    }

    fn list_matter_types(&self, query: &ListQuery) -> StoreResult<Vec<MatterType>> {
        let mut sql = format!("{MATTER_TYPE_SELECT_SQL} ORDER BY rowid ASC");
        let mut bind_values: Vec<Value> = Vec::new();
        query.push_sql(&mut sql, &mut bind_values);

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut records = Vec::new();
        while let Some(row) = rows.next()? {
            records.push(parse_matter_type_row(row)?);
        }
        Ok(records)
    }

    fn count_matter_types(&self) -> StoreResult<u64> {
        count_rows(self.conn, EntityKind::MatterType.table())
    }
}

/// Returns whether a matter type with `id` exists.
///
/// Callers that write based on the answer must ask inside their `WriteScope`.
pub(crate) fn matter_type_exists(conn: &Connection, id: MatterTypeId) -> StoreResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM matter_types WHERE id = ?1);",
        [id.to_string()],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

fn load_matter_type(conn: &Connection, id: MatterTypeId) -> StoreResult<Option<MatterType>> {
    let mut stmt = conn.prepare(&format!("{MATTER_TYPE_SELECT_SQL} WHERE id = ?1;"))?;
    let mut rows = stmt.query([id.to_string()])?;
    if let Some(row) = rows.next()? {
        return Ok(Some(parse_matter_type_row(row)?));
    }
    Ok(None)
}

fn ensure_name_available(
    conn: &Connection,
    name: &str,
    except: Option<MatterTypeId>,
) -> StoreResult<()> {
    let holder: Option<String> = conn
        .query_row(
            "SELECT id FROM matter_types WHERE name = ?1;",
            [name],
            |row| row.get(0),
        )
        .optional()?;

    match holder {
        Some(holder_id) if except.map_or(true, |id| id.to_string() != holder_id) => {
            Err(StoreError::UniquenessConflict {
                field: "name",
                value: name.to_string(),
            })
        }
        _ => Ok(()),
    }
}

fn parse_matter_type_row(row: &Row<'_>) -> StoreResult<MatterType> {
    let id_text: String = row.get("id")?;
    let record = MatterType {
        id: parse_uuid(&id_text, "matter_types.id")?,
        name: row.get("name")?,
        upper_gross_income_waiver: parse_flag(
            row.get("upper_gross_income_waiver")?,
            "matter_types.upper_gross_income_waiver",
        )?,
        upper_disposable_income_waiver: parse_flag(
            row.get("upper_disposable_income_waiver")?,
            "matter_types.upper_disposable_income_waiver",
        )?,
        upper_capital_waiver: parse_flag(
            row.get("upper_capital_waiver")?,
            "matter_types.upper_capital_waiver",
        )?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    };
    record
        .validate()
        .map_err(|err| StoreError::InvalidData(format!("matter type {}: {err}", record.id)))?;
    Ok(record)
}
