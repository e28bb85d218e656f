//! Entity store facade.
//!
//! # Responsibility
//! - Expose create/read/update/delete and lookups for matter types, merits
//!   tasks and proceeding types behind one contract.
//! - Generate identifiers and timestamps through pluggable strategies.
//! - Emit one metadata-only log event per write.
//!
//! # Invariants
//! - `read_*` maps a missing record to `StoreError::NotFound`.
//! - `created_at` is set once by `create_*`; `update_*` only advances
//!   `updated_at`.
//! - Every write is all-or-nothing; `in_transaction` extends that to a group
//!   of writes.
//!
//! # Concurrency
//! One `EntityStore` owns one SQLite connection and is `Send`, not `Sync`.
//! Concurrent callers open one store each over the same database file; writes
//! take the database write lock up front and wait for each other up to
//! `StoreConfig::busy_timeout_ms`.

use crate::config::StoreConfig;
use crate::db::{open_db_in_memory_with_busy_timeout, open_db_with_busy_timeout};
use crate::model::clock::{Clock, SystemClock};
use crate::model::id::{IdGenerator, RandomIdGenerator};
use crate::model::matter_type::{MatterType, MatterTypeId, MatterTypePatch, NewMatterType};
use crate::model::merits_task::{
    MeritsTask, MeritsTaskId, MeritsTaskKind, MeritsTaskPatch, NewMeritsTask,
};
use crate::model::proceeding_type::{
    NewProceedingType, ProceedingType, ProceedingTypeId, ProceedingTypePatch,
};
use crate::repo::matter_type_repo::{MatterTypeRepository, SqliteMatterTypeRepository};
use crate::repo::merits_task_repo::{MeritsTaskRepository, SqliteMeritsTaskRepository};
use crate::repo::proceeding_type_repo::{
    ProceedingTypeRepository, SqliteProceedingTypeRepository,
};
use crate::repo::{
    ensure_connection_ready, EntityKind, ListQuery, StoreError, StoreErrorKind, StoreResult,
    WriteScope,
};
use log::{error, info, warn};
use rusqlite::Connection;
use std::path::Path;
use std::time::Instant;
use uuid::Uuid;

/// Row counts per entity table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EntityCounts {
    pub matter_types: u64,
    pub merits_tasks: u64,
    pub proceeding_types: u64,
}

/// Constraint-enforcing store over the three reference tables.
pub struct EntityStore {
    conn: Connection,
    config: StoreConfig,
    ids: Box<dyn IdGenerator>,
    clock: Box<dyn Clock>,
}

impl EntityStore {
    /// Opens (creating if needed) a database file.
    pub fn open(path: impl AsRef<Path>, config: StoreConfig) -> StoreResult<Self> {
        let conn = open_db_with_busy_timeout(path, config.busy_timeout())?;
        Self::from_connection(conn, config)
    }

    /// Opens a private in-memory database.
    pub fn open_in_memory(config: StoreConfig) -> StoreResult<Self> {
        let conn = open_db_in_memory_with_busy_timeout(config.busy_timeout())?;
        Self::from_connection(conn, config)
    }

    /// Wraps a connection returned by `db::open_db*`.
    ///
    /// Fails when the connection does not carry the loaded schema.
    pub fn from_connection(conn: Connection, config: StoreConfig) -> StoreResult<Self> {
        ensure_connection_ready(&conn)?;
        Ok(Self {
            conn,
            config,
            ids: Box::new(RandomIdGenerator),
            clock: Box::new(SystemClock),
        })
    }

    /// Replaces the identifier strategy.
    pub fn with_id_generator(mut self, ids: impl IdGenerator + 'static) -> Self {
        self.ids = Box::new(ids);
        self
    }

    /// Replaces the time source.
    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Underlying connection, for callers that manage their own transactions.
    ///
    /// Store writes issued while a caller transaction is open run as
    /// savepoints inside it. Begin that transaction with `BEGIN IMMEDIATE`
    /// to keep the store's check-then-write guarantees.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Runs `f` as one atomic unit.
    ///
    /// Nothing `f` wrote is kept when it returns an error.
    pub fn in_transaction<T>(&self, f: impl FnOnce(&Self) -> StoreResult<T>) -> StoreResult<T> {
        let scope = WriteScope::begin(&self.conn)?;
        let value = f(self)?;
        scope.commit()?;
        Ok(value)
    }

    pub fn counts(&self) -> StoreResult<EntityCounts> {
        Ok(EntityCounts {
            matter_types: self.matter_types().count_matter_types()?,
            merits_tasks: self.merits_tasks().count_merits_tasks()?,
            proceeding_types: self.proceeding_types().count_proceeding_types()?,
        })
    }

    // Matter types.

    pub fn create_matter_type(&self, input: NewMatterType) -> StoreResult<MatterType> {
        let started_at = Instant::now();
        let record = MatterType::from_new(self.ids.next_id(), input, self.clock.now());
        let result = self
            .matter_types()
            .create_matter_type(&record)
            .map(|_| record);
        finish_write("matter_type_create", None, started_at, result)
    }

    pub fn read_matter_type(&self, id: MatterTypeId) -> StoreResult<MatterType> {
        self.matter_types()
            .get_matter_type(id)?
            .ok_or_else(|| StoreError::not_found(EntityKind::MatterType, id))
    }

    pub fn update_matter_type(
        &self,
        id: MatterTypeId,
        patch: MatterTypePatch,
    ) -> StoreResult<MatterType> {
        let started_at = Instant::now();
        let result = self
            .matter_types()
            .update_matter_type(id, patch, self.clock.now());
        finish_write("matter_type_update", Some(id), started_at, result)
    }

    /// Deletes a matter type under the configured delete policy.
    ///
    /// Returns the number of proceeding types removed with it (always 0
    /// under `MatterTypeDeletePolicy::Reject`).
    pub fn delete_matter_type(&self, id: MatterTypeId) -> StoreResult<usize> {
        let started_at = Instant::now();
        let policy = self.config.delete_policy;
        let result = self.matter_types().delete_matter_type(id, policy);
        if let Ok(cascaded) = &result {
            if *cascaded > 0 {
                info!(
                    "event=matter_type_cascade module=store status=ok id={id} policy={} removed={cascaded}",
                    policy.as_str()
                );
            }
        }
        finish_write("matter_type_delete", Some(id), started_at, result)
    }

    pub fn find_matter_type_by_name(&self, name: &str) -> StoreResult<Option<MatterType>> {
        self.matter_types().find_matter_type_by_name(name)
    }

    pub fn list_matter_types(&self, query: &ListQuery) -> StoreResult<Vec<MatterType>> {
        self.matter_types().list_matter_types(query)
    }

    // Merits tasks.

    pub fn create_merits_task(&self, input: NewMeritsTask) -> StoreResult<MeritsTask> {
        let started_at = Instant::now();
        let record = MeritsTask::from_new(self.ids.next_id(), input, self.clock.now());
        let result = self
            .merits_tasks()
            .create_merits_task(&record)
            .map(|_| record);
        finish_write("merits_task_create", None, started_at, result)
    }

    pub fn read_merits_task(&self, id: MeritsTaskId) -> StoreResult<MeritsTask> {
        self.merits_tasks()
            .get_merits_task(id)?
            .ok_or_else(|| StoreError::not_found(EntityKind::MeritsTask, id))
    }

    pub fn update_merits_task(
        &self,
        id: MeritsTaskId,
        patch: MeritsTaskPatch,
    ) -> StoreResult<MeritsTask> {
        let started_at = Instant::now();
        let result = self
            .merits_tasks()
            .update_merits_task(id, patch, self.clock.now());
        finish_write("merits_task_update", Some(id), started_at, result)
    }

    pub fn delete_merits_task(&self, id: MeritsTaskId) -> StoreResult<()> {
        let started_at = Instant::now();
        let result = self.merits_tasks().delete_merits_task(id);
        finish_write("merits_task_delete", Some(id), started_at, result)
    }

    pub fn list_merits_tasks(&self, query: &ListQuery) -> StoreResult<Vec<MeritsTask>> {
        self.merits_tasks().list_merits_tasks(query)
    }

    pub fn find_merits_tasks_by_kind(&self, kind: MeritsTaskKind) -> StoreResult<Vec<MeritsTask>> {
        self.merits_tasks().find_merits_tasks_by_kind(kind)
    }

    // Proceeding types.

    pub fn create_proceeding_type(&self, input: NewProceedingType) -> StoreResult<ProceedingType> {
        let started_at = Instant::now();
        let record = ProceedingType::from_new(self.ids.next_id(), input, self.clock.now());
        let result = self
            .proceeding_types()
            .create_proceeding_type(&record)
            .map(|_| record);
        finish_write("proceeding_type_create", None, started_at, result)
    }

    pub fn read_proceeding_type(&self, id: ProceedingTypeId) -> StoreResult<ProceedingType> {
        self.proceeding_types()
            .get_proceeding_type(id)?
            .ok_or_else(|| StoreError::not_found(EntityKind::ProceedingType, id))
    }

    pub fn update_proceeding_type(
        &self,
        id: ProceedingTypeId,
        patch: ProceedingTypePatch,
    ) -> StoreResult<ProceedingType> {
        let started_at = Instant::now();
        let result = self
            .proceeding_types()
            .update_proceeding_type(id, patch, self.clock.now());
        finish_write("proceeding_type_update", Some(id), started_at, result)
    }

    pub fn delete_proceeding_type(&self, id: ProceedingTypeId) -> StoreResult<()> {
        let started_at = Instant::now();
        let result = self.proceeding_types().delete_proceeding_type(id);
        finish_write("proceeding_type_delete", Some(id), started_at, result)
    }

    /// All proceeding types with `code`, in insertion order.
    pub fn find_proceeding_types_by_code(&self, code: &str) -> StoreResult<Vec<ProceedingType>> {
        self.proceeding_types().find_proceeding_types_by_code(code)
    }

    pub fn list_proceeding_types_for_matter_type(
        &self,
        matter_type_id: MatterTypeId,
    ) -> StoreResult<Vec<ProceedingType>> {
        self.proceeding_types()
            .list_proceeding_types_for_matter_type(matter_type_id)
    }

    pub fn list_proceeding_types(&self, query: &ListQuery) -> StoreResult<Vec<ProceedingType>> {
        self.proceeding_types().list_proceeding_types(query)
    }

    fn matter_types(&self) -> SqliteMatterTypeRepository<'_> {
        SqliteMatterTypeRepository::new(&self.conn)
    }

    fn merits_tasks(&self) -> SqliteMeritsTaskRepository<'_> {
        SqliteMeritsTaskRepository::new(&self.conn)
    }

    fn proceeding_types(&self) -> SqliteProceedingTypeRepository<'_> {
        SqliteProceedingTypeRepository::new(&self.conn)
    }
}

/// Logs the outcome of one write and hands the result back unchanged.
fn finish_write<T: WrittenId>(
    event: &'static str,
    id: Option<Uuid>,
    started_at: Instant,
    result: StoreResult<T>,
) -> StoreResult<T> {
    let duration_ms = started_at.elapsed().as_millis();
    match &result {
        Ok(value) => {
            let id = value.written_id().or(id).unwrap_or_default();
            info!("event={event} module=store status=ok id={id} duration_ms={duration_ms}");
        }
        Err(err) if err.kind() == StoreErrorKind::Storage => {
            error!(
                "event={event} module=store status=error error_code={} duration_ms={duration_ms} error={err}",
                err.kind().code()
            );
        }
        Err(err) => {
            warn!(
                "event={event} module=store status=rejected error_code={} duration_ms={duration_ms}",
                err.kind().code()
            );
        }
    }
    result
}

/// Id of the record a successful write produced, when the result carries one.
trait WrittenId {
    fn written_id(&self) -> Option<Uuid>;
}

impl WrittenId for MatterType {
    fn written_id(&self) -> Option<Uuid> {
        Some(self.id)
    }
}

impl WrittenId for MeritsTask {
    fn written_id(&self) -> Option<Uuid> {
        Some(self.id)
    }
}

impl WrittenId for ProceedingType {
    fn written_id(&self) -> Option<Uuid> {
        Some(self.id)
    }
}

impl WrittenId for usize {
    fn written_id(&self) -> Option<Uuid> {
        None
    }
}

impl WrittenId for () {
    fn written_id(&self) -> Option<Uuid> {
        None
    }
}
