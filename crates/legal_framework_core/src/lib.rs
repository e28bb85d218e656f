//! Entity store for legal framework reference data.
//!
//! Persists matter types, merits tasks and proceeding types, and enforces
//! their uniqueness, non-null and referential rules at the store boundary.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use config::{MatterTypeDeletePolicy, StoreConfig};
pub use logging::{init_logging, logging_status, LogLevel, LoggingConfig, LoggingError};
pub use model::clock::{Clock, SystemClock};
pub use model::id::{IdGenerator, RandomIdGenerator};
pub use model::matter_type::{MatterType, MatterTypeId, MatterTypePatch, NewMatterType};
pub use model::merits_task::{
    MeritsTask, MeritsTaskId, MeritsTaskKind, MeritsTaskPatch, NewMeritsTask,
};
pub use model::proceeding_type::{
    NewProceedingType, ProceedingType, ProceedingTypeId, ProceedingTypePatch,
};
pub use model::validation::{ValidationError, ValidationRule};
pub use model::Timestamp;
pub use repo::matter_type_repo::{MatterTypeRepository, SqliteMatterTypeRepository};
pub use repo::merits_task_repo::{MeritsTaskRepository, SqliteMeritsTaskRepository};
pub use repo::proceeding_type_repo::{ProceedingTypeRepository, SqliteProceedingTypeRepository};
pub use repo::{EntityKind, ListQuery, StoreError, StoreErrorKind, StoreResult};
pub use service::entity_store::{EntityCounts, EntityStore};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
