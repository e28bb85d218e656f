//! Error contract shared by every entity repository and the store facade.

use crate::db::DbError;
use crate::model::matter_type::MatterTypeId;
use crate::model::validation::ValidationError;
use rusqlite::{ffi, ErrorCode};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

pub type StoreResult<T> = Result<T, StoreError>;

/// Entity table an error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    MatterType,
    MeritsTask,
    ProceedingType,
}

impl EntityKind {
    /// Backing table name.
    pub fn table(self) -> &'static str {
        match self {
            Self::MatterType => "matter_types",
            Self::MeritsTask => "merits_tasks",
            Self::ProceedingType => "proceeding_types",
        }
    }
}

impl Display for EntityKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::MatterType => "matter type",
            Self::MeritsTask => "merits task",
            Self::ProceedingType => "proceeding type",
        };
        f.write_str(label)
    }
}

/// Errors from entity store operations.
///
/// Every variant is returned before the failing operation commits anything.
#[derive(Debug)]
pub enum StoreError {
    /// Missing or invalid field value.
    Validation(ValidationError),
    /// Another matter type already uses this name.
    UniquenessConflict { field: &'static str, value: String },
    /// `matter_type_id` does not resolve to a matter type.
    DanglingReference {
        field: &'static str,
        id: MatterTypeId,
    },
    /// Matter type delete blocked by referencing proceeding types.
    ReferentialConflict {
        matter_type_id: MatterTypeId,
        dependents: usize,
    },
    /// No record with this id.
    NotFound { entity: EntityKind, id: Uuid },
    /// Underlying SQLite/bootstrap error.
    Db(DbError),
    /// Persisted row cannot be converted into a valid record.
    InvalidData(String),
    /// Connection schema is not at the expected version.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    /// Required table is missing.
    MissingRequiredTable(&'static str),
    /// Required column is missing from expected table.
    MissingRequiredColumn {
        table: &'static str,
        column: &'static str,
    },
}

/// Coarse error category for callers mapping errors to responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreErrorKind {
    Validation,
    UniquenessConflict,
    DanglingReference,
    ReferentialConflict,
    NotFound,
    Storage,
}

impl StoreErrorKind {
    /// Stable machine-readable code, also used as `error_code` in logs.
    pub fn code(self) -> &'static str {
        match self {
            Self::Validation => "validation_error",
            Self::UniquenessConflict => "uniqueness_conflict",
            Self::DanglingReference => "dangling_reference",
            Self::ReferentialConflict => "referential_conflict",
            Self::NotFound => "not_found",
            Self::Storage => "storage_error",
        }
    }

    /// Suggested HTTP status for an application layer surfacing this error.
    pub fn http_status(self) -> u16 {
        match self {
            Self::Validation => 422,
            Self::UniquenessConflict | Self::ReferentialConflict => 409,
            Self::DanglingReference => 422,
            Self::NotFound => 404,
            Self::Storage => 500,
        }
    }
}

impl StoreError {
    pub fn kind(&self) -> StoreErrorKind {
        match self {
            Self::Validation(_) => StoreErrorKind::Validation,
            Self::UniquenessConflict { .. } => StoreErrorKind::UniquenessConflict,
            Self::DanglingReference { .. } => StoreErrorKind::DanglingReference,
            Self::ReferentialConflict { .. } => StoreErrorKind::ReferentialConflict,
            Self::NotFound { .. } => StoreErrorKind::NotFound,
            Self::Db(_)
            | Self::InvalidData(_)
            | Self::UninitializedConnection { .. }
            | Self::MissingRequiredTable(_)
            | Self::MissingRequiredColumn { .. } => StoreErrorKind::Storage,
        }
    }

    pub fn not_found(entity: EntityKind, id: Uuid) -> Self {
        Self::NotFound { entity, id }
    }
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::UniquenessConflict { field, value } => {
                write!(f, "`{field}` value `{value}` is already taken")
            }
            Self::DanglingReference { field, id } => {
                write!(f, "`{field}` references missing matter type {id}")
            }
            Self::ReferentialConflict {
                matter_type_id,
                dependents,
            } => write!(
                f,
                "matter type {matter_type_id} is referenced by {dependents} proceeding type(s)"
            ),
            Self::NotFound { entity, id } => write!(f, "{entity} not found: {id}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "entity store requires schema version {expected_version}, got {actual_version}"
            ),
            Self::MissingRequiredTable(table) => {
                write!(f, "entity store requires table `{table}`")
            }
            Self::MissingRequiredColumn { table, column } => write!(
                f,
                "entity store requires column `{column}` in table `{table}`"
            ),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            Self::UniquenessConflict { .. }
            | Self::DanglingReference { .. }
            | Self::ReferentialConflict { .. }
            | Self::NotFound { .. }
            | Self::InvalidData(_)
            | Self::UninitializedConnection { .. }
            | Self::MissingRequiredTable(_)
            | Self::MissingRequiredColumn { .. } => None,
        }
    }
}

impl From<ValidationError> for StoreError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for StoreError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

const NAME_INDEX_COLUMN: &str = "matter_types.name";

/// Maps a unique-index violation on `matter_types.name` to a conflict.
///
/// Reached only when another connection commits the same name between the
/// pre-check and the write. Primary key collisions and any other failure
/// pass through as `Db`.
pub(crate) fn map_name_conflict(err: rusqlite::Error, name: &str) -> StoreError {
    if is_name_unique_violation(&err) {
        return StoreError::UniquenessConflict {
            field: "name",
            value: name.to_string(),
        };
    }
    err.into()
}

fn is_name_unique_violation(err: &rusqlite::Error) -> bool {
    match err {
        rusqlite::Error::SqliteFailure(code, Some(message)) => {
            code.code == ErrorCode::ConstraintViolation
                && code.extended_code == ffi::SQLITE_CONSTRAINT_UNIQUE
                && message.contains(NAME_INDEX_COLUMN)
        }
        _ => false,
    }
}
