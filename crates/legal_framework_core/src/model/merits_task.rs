//! Merits task model.
//!
//! Merits tasks share one table and are told apart by the `type`
//! discriminator column, which stores the variant's class-style name.
//!
//! # Invariants
//! - `name` is required.
//! - `type` holds exactly one of the `MeritsTaskKind` stored names.

use crate::model::validation::{
    require_text, require_timestamp_order, ValidationError, ValidationRule,
};
use crate::model::{advance_timestamp, Timestamp};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use uuid::Uuid;

pub type MeritsTaskId = Uuid;

/// Concrete merits task variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MeritsTaskKind {
    /// Task answered once per application.
    ApplicationTask,
    /// Task answered once per proceeding on the application.
    ProceedingTask,
}

impl MeritsTaskKind {
    pub const ALL: [MeritsTaskKind; 2] = [Self::ApplicationTask, Self::ProceedingTask];

    /// Value stored in `merits_tasks.type`.
    pub fn as_db_str(self) -> &'static str {
        match self {
            Self::ApplicationTask => "ApplicationTask",
            Self::ProceedingTask => "ProceedingTask",
        }
    }

    pub fn from_db_str(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_db_str() == value)
    }
}

impl Display for MeritsTaskKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_db_str())
    }
}

impl FromStr for MeritsTaskKind {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::from_db_str(value).ok_or_else(|| {
            ValidationError::new("type", ValidationRule::UnknownVariant(value.to_string()))
        })
    }
}

/// Persisted merits task record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeritsTask {
    pub id: MeritsTaskId,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: MeritsTaskKind,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Create input for a merits task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewMeritsTask {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: MeritsTaskKind,
}

impl NewMeritsTask {
    pub fn new(name: impl Into<String>, kind: MeritsTaskKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }
}

/// Partial update for a merits task. `None` leaves the field unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MeritsTaskPatch {
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<MeritsTaskKind>,
}

impl MeritsTask {
    pub fn from_new(id: MeritsTaskId, input: NewMeritsTask, now: Timestamp) -> Self {
        Self {
            id,
            name: input.name,
            kind: input.kind,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        require_text("name", &self.name)?;
        require_timestamp_order(self.created_at, self.updated_at)
    }

    pub fn apply(&mut self, patch: MeritsTaskPatch, now: Timestamp) {
        if let Some(name) = patch.name {
            self.name = name;
        }
        if let Some(kind) = patch.kind {
            self.kind = kind;
        }
        self.updated_at = advance_timestamp(self.updated_at, now);
    }
}

#[cfg(test)]
mod tests {
    use super::{MeritsTask, MeritsTaskKind, NewMeritsTask};
    use crate::model::validation::ValidationRule;
    use uuid::Uuid;

    #[test]
    fn kind_parses_stored_names_only() {
        assert_eq!(
            "ProceedingTask".parse::<MeritsTaskKind>().unwrap(),
            MeritsTaskKind::ProceedingTask
        );

        let err = "proceeding_task".parse::<MeritsTaskKind>().unwrap_err();
        assert_eq!(err.field, "type");
        assert_eq!(
            err.rule,
            ValidationRule::UnknownVariant("proceeding_task".to_string())
        );
    }

    #[test]
    fn record_serializes_kind_as_type() {
        let task = MeritsTask::from_new(
            Uuid::nil(),
            NewMeritsTask::new("chances_of_success", MeritsTaskKind::ProceedingTask),
            7,
        );
        let json = serde_json::to_value(&task).unwrap();
        assert_eq!(json["type"], "ProceedingTask");
        assert_eq!(json["created_at"], 7);
    }
}
