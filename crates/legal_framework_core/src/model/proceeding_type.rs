//! Proceeding type model.
//!
//! # Invariants
//! - `code`, `ccms_code`, `meaning` and `description` are required.
//! - `matter_type_id` always names an existing matter type at write time;
//!   the repository enforces this, the model only carries the id.

use crate::model::matter_type::MatterTypeId;
use crate::model::validation::{require_text, require_timestamp_order, ValidationError};
use crate::model::{advance_timestamp, Timestamp};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type ProceedingTypeId = Uuid;

/// Persisted proceeding type record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProceedingType {
    pub id: ProceedingTypeId,
    /// Lookup code; not unique.
    pub code: String,
    /// Code of the same proceeding in CCMS.
    pub ccms_code: String,
    pub meaning: String,
    pub description: String,
    pub matter_type_id: MatterTypeId,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Create input for a proceeding type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewProceedingType {
    pub code: String,
    pub ccms_code: String,
    pub meaning: String,
    pub description: String,
    pub matter_type_id: MatterTypeId,
}

/// Partial update for a proceeding type. `None` leaves the field unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProceedingTypePatch {
    pub code: Option<String>,
    pub ccms_code: Option<String>,
    pub meaning: Option<String>,
    pub description: Option<String>,
    pub matter_type_id: Option<MatterTypeId>,
}

impl ProceedingType {
    pub fn from_new(id: ProceedingTypeId, input: NewProceedingType, now: Timestamp) -> Self {
        Self {
            id,
            code: input.code,
            ccms_code: input.ccms_code,
            meaning: input.meaning,
            description: input.description,
            matter_type_id: input.matter_type_id,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        require_text("code", &self.code)?;
        require_text("ccms_code", &self.ccms_code)?;
        require_text("meaning", &self.meaning)?;
        require_text("description", &self.description)?;
        require_timestamp_order(self.created_at, self.updated_at)
    }

    /// Applies `patch` and advances `updated_at`.
    ///
    /// Returns `true` when `matter_type_id` changed and must be resolved again.
    pub fn apply(&mut self, patch: ProceedingTypePatch, now: Timestamp) -> bool {
        if let Some(code) = patch.code {
            self.code = code;
        }
        if let Some(ccms_code) = patch.ccms_code {
            self.ccms_code = ccms_code;
        }
        if let Some(meaning) = patch.meaning {
            self.meaning = meaning;
        }
        if let Some(description) = patch.description {
            self.description = description;
        }
        let mut reference_changed = false;
        if let Some(matter_type_id) = patch.matter_type_id {
            reference_changed = matter_type_id != self.matter_type_id;
            self.matter_type_id = matter_type_id;
        }
        self.updated_at = advance_timestamp(self.updated_at, now);
        reference_changed
    }
}

#[cfg(test)]
mod tests {
    use super::{NewProceedingType, ProceedingType, ProceedingTypePatch};
    use uuid::Uuid;

    fn sample(matter_type_id: Uuid) -> ProceedingType {
        ProceedingType::from_new(
            Uuid::new_v4(),
            NewProceedingType {
                code: "PR0208".to_string(),
                ccms_code: "DA004".to_string(),
                meaning: "Non-molestation order".to_string(),
                description: "to be represented on an application for a non-molestation order."
                    .to_string(),
                matter_type_id,
            },
            100,
        )
    }

    #[test]
    fn validate_names_first_blank_field() {
        let mut record = sample(Uuid::new_v4());
        record.meaning = String::new();
        record.description = String::new();
        assert_eq!(record.validate().unwrap_err().field, "meaning");
    }

    #[test]
    fn apply_flags_reference_change_only_for_new_target() {
        let owner = Uuid::new_v4();
        let mut record = sample(owner);

        let same_target = ProceedingTypePatch {
            matter_type_id: Some(owner),
            ..ProceedingTypePatch::default()
        };
        assert!(!record.apply(same_target, 200));

        let other_target = ProceedingTypePatch {
            matter_type_id: Some(Uuid::new_v4()),
            ..ProceedingTypePatch::default()
        };
        assert!(record.apply(other_target, 300));
        assert_eq!(record.created_at, 100);
        assert_eq!(record.updated_at, 300);
    }
}
