//! Matter type model.
//!
//! # Responsibility
//! - Define the category of legal matter and its income/capital waiver flags.
//! - Apply partial updates without touching identity or `created_at`.
//!
//! # Invariants
//! - `name` is required and unique across matter types. Uniqueness is
//!   case-sensitive and byte-exact; it is enforced by the repository, not here.
//! - Waiver flags default to `false` and are never absent.

use crate::model::validation::{require_text, require_timestamp_order, ValidationError};
use crate::model::{advance_timestamp, Timestamp};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type MatterTypeId = Uuid;

/// Persisted matter type record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatterType {
    pub id: MatterTypeId,
    pub name: String,
    pub upper_gross_income_waiver: bool,
    pub upper_disposable_income_waiver: bool,
    pub upper_capital_waiver: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Create input for a matter type.
///
/// Waiver flags are `false` unless set explicitly.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NewMatterType {
    pub name: String,
    pub upper_gross_income_waiver: bool,
    pub upper_disposable_income_waiver: bool,
    pub upper_capital_waiver: bool,
}

impl NewMatterType {
    /// Creates input with every waiver flag off.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}

/// Partial update for a matter type. `None` leaves the field unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatterTypePatch {
    pub name: Option<String>,
    pub upper_gross_income_waiver: Option<bool>,
    pub upper_disposable_income_waiver: Option<bool>,
    pub upper_capital_waiver: Option<bool>,
}

impl MatterType {
    /// Builds a record from create input with both timestamps at `now`.
    pub fn from_new(id: MatterTypeId, input: NewMatterType, now: Timestamp) -> Self {
        Self {
            id,
            name: input.name,
            upper_gross_income_waiver: input.upper_gross_income_waiver,
            upper_disposable_income_waiver: input.upper_disposable_income_waiver,
            upper_capital_waiver: input.upper_capital_waiver,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        require_text("name", &self.name)?;
        require_timestamp_order(self.created_at, self.updated_at)
    }

    /// Applies `patch` and advances `updated_at`.
    ///
    /// Returns `true` when `name` changed, so callers know to re-check
    /// uniqueness.
    pub fn apply(&mut self, patch: MatterTypePatch, now: Timestamp) -> bool {
        let mut name_changed = false;
        if let Some(name) = patch.name {
            name_changed = name != self.name;
            self.name = name;
        }
        if let Some(value) = patch.upper_gross_income_waiver {
            self.upper_gross_income_waiver = value;
        }
        if let Some(value) = patch.upper_disposable_income_waiver {
            self.upper_disposable_income_waiver = value;
        }
        if let Some(value) = patch.upper_capital_waiver {
            self.upper_capital_waiver = value;
        }
        self.updated_at = advance_timestamp(self.updated_at, now);
        name_changed
    }
}
