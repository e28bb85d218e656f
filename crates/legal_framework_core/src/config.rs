//! Store configuration.
//!
//! # Responsibility
//! - Carry the tunables the embedding application may override.
//! - Deserialize from any serde format with per-key defaults.
//!
//! # Invariants
//! - `StoreConfig::default()` rejects deleting referenced matter types.

use crate::db::DEFAULT_BUSY_TIMEOUT;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// What deleting a matter type does to proceeding types that reference it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatterTypeDeletePolicy {
    /// Fail with `ReferentialConflict` and leave everything unchanged.
    #[default]
    Reject,
    /// Delete the dependent proceeding types in the same transaction.
    Cascade,
}

impl MatterTypeDeletePolicy {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Reject => "reject",
            Self::Cascade => "cascade",
        }
    }
}

/// Entity store settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub delete_policy: MatterTypeDeletePolicy,
    /// How long a writer waits for another connection's transaction.
    pub busy_timeout_ms: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            delete_policy: MatterTypeDeletePolicy::default(),
            busy_timeout_ms: u64::try_from(DEFAULT_BUSY_TIMEOUT.as_millis()).unwrap_or(u64::MAX),
        }
    }
}

impl StoreConfig {
    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }

    pub fn with_delete_policy(mut self, delete_policy: MatterTypeDeletePolicy) -> Self {
        self.delete_policy = delete_policy;
        self
    }
}
