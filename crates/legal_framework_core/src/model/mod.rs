//! Entity records for the legal framework reference tables.
//!
//! # Responsibility
//! - Define canonical record shapes for matter types, merits tasks and
//!   proceeding types.
//! - Define create inputs and partial-update patches per entity.
//! - Own field-level validation that does not need storage access.
//!
//! # Invariants
//! - Every record is identified by a stable UUID that is never reused.
//! - `updated_at >= created_at` on every record.
//! - Required text fields are never blank.

pub mod clock;
pub mod id;
pub mod matter_type;
pub mod merits_task;
pub mod proceeding_type;
pub mod validation;

/// Unix epoch microseconds.
///
/// Microseconds mirror the `precision: 6` timestamps of the reference schema.
pub type Timestamp = i64;

/// Returns the `updated_at` value for a mutation observed at `now`.
///
/// Never moves backwards from `previous`, so a stepped-back wall clock cannot
/// produce `updated_at < created_at`.
pub fn advance_timestamp(previous: Timestamp, now: Timestamp) -> Timestamp {
    previous.max(now)
}
