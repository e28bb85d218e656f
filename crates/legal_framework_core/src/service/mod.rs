//! Store use-case services.
//!
//! # Responsibility
//! - Turn create inputs and patches into records (ids, timestamps).
//! - Keep callers decoupled from repository and SQL details.

pub mod entity_store;
