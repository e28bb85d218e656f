//! Time source for record timestamps.

use crate::model::Timestamp;
use std::time::{SystemTime, UNIX_EPOCH};

/// Supplies the current instant in epoch microseconds.
pub trait Clock: Send + Sync {
    fn now(&self) -> Timestamp;
}

/// Wall clock backed by `SystemTime`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        // Pre-epoch clocks collapse to 0; record ordering is still protected
        // by `advance_timestamp`.
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| i64::try_from(elapsed.as_micros()).unwrap_or(i64::MAX))
            .unwrap_or(0)
    }
}
