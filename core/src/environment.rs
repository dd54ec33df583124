//! Environment module - dependency injection traits.
//!
//! Services never call `Utc::now()` or mint identifiers directly. Both are
//! injected so tests can pin the calendar day and predict every id.

use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

/// Clock trait - abstracts time operations for testability
///
/// # Examples
///
/// ```
/// use seatledger_core::environment::{Clock, SystemClock};
///
/// let clock = SystemClock;
/// assert_eq!(clock.today(), clock.now().date_naive());
/// ```
pub trait Clock: Send + Sync {
    /// Get the current time
    fn now(&self) -> DateTime<Utc>;

    /// Current calendar day (UTC), the boundary the quota pool rotates on.
    fn today(&self) -> NaiveDate {
        self.now().date_naive()
    }
}

/// Production clock backed by the system time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Source of unique identifiers for reservations and receipts.
///
/// Replaces timestamp-based ids, which collide when the same requester books
/// twice within one clock tick.
pub trait IdGenerator: Send + Sync {
    /// Produce an identifier never returned before by this generator.
    fn next_id(&self) -> String;
}

/// Random v4 UUID generator (simple, hyphen-free form).
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidIdGenerator;

impl IdGenerator for UuidIdGenerator {
    fn next_id(&self) -> String {
        Uuid::new_v4().simple().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn uuid_ids_do_not_repeat() {
        let ids = UuidIdGenerator;
        let seen: HashSet<String> = (0..1000).map(|_| ids.next_id()).collect();
        assert_eq!(seen.len(), 1000);
    }
}
