//! # Seat Ledger Testing
//!
//! Deterministic collaborators for testing the seat ledger services.
//!
//! This crate provides:
//! - [`InMemoryLedger`]: MVCC key-value ledger with fault injection
//! - [`MockClock`]: settable clock for quota-day boundaries
//! - [`SequentialIdGenerator`]: predictable reservation and receipt ids
//! - [`RecordingEventPublisher`]: captures published domain events
//!
//! ## Example
//!
//! ```ignore
//! use seatledger_testing::{InMemoryLedger, RecordingEventPublisher, test_clock};
//!
//! #[tokio::test]
//! async fn test_booking_flow() {
//!     let ledger = Arc::new(InMemoryLedger::new());
//!     let events = Arc::new(RecordingEventPublisher::new());
//!     let clock = Arc::new(test_clock());
//!     // ... build services, book seats, inspect ledger and events ...
//! }
//! ```

pub mod ledger;

pub use ledger::InMemoryLedger;
pub use mocks::{
    MockClock, RecordingEventPublisher, SequentialIdGenerator, init_test_tracing, test_clock,
};

/// Mock implementations of environment and delivery traits.
pub mod mocks {
    #![allow(clippy::unwrap_used)] // Test infrastructure uses unwrap for simplicity
    #![allow(clippy::missing_panics_doc)]

    use chrono::{DateTime, Days, NaiveDate, Utc};
    use seatledger_core::environment::{Clock, IdGenerator};
    use seatledger_core::event::{DomainEvent, EventPublishError, EventPublisher};
    use std::future::Future;
    use std::pin::Pin;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::{Arc, Mutex};

    /// Settable clock for deterministic tests.
    ///
    /// Returns the same instant until moved with [`MockClock::set`] or
    /// [`MockClock::advance_days`]. Clones share the current time.
    ///
    /// # Example
    ///
    /// ```
    /// use seatledger_testing::mocks::test_clock;
    /// use seatledger_core::environment::Clock;
    ///
    /// let clock = test_clock();
    /// let today = clock.today();
    /// clock.advance_days(1);
    /// assert_eq!(clock.today(), today.succ_opt().unwrap());
    /// ```
    #[derive(Debug, Clone)]
    pub struct MockClock {
        time: Arc<Mutex<DateTime<Utc>>>,
    }

    impl MockClock {
        /// Create a clock frozen at `time`.
        #[must_use]
        pub fn new(time: DateTime<Utc>) -> Self {
            Self {
                time: Arc::new(Mutex::new(time)),
            }
        }

        /// Move the clock to `time`.
        pub fn set(&self, time: DateTime<Utc>) {
            *self.time.lock().unwrap() = time;
        }

        /// Move the clock forward by whole days.
        pub fn advance_days(&self, days: u64) {
            let mut time = self.time.lock().unwrap();
            *time = time.checked_add_days(Days::new(days)).unwrap();
        }

        /// Move the clock to midnight UTC of `date`.
        pub fn set_date(&self, date: NaiveDate) {
            self.set(date.and_hms_opt(0, 0, 0).unwrap().and_utc());
        }
    }

    impl Clock for MockClock {
        fn now(&self) -> DateTime<Utc> {
            *self.time.lock().unwrap()
        }
    }

    /// Create a default clock for tests (2025-01-01 09:00:00 UTC).
    ///
    /// # Panics
    ///
    /// Panics if the hardcoded timestamp fails to parse, which never happens.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn test_clock() -> MockClock {
        MockClock::new(
            DateTime::parse_from_rfc3339("2025-01-01T09:00:00Z")
                .expect("hardcoded timestamp should always parse")
                .with_timezone(&Utc),
        )
    }

    /// Predictable ids: `"1"`, `"2"`, `"3"`, ...
    #[derive(Debug, Clone, Default)]
    pub struct SequentialIdGenerator {
        next: Arc<AtomicU64>,
    }

    impl SequentialIdGenerator {
        /// Create a generator whose first id is `"1"`.
        #[must_use]
        pub fn new() -> Self {
            Self::default()
        }

        /// Number of ids handed out so far.
        #[must_use]
        pub fn issued(&self) -> u64 {
            self.next.load(Ordering::SeqCst)
        }
    }

    impl IdGenerator for SequentialIdGenerator {
        fn next_id(&self) -> String {
            (self.next.fetch_add(1, Ordering::SeqCst) + 1).to_string()
        }
    }

    /// Captures every published event for assertions.
    #[derive(Debug, Clone, Default)]
    pub struct RecordingEventPublisher {
        events: Arc<Mutex<Vec<DomainEvent>>>,
        reject: Arc<Mutex<bool>>,
    }

    impl RecordingEventPublisher {
        /// Create an empty recorder.
        #[must_use]
        pub fn new() -> Self {
            Self::default()
        }

        /// Make every later publish fail with `Transport`.
        pub fn reject_all(&self) {
            *self.reject.lock().unwrap() = true;
        }

        /// Events published so far, in order.
        #[must_use]
        pub fn events(&self) -> Vec<DomainEvent> {
            self.events.lock().unwrap().clone()
        }

        /// Messages of the events published so far.
        #[must_use]
        pub fn messages(&self) -> Vec<String> {
            self.events().into_iter().map(|e| e.message).collect()
        }

        /// Forget every recorded event.
        pub fn clear(&self) {
            self.events.lock().unwrap().clear();
        }
    }

    impl EventPublisher for RecordingEventPublisher {
        fn publish(
            &self,
            event: DomainEvent,
        ) -> Pin<Box<dyn Future<Output = Result<(), EventPublishError>> + Send + '_>> {
            Box::pin(async move {
                if *self.reject.lock().unwrap() {
                    return Err(EventPublishError::Transport("recorder offline".to_string()));
                }
                self.events.lock().unwrap().push(event);
                Ok(())
            })
        }
    }

    /// Install a test-friendly tracing subscriber once per process.
    ///
    /// Honours `RUST_LOG`; silent by default.
    pub fn init_test_tracing() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("off")),
            )
            .with_test_writer()
            .try_init();
    }
}
