//! # Seat Ledger Runtime
//!
//! The imperative shell around the ledger abstractions in `seatledger-core`.
//!
//! ## Core Components
//!
//! - **`LedgerSession`**: opens transactions, commits them, publishes their events
//! - **Retry**: re-runs an invocation when its commit loses an optimistic race
//! - **Deadline**: bounds calls into dependent services
//! - **Metrics**: Prometheus descriptions and recorder installation
//! - **Publishers**: tracing and broadcast sinks for domain events
//!
//! ## Example
//!
//! ```ignore
//! use seatledger_runtime::{LedgerSession, retry::{RetryPolicy, retry_with_predicate}};
//!
//! let session = LedgerSession::new(ledger, publisher);
//!
//! let outcome = retry_with_predicate(RetryPolicy::default(), |_attempt| async {
//!     let mut tx = session.begin();
//!     // ... reads and writes ...
//!     session.commit(tx, "reserve_seats").await
//! }, |err| err.is_conflict()).await?;
//! ```

/// Dependency call timeouts
pub mod deadline;

/// Prometheus metrics for observability
pub mod metrics;

/// Domain event sinks
pub mod publisher;

/// Retry logic with exponential backoff for commit conflicts
pub mod retry;

/// Transaction lifecycle
pub mod session;

pub use deadline::{DeadlineExceeded, with_deadline};
pub use publisher::{BroadcastEventPublisher, TracingEventPublisher};
pub use retry::{RetryPolicy, retry_with_predicate};
pub use session::LedgerSession;
