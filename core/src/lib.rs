//! # Seat Ledger Core
//!
//! Core traits and types shared by the catalog and booking services.
//!
//! The services never hold authoritative state in memory. Everything lives in a
//! key-value [`Ledger`](ledger::Ledger), and every external call works inside a
//! single [`LedgerTransaction`](transaction::LedgerTransaction):
//!
//! - **Ledger**: versioned key-value store with atomic, validated commits
//! - **`LedgerKey`**: namespaced composite keys, one namespace per entity kind
//! - **`LedgerTransaction`**: read set + buffered writes + pending domain events
//! - **`DomainEvent`**: `{message, code, ...context}` notification emitted after commit
//! - **Environment**: injected `Clock` and `IdGenerator` capabilities
//!
//! ## Architecture Principles
//!
//! - Every invocation re-reads before mutating
//! - All writes of one invocation commit together or not at all
//! - Concurrent invocations are arbitrated by optimistic version checks at commit
//! - Dependencies are injected via traits so tests can swap them
//!
//! ## Example
//!
//! ```ignore
//! use seatledger_core::ledger::LedgerKey;
//! use seatledger_core::transaction::LedgerTransaction;
//!
//! let mut tx = LedgerTransaction::new(ledger, "tx-1");
//! let key = LedgerKey::entity("show", "Atlas")?;
//! let show: Option<Show> = tx.get_json(&key).await?;
//! tx.put_json(key, &updated_show)?;
//! let committed = tx.commit().await?;
//! ```

// Re-export commonly used types
pub use chrono::{DateTime, NaiveDate, Utc};
pub use serde::{Deserialize, Serialize};

pub mod environment;
pub mod event;
pub mod ledger;
pub mod transaction;

pub use environment::{Clock, IdGenerator, SystemClock, UuidIdGenerator};
pub use event::{DomainEvent, EventPublishError, EventPublisher};
pub use ledger::{
    CommitReceipt, Ledger, LedgerError, LedgerFuture, LedgerKey, Version, VersionedValue,
    WriteSet,
};
pub use transaction::{CommittedTransaction, LedgerTransaction};
