//! Ledger trait and related types.
//!
//! The ledger is a key-value store with two properties the services rely on:
//!
//! - Every stored value carries a [`Version`] that increments on each write
//! - A [`WriteSet`] commits atomically, and only if every key it read still
//!   holds the version observed at read time
//!
//! There is no locking across invocations. Two invocations that read the same
//! key and both try to write will race; the second commit fails with
//! [`LedgerError::Conflict`] and the caller decides whether to retry.
//!
//! # Implementations
//!
//! - `InMemoryLedger` (in `seatledger-testing`): MVCC store for tests and the demo
//!
//! # Example
//!
//! ```no_run
//! use seatledger_core::ledger::{Ledger, LedgerError, LedgerKey, WriteSet};
//!
//! async fn example<L: Ledger>(ledger: &L) -> Result<(), LedgerError> {
//!     let key = LedgerKey::entity("show", "Atlas")?;
//!     let current = ledger.get(key.clone()).await?;
//!
//!     let mut write_set = WriteSet::default();
//!     write_set.record_read(key.clone(), current.as_ref().map(|v| v.version));
//!     write_set.record_write(key, b"{}".to_vec());
//!     ledger.commit(write_set).await?;
//!     Ok(())
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use thiserror::Error;

/// Separator between the segments of a composite key.
pub const KEY_DELIMITER: char = '\u{0}';

/// Boxed future returned by [`Ledger`] operations.
pub type LedgerFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, LedgerError>> + Send + 'a>>;

/// Errors that can occur during ledger operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// A key read by the transaction changed before the transaction committed.
    ///
    /// Another invocation wrote the key in between. Nothing from the failing
    /// write set was applied.
    #[error("Concurrency conflict on {key}: read version {expected}, ledger holds {actual}")]
    Conflict {
        /// The key whose version moved.
        key: LedgerKey,
        /// The version observed when the key was read (`absent` if it did not exist).
        expected: VersionLabel,
        /// The version currently stored.
        actual: VersionLabel,
    },

    /// A key could not be built from the given parts.
    #[error("Invalid ledger key: {0}")]
    InvalidKey(String),

    /// The ledger could not be reached or refused the operation.
    #[error("Ledger unavailable: {0}")]
    Unavailable(String),

    /// A stored value could not be encoded or decoded.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl LedgerError {
    /// Returns `true` for optimistic concurrency conflicts, the only error a
    /// caller can cure by re-running the invocation.
    #[must_use]
    pub const fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }

    /// Build a conflict error from the observed and stored versions.
    #[must_use]
    pub fn conflict(
        key: LedgerKey,
        expected: Option<Version>,
        actual: Option<Version>,
    ) -> Self {
        Self::Conflict {
            key,
            expected: VersionLabel(expected),
            actual: VersionLabel(actual),
        }
    }
}

impl From<serde_json::Error> for LedgerError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Display helper for an optional version in error messages.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct VersionLabel(pub Option<Version>);

impl fmt::Display for VersionLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(version) => write!(f, "{version}"),
            None => write!(f, "absent"),
        }
    }
}

/// Namespaced ledger key.
///
/// Keys are built from an object type (the entity kind) followed by one or more
/// attribute parts, each terminated by a `\u{0}` delimiter:
///
/// ```text
/// \u{0}show\u{0}Atlas\u{0}
/// \u{0}show~slot\u{0}Atlas\u{0}6pm-9pm\u{0}
/// ```
///
/// Because every entity kind gets its own prefix, a show named `"6pm-9pm"` and
/// a reservation index for the time slot `"6pm-9pm"` can never share a key.
///
/// # Examples
///
/// ```
/// use seatledger_core::ledger::LedgerKey;
///
/// let key = LedgerKey::composite("show~slot", &["Atlas", "6pm-9pm"]).unwrap();
/// assert_eq!(key.object_type(), "show~slot");
/// assert_eq!(key.parts(), vec!["Atlas", "6pm-9pm"]);
/// ```
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct LedgerKey(String);

impl LedgerKey {
    /// Build a composite key from an object type and its attribute parts.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::InvalidKey`] if the object type is empty or any
    /// segment contains the `\u{0}` delimiter.
    pub fn composite<S: AsRef<str>>(object_type: &str, parts: &[S]) -> Result<Self, LedgerError> {
        if object_type.is_empty() {
            return Err(LedgerError::InvalidKey(
                "object type cannot be empty".to_string(),
            ));
        }
        if object_type.contains(KEY_DELIMITER) {
            return Err(LedgerError::InvalidKey(format!(
                "object type {object_type:?} contains the key delimiter"
            )));
        }

        let mut key = String::with_capacity(
            object_type.len() + parts.iter().map(|p| p.as_ref().len() + 1).sum::<usize>() + 2,
        );
        key.push(KEY_DELIMITER);
        key.push_str(object_type);
        key.push(KEY_DELIMITER);

        for part in parts {
            let part = part.as_ref();
            if part.contains(KEY_DELIMITER) {
                return Err(LedgerError::InvalidKey(format!(
                    "key part {part:?} contains the key delimiter"
                )));
            }
            key.push_str(part);
            key.push(KEY_DELIMITER);
        }

        Ok(Self(key))
    }

    /// Build the primary key of a single entity: `(kind, id)`.
    ///
    /// # Errors
    ///
    /// See [`LedgerKey::composite`].
    pub fn entity(kind: &str, id: &str) -> Result<Self, LedgerError> {
        Self::composite(kind, &[id])
    }

    /// The entity kind this key belongs to.
    #[must_use]
    pub fn object_type(&self) -> &str {
        self.segments().next().unwrap_or_default()
    }

    /// The attribute parts after the object type.
    #[must_use]
    pub fn parts(&self) -> Vec<&str> {
        self.segments().skip(1).collect()
    }

    /// The raw encoded key.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn segments(&self) -> impl Iterator<Item = &str> {
        let inner = self
            .0
            .strip_prefix(KEY_DELIMITER)
            .and_then(|rest| rest.strip_suffix(KEY_DELIMITER))
            .unwrap_or_default();
        inner.split(KEY_DELIMITER)
    }
}

impl fmt::Display for LedgerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.object_type())?;
        for part in self.parts() {
            write!(f, "/{part}")?;
        }
        Ok(())
    }
}

/// Per-key version number for optimistic concurrency control.
///
/// The first write of a key stores version 1; each later write increments it.
/// An absent key has no version at all (`Option<Version>::None`).
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Version(u64);

impl Version {
    /// Version assigned to the first write of a key.
    pub const FIRST: Self = Self(1);

    /// Create a new `Version` with the given value.
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Get the version number.
    #[must_use]
    pub const fn value(self) -> u64 {
        self.0
    }

    /// Get the next version (current + 1).
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0 + 1)
    }

    /// Version that follows `current`, treating an absent key as version 0.
    #[must_use]
    pub const fn after(current: Option<Self>) -> Self {
        match current {
            Some(version) => version.next(),
            None => Self::FIRST,
        }
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for Version {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

/// A stored value together with its current version.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VersionedValue {
    /// Version of the stored value.
    pub version: Version,
    /// Raw value bytes (JSON for every record in this workspace).
    pub data: Vec<u8>,
}

/// Everything a transaction observed and wants to change.
///
/// `reads` carries the version of each key at the time it was first read
/// (`None` when the key was absent). `writes` are applied in order if, and only
/// if, every read still matches the ledger.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct WriteSet {
    /// Keys read and the version observed for each.
    pub reads: Vec<(LedgerKey, Option<Version>)>,
    /// Keys to overwrite and their new values.
    pub writes: Vec<(LedgerKey, Vec<u8>)>,
}

impl WriteSet {
    /// Record a key read at the given version.
    pub fn record_read(&mut self, key: LedgerKey, version: Option<Version>) {
        self.reads.push((key, version));
    }

    /// Record a key write.
    pub fn record_write(&mut self, key: LedgerKey, value: Vec<u8>) {
        self.writes.push((key, value));
    }

    /// `true` if nothing would be written.
    #[must_use]
    pub fn is_read_only(&self) -> bool {
        self.writes.is_empty()
    }
}

/// Result of a successful commit.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CommitReceipt {
    /// Ledger-wide commit sequence number.
    pub sequence: u64,
    /// Number of keys written.
    pub written: usize,
}

/// Versioned key-value ledger.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync`; a single ledger is shared by every
/// service instance.
///
/// # Dyn Compatibility
///
/// Methods return boxed futures instead of using `async fn` so the ledger can
/// be held as `Arc<dyn Ledger>`.
pub trait Ledger: Send + Sync {
    /// Point lookup.
    ///
    /// Returns `Ok(None)` if the key has never been written.
    ///
    /// # Errors
    ///
    /// - `Unavailable`: the store could not be reached
    fn get(&self, key: LedgerKey) -> LedgerFuture<'_, Option<VersionedValue>>;

    /// Validate the read versions and apply every write atomically.
    ///
    /// # Errors
    ///
    /// - `Conflict`: a read key changed since it was read; nothing was written
    /// - `Unavailable`: the store could not be reached; nothing was written
    fn commit(&self, write_set: WriteSet) -> LedgerFuture<'_, CommitReceipt>;
}
