//! In-memory MVCC ledger.
//!
//! [`InMemoryLedger`] implements the full [`Ledger`] contract: every key carries
//! a version, and a write set commits only if each key it read still holds the
//! version observed at read time. It backs the integration tests and the demo
//! binary.
//!
//! Faults can be injected to exercise failure paths:
//! - [`InMemoryLedger::fail_next_commits`]: reject the next `n` commits
//! - [`InMemoryLedger::fail_commits_touching`]: reject commits writing a namespace
//! - [`InMemoryLedger::with_read_delay`]: slow every read down so concurrent
//!   invocations interleave

#![allow(clippy::unwrap_used)] // Test infrastructure uses unwrap for simplicity
#![allow(clippy::missing_panics_doc)] // Lock poisoning only follows a panicking test

use seatledger_core::ledger::{
    CommitReceipt, Ledger, LedgerError, LedgerFuture, LedgerKey, Version, VersionedValue, WriteSet,
};
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};
use std::sync::{Arc, RwLock};
use std::time::Duration;

#[derive(Debug, Default)]
struct LedgerState {
    entries: BTreeMap<LedgerKey, VersionedValue>,
    sequence: u64,
    conflicts: u64,
    fail_next_commits: usize,
    failing_namespaces: HashSet<String>,
}

/// Versioned key-value store held in memory.
///
/// Cloning shares the underlying state.
///
/// # Example
///
/// ```
/// use seatledger_core::ledger::{Ledger, LedgerKey, WriteSet};
/// use seatledger_testing::InMemoryLedger;
///
/// # tokio_test::block_on(async {
/// let ledger = InMemoryLedger::new();
/// let key = LedgerKey::entity("show", "Atlas").unwrap();
///
/// let mut write_set = WriteSet::default();
/// write_set.record_read(key.clone(), None);
/// write_set.record_write(key.clone(), b"{}".to_vec());
/// ledger.commit(write_set).await.unwrap();
///
/// assert_eq!(ledger.get(key).await.unwrap().unwrap().version.value(), 1);
/// # });
/// ```
#[derive(Clone, Debug, Default)]
pub struct InMemoryLedger {
    state: Arc<RwLock<LedgerState>>,
    read_delay: Option<Duration>,
}

impl InMemoryLedger {
    /// Create an empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sleep for `delay` inside every read.
    #[must_use]
    pub fn with_read_delay(mut self, delay: Duration) -> Self {
        self.read_delay = Some(delay);
        self
    }

    /// Reject the next `count` commits with `LedgerError::Unavailable`.
    pub fn fail_next_commits(&self, count: usize) {
        self.state.write().unwrap().fail_next_commits = count;
    }

    /// Reject every commit that writes a key of `object_type`.
    pub fn fail_commits_touching(&self, object_type: &str) {
        self.state
            .write()
            .unwrap()
            .failing_namespaces
            .insert(object_type.to_string());
    }

    /// Clear all injected faults.
    pub fn heal(&self) {
        let mut state = self.state.write().unwrap();
        state.fail_next_commits = 0;
        state.failing_namespaces.clear();
    }

    /// Write `value` directly, bypassing version checks.
    ///
    /// Used to arrange fixtures such as a quota pool dated yesterday.
    pub fn seed_json<T: Serialize + ?Sized>(&self, key: LedgerKey, value: &T) {
        let data = serde_json::to_vec(value).unwrap();
        let mut state = self.state.write().unwrap();
        let version = Version::after(state.entries.get(&key).map(|v| v.version));
        state.entries.insert(key, VersionedValue { version, data });
    }

    /// Current value and version of `key`, without recording a read.
    #[must_use]
    pub fn snapshot(&self, key: &LedgerKey) -> Option<VersionedValue> {
        self.state.read().unwrap().entries.get(key).cloned()
    }

    /// Decode the current value of `key`.
    #[must_use]
    pub fn snapshot_json<T: serde::de::DeserializeOwned>(&self, key: &LedgerKey) -> Option<T> {
        self.snapshot(key)
            .map(|value| serde_json::from_slice(&value.data).unwrap())
    }

    /// Every stored key of `object_type`, in key order.
    #[must_use]
    pub fn keys_of_type(&self, object_type: &str) -> Vec<LedgerKey> {
        self.state
            .read()
            .unwrap()
            .entries
            .keys()
            .filter(|key| key.object_type() == object_type)
            .cloned()
            .collect()
    }

    /// Number of stored keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.state.read().unwrap().entries.len()
    }

    /// `true` if nothing has been stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of successful commits so far.
    #[must_use]
    pub fn commit_count(&self) -> u64 {
        self.state.read().unwrap().sequence
    }

    /// Number of commits rejected by the version check so far.
    #[must_use]
    pub fn conflict_count(&self) -> u64 {
        self.state.read().unwrap().conflicts
    }

    fn apply(&self, write_set: WriteSet) -> Result<CommitReceipt, LedgerError> {
        let mut state = self.state.write().unwrap();

        if state.fail_next_commits > 0 {
            state.fail_next_commits -= 1;
            return Err(LedgerError::Unavailable("injected commit failure".to_string()));
        }

        if let Some((key, _)) = write_set
            .writes
            .iter()
            .find(|(key, _)| state.failing_namespaces.contains(key.object_type()))
        {
            return Err(LedgerError::Unavailable(format!(
                "injected failure writing {key}"
            )));
        }

        for (key, expected) in &write_set.reads {
            let actual = state.entries.get(key).map(|value| value.version);
            if actual != *expected {
                state.conflicts += 1;
                return Err(LedgerError::conflict(key.clone(), *expected, actual));
            }
        }

        let written = write_set.writes.len();
        for (key, data) in write_set.writes {
            let version = Version::after(state.entries.get(&key).map(|v| v.version));
            state.entries.insert(key, VersionedValue { version, data });
        }
        state.sequence += 1;

        Ok(CommitReceipt {
            sequence: state.sequence,
            written,
        })
    }
}

impl Ledger for InMemoryLedger {
    fn get(&self, key: LedgerKey) -> LedgerFuture<'_, Option<VersionedValue>> {
        Box::pin(async move {
            if let Some(delay) = self.read_delay {
                tokio::time::sleep(delay).await;
            }
            Ok(self.snapshot(&key))
        })
    }

    fn commit(&self, write_set: WriteSet) -> LedgerFuture<'_, CommitReceipt> {
        Box::pin(async move { self.apply(write_set) })
    }
}
