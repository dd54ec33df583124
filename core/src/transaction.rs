//! Per-invocation ledger transaction.
//!
//! A [`LedgerTransaction`] is the unit of work for one external call. It
//! provides the ledger's `get`/`put` primitives with read-your-writes
//! semantics, remembers which version of every key it read, and buffers all
//! writes until [`LedgerTransaction::commit`].
//!
//! Catalog and booking code share one transaction when they cooperate on a
//! single request, so the show update, the reservation record and the quota
//! pool change land together or not at all.

use crate::event::DomainEvent;
use crate::ledger::{CommitReceipt, Ledger, LedgerError, LedgerKey, Version, WriteSet};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

/// Outcome of a committed transaction.
#[derive(Clone, Debug, PartialEq)]
pub struct CommittedTransaction {
    /// Transaction identifier.
    pub transaction_id: String,
    /// Ledger receipt, `None` when the transaction wrote nothing.
    pub receipt: Option<CommitReceipt>,
    /// Events to publish, in the order they were attached.
    pub events: Vec<DomainEvent>,
}

/// Read set, write buffer and pending events of one invocation.
pub struct LedgerTransaction {
    ledger: Arc<dyn Ledger>,
    id: String,
    reads: HashMap<LedgerKey, Option<Version>>,
    writes: BTreeMap<LedgerKey, Vec<u8>>,
    events: Vec<DomainEvent>,
}

impl LedgerTransaction {
    /// Open a transaction against `ledger`.
    #[must_use]
    pub fn new(ledger: Arc<dyn Ledger>, id: impl Into<String>) -> Self {
        Self {
            ledger,
            id: id.into(),
            reads: HashMap::new(),
            writes: BTreeMap::new(),
            events: Vec::new(),
        }
    }

    /// Transaction identifier.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Read a raw value.
    ///
    /// A value written earlier in this transaction is returned as written.
    /// Otherwise the ledger is consulted and the observed version recorded;
    /// later reads of the same key keep the first observed version so that a
    /// concurrent write in between is still detected at commit.
    ///
    /// # Errors
    ///
    /// Propagates ledger read failures.
    pub async fn get_state(&mut self, key: &LedgerKey) -> Result<Option<Vec<u8>>, LedgerError> {
        if let Some(buffered) = self.writes.get(key) {
            return Ok(Some(buffered.clone()));
        }

        let found = self.ledger.get(key.clone()).await?;
        self.reads
            .entry(key.clone())
            .or_insert_with(|| found.as_ref().map(|value| value.version));

        Ok(found.map(|value| value.data))
    }

    /// Buffer a raw write.
    pub fn put_state(&mut self, key: LedgerKey, value: Vec<u8>) {
        self.writes.insert(key, value);
    }

    /// Read and decode a JSON record.
    ///
    /// # Errors
    ///
    /// Returns `Serialization` if the stored bytes are not a valid `T`.
    pub async fn get_json<T: DeserializeOwned>(
        &mut self,
        key: &LedgerKey,
    ) -> Result<Option<T>, LedgerError> {
        match self.get_state(key).await? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Encode and buffer a JSON record.
    ///
    /// # Errors
    ///
    /// Returns `Serialization` if `value` cannot be encoded.
    pub fn put_json<T: Serialize + ?Sized>(
        &mut self,
        key: LedgerKey,
        value: &T,
    ) -> Result<(), LedgerError> {
        let bytes = serde_json::to_vec(value)?;
        self.put_state(key, bytes);
        Ok(())
    }

    /// Attach a domain event, published once the transaction commits.
    pub fn set_event(&mut self, event: DomainEvent) {
        self.events.push(event);
    }

    /// Events attached so far.
    #[must_use]
    pub fn events(&self) -> &[DomainEvent] {
        &self.events
    }

    /// `true` if at least one write is buffered.
    #[must_use]
    pub fn has_writes(&self) -> bool {
        !self.writes.is_empty()
    }

    /// Keys written so far, in commit order.
    pub fn written_keys(&self) -> impl Iterator<Item = &LedgerKey> {
        self.writes.keys()
    }

    /// Commit every buffered write atomically.
    ///
    /// A transaction without writes does not touch the ledger; its events are
    /// still returned for publishing.
    ///
    /// # Errors
    ///
    /// - `Conflict`: a key read by this transaction changed in the meantime
    /// - `Unavailable`: the ledger rejected the commit
    pub async fn commit(self) -> Result<CommittedTransaction, LedgerError> {
        let Self {
            ledger,
            id,
            reads,
            writes,
            events,
        } = self;

        if writes.is_empty() {
            return Ok(CommittedTransaction {
                transaction_id: id,
                receipt: None,
                events,
            });
        }

        let mut write_set = WriteSet::default();
        for (key, version) in reads {
            write_set.record_read(key, version);
        }
        for (key, value) in writes {
            write_set.record_write(key, value);
        }

        let receipt = ledger.commit(write_set).await?;

        Ok(CommittedTransaction {
            transaction_id: id,
            receipt: Some(receipt),
            events,
        })
    }
}

impl std::fmt::Debug for LedgerTransaction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LedgerTransaction")
            .field("id", &self.id)
            .field("reads", &self.reads.len())
            .field("writes", &self.writes.len())
            .field("events", &self.events.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use crate::ledger::{LedgerFuture, VersionedValue};
    use std::sync::Mutex;

    /// Ledger stub that serves one fixed value and captures commits.
    #[derive(Default)]
    struct StubLedger {
        stored: Option<VersionedValue>,
        committed: Mutex<Vec<WriteSet>>,
    }

    impl Ledger for StubLedger {
        fn get(&self, _key: LedgerKey) -> LedgerFuture<'_, Option<VersionedValue>> {
            let stored = self.stored.clone();
            Box::pin(async move { Ok(stored) })
        }

        fn commit(&self, write_set: WriteSet) -> LedgerFuture<'_, CommitReceipt> {
            let written = write_set.writes.len();
            self.committed.lock().unwrap().push(write_set);
            Box::pin(async move { Ok(CommitReceipt { sequence: 1, written }) })
        }
    }

    fn key(id: &str) -> LedgerKey {
        LedgerKey::entity("show", id).unwrap()
    }

    #[test]
    fn reads_see_buffered_writes() {
        tokio_test::block_on(async {
            let mut tx = LedgerTransaction::new(Arc::new(StubLedger::default()), "tx-1");

            assert_eq!(tx.get_state(&key("Atlas")).await.unwrap(), None);
            tx.put_state(key("Atlas"), b"v2".to_vec());
            assert_eq!(
                tx.get_state(&key("Atlas")).await.unwrap(),
                Some(b"v2".to_vec())
            );
        });
    }

    #[test]
    fn commit_carries_observed_versions() {
        tokio_test::block_on(async {
            let ledger = Arc::new(StubLedger {
                stored: Some(VersionedValue {
                    version: Version::new(7),
                    data: b"{}".to_vec(),
                }),
                committed: Mutex::default(),
            });
            let mut tx = LedgerTransaction::new(ledger.clone(), "tx-2");

            tx.get_state(&key("Atlas")).await.unwrap();
            tx.put_state(key("Atlas"), b"{\"a\":1}".to_vec());
            let committed = tx.commit().await.unwrap();

            assert_eq!(committed.receipt.map(|r| r.written), Some(1));
            let sets = ledger.committed.lock().unwrap();
            assert_eq!(sets[0].reads, vec![(key("Atlas"), Some(Version::new(7)))]);
        });
    }

    #[test]
    fn read_only_commit_skips_the_ledger() {
        tokio_test::block_on(async {
            let ledger = Arc::new(StubLedger::default());
            let mut tx = LedgerTransaction::new(ledger.clone(), "tx-3");
            tx.get_state(&key("Atlas")).await.unwrap();
            tx.set_event(DomainEvent::ok("Only limited seats are available."));

            let committed = tx.commit().await.unwrap();

            assert!(committed.receipt.is_none());
            assert_eq!(committed.events.len(), 1);
            assert!(ledger.committed.lock().unwrap().is_empty());
        });
    }
}
