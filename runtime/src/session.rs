//! Transaction lifecycle: begin, commit, publish.
//!
//! A [`LedgerSession`] is shared by every service in the process. Services call
//! [`LedgerSession::begin`] at the start of an invocation, stage reads and
//! writes on the returned [`LedgerTransaction`], and hand it back to
//! [`LedgerSession::commit`]. Events attached to the transaction reach the
//! publisher only after the ledger accepted the write set.

use crate::metrics::{EventMetrics, LedgerMetrics};
use seatledger_core::event::EventPublisher;
use seatledger_core::ledger::{Ledger, LedgerError};
use seatledger_core::transaction::{CommittedTransaction, LedgerTransaction};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

/// Opens transactions against one ledger and publishes their events.
#[derive(Clone)]
pub struct LedgerSession {
    ledger: Arc<dyn Ledger>,
    publisher: Arc<dyn EventPublisher>,
    next_transaction: Arc<AtomicU64>,
}

impl LedgerSession {
    /// Create a session over `ledger`, delivering events to `publisher`.
    #[must_use]
    pub fn new(ledger: Arc<dyn Ledger>, publisher: Arc<dyn EventPublisher>) -> Self {
        Self {
            ledger,
            publisher,
            next_transaction: Arc::new(AtomicU64::new(1)),
        }
    }

    /// The underlying ledger.
    #[must_use]
    pub fn ledger(&self) -> &Arc<dyn Ledger> {
        &self.ledger
    }

    /// Open a fresh transaction.
    #[must_use]
    pub fn begin(&self) -> LedgerTransaction {
        let sequence = self.next_transaction.fetch_add(1, Ordering::Relaxed);
        LedgerTransaction::new(Arc::clone(&self.ledger), format!("tx-{sequence}"))
    }

    /// Commit `tx` and publish its events in attach order.
    ///
    /// `operation` labels metrics and logs.
    ///
    /// # Errors
    ///
    /// Returns the ledger's error if the commit fails. No event is published in
    /// that case. Publish failures are logged and never returned.
    pub async fn commit(
        &self,
        tx: LedgerTransaction,
        operation: &'static str,
    ) -> Result<CommittedTransaction, LedgerError> {
        let transaction_id = tx.id().to_string();
        let start = Instant::now();

        let committed = match tx.commit().await {
            Ok(committed) => committed,
            Err(error) => {
                if error.is_conflict() {
                    LedgerMetrics::record_conflict(operation);
                    tracing::warn!(
                        operation,
                        transaction_id = %transaction_id,
                        error = %error,
                        "Commit rejected by concurrency check"
                    );
                } else {
                    tracing::error!(
                        operation,
                        transaction_id = %transaction_id,
                        error = %error,
                        "Commit failed"
                    );
                }
                return Err(error);
            }
        };

        if let Some(receipt) = &committed.receipt {
            LedgerMetrics::record_commit(operation, receipt.written, start.elapsed());
            tracing::debug!(
                operation,
                transaction_id = %transaction_id,
                sequence = receipt.sequence,
                written = receipt.written,
                "Transaction committed"
            );
        }

        for event in &committed.events {
            match self.publisher.publish(event.clone()).await {
                Ok(()) => EventMetrics::record_published(),
                Err(error) => {
                    EventMetrics::record_publish_error();
                    tracing::warn!(
                        operation,
                        transaction_id = %transaction_id,
                        error = %error,
                        "Dropping domain event after failed delivery"
                    );
                }
            }
        }

        Ok(committed)
    }
}

impl std::fmt::Debug for LedgerSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LedgerSession")
            .field("next_transaction", &self.next_transaction)
            .finish_non_exhaustive()
    }
}
