//! `LedgerSession` commit and publish behaviour, with conflict retries.

#![allow(clippy::unwrap_used)] // Tests can unwrap
#![allow(clippy::expect_used)] // Tests can expect

use seatledger_core::event::DomainEvent;
use seatledger_core::ledger::{LedgerError, LedgerKey};
use seatledger_runtime::{LedgerSession, RetryPolicy, retry_with_predicate};
use seatledger_testing::{InMemoryLedger, RecordingEventPublisher};
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;

fn setup() -> (Arc<InMemoryLedger>, Arc<RecordingEventPublisher>, LedgerSession) {
    let ledger = Arc::new(InMemoryLedger::new());
    let events = Arc::new(RecordingEventPublisher::new());
    let session = LedgerSession::new(ledger.clone(), events.clone());
    (ledger, events, session)
}

fn counter_key() -> LedgerKey {
    LedgerKey::entity("counter", "hits").unwrap()
}

/// Events reach the publisher in attach order once the commit succeeds.
#[tokio::test]
async fn commit_publishes_events_in_order() {
    let (ledger, events, session) = setup();

    let mut tx = session.begin();
    tx.put_json(counter_key(), &json!(1)).unwrap();
    tx.set_event(DomainEvent::ok("first"));
    tx.set_event(DomainEvent::ok("second"));
    let committed = session.commit(tx, "test").await.unwrap();

    assert_eq!(committed.receipt.unwrap().written, 1);
    assert_eq!(events.messages(), vec!["first", "second"]);
    assert_eq!(ledger.commit_count(), 1);
}

/// A failed commit publishes nothing.
#[tokio::test]
async fn failed_commit_publishes_nothing() {
    let (ledger, events, session) = setup();
    ledger.fail_next_commits(1);

    let mut tx = session.begin();
    tx.put_json(counter_key(), &json!(1)).unwrap();
    tx.set_event(DomainEvent::ok("never"));

    let error = session.commit(tx, "test").await.unwrap_err();
    assert!(matches!(error, LedgerError::Unavailable(_)));
    assert!(events.events().is_empty());
}

/// Publisher failures are swallowed; the commit still stands.
#[tokio::test]
async fn publish_failure_does_not_fail_commit() {
    let (ledger, events, session) = setup();
    events.reject_all();

    let mut tx = session.begin();
    tx.put_json(counter_key(), &json!(1)).unwrap();
    tx.set_event(DomainEvent::ok("lost"));

    assert!(session.commit(tx, "test").await.is_ok());
    assert!(ledger.snapshot(&counter_key()).is_some());
}

/// Transaction ids are unique per session.
#[test]
fn begin_hands_out_distinct_ids() {
    let (_, _, session) = setup();
    let first = session.begin();
    let second = session.begin();
    assert_ne!(first.id(), second.id());
}

/// Of two transactions that read the same key, only the first to commit wins.
#[tokio::test]
async fn stale_read_is_rejected_as_conflict() {
    let (ledger, events, session) = setup();

    let mut first = session.begin();
    let mut second = session.begin();
    let seen_first: Option<u64> = first.get_json(&counter_key()).await.unwrap();
    let seen_second: Option<u64> = second.get_json(&counter_key()).await.unwrap();
    assert_eq!(seen_first, None);
    assert_eq!(seen_second, None);

    first.put_json(counter_key(), &1_u64).unwrap();
    first.set_event(DomainEvent::ok("first"));
    second.put_json(counter_key(), &10_u64).unwrap();
    second.set_event(DomainEvent::ok("second"));

    session.commit(first, "increment").await.unwrap();
    let error = session.commit(second, "increment").await.unwrap_err();

    assert!(matches!(error, LedgerError::Conflict { .. }), "{error:?}");
    assert!(error.is_conflict());
    assert_eq!(ledger.conflict_count(), 1);
    assert_eq!(ledger.commit_count(), 1);
    let stored: Value = ledger.snapshot_json(&counter_key()).unwrap();
    assert_eq!(stored, json!(1));
    assert_eq!(events.messages(), vec!["first"]);
}

/// Concurrent read-modify-write invocations lose no update under retry.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn retried_increments_are_not_lost() {
    let ledger = Arc::new(InMemoryLedger::new().with_read_delay(Duration::from_millis(2)));
    let session = LedgerSession::new(ledger.clone(), Arc::new(RecordingEventPublisher::new()));
    let policy = RetryPolicy::builder()
        .max_retries(50)
        .initial_delay(Duration::from_millis(1))
        .max_delay(Duration::from_millis(20))
        .build();

    let mut handles = Vec::new();
    for _ in 0..8 {
        let session = session.clone();
        let policy = policy.clone();
        handles.push(tokio::spawn(async move {
            retry_with_predicate(
                policy,
                |_| {
                    let session = session.clone();
                    async move {
                        let mut tx = session.begin();
                        let current: u64 = tx.get_json(&counter_key()).await?.unwrap_or(0);
                        tx.put_json(counter_key(), &(current + 1))?;
                        session.commit(tx, "increment").await
                    }
                },
                LedgerError::is_conflict,
            )
            .await
        }));
    }

    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let total: Value = ledger.snapshot_json(&counter_key()).unwrap();
    assert_eq!(total, json!(8));
}
