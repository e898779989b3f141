#![allow(clippy::expect_used, clippy::panic)]
//! Integration tests for fail-point injection into the audit collaborators.
//!
//! These tests require the `failpoints` feature:
//! ```bash
//! cargo test -p gradeguard-audit --features failpoints --test failpoint_tests
//! ```
//!
//! Fail points are process-global, so every test holds a
//! [`fail::FailScenario`] for its whole duration.

use std::sync::Arc;

use bytes::Bytes;
use gradeguard_audit::{AuditError, AuditLedger, EventType, PurgeGuard};
use gradeguard_storage::{ManualClock, MemoryAppendLog, MemoryRecordStore};

const SECRET: &[u8] = b"district-termination-secret";

async fn ledger(log: &MemoryAppendLog) -> Arc<AuditLedger> {
    Arc::new(
        AuditLedger::open(Arc::new(log.clone()), Arc::new(ManualClock::default()))
            .await
            .expect("open"),
    )
}

#[tokio::test]
async fn append_failure_leaves_chain_resumable() {
    let scenario = fail::FailScenario::setup();
    let log = MemoryAppendLog::new();
    let ledger = ledger(&log).await;

    ledger.append("alice", EventType::Login, b"1").await.expect("append");
    let head = ledger.head().await;

    fail::cfg("append-log-before-write", "return").expect("configure fail point");
    let result = ledger.append("alice", EventType::Login, b"2").await;
    assert!(matches!(result, Err(AuditError::Storage(_))), "got {result:?}");
    assert_eq!(ledger.head().await, head, "head must not move on a failed write");

    fail::remove("append-log-before-write");
    let entry = ledger.append("alice", EventType::Login, b"3").await.expect("append");
    assert_eq!(entry.sequence.get(), 2);
    assert!(ledger.verify_chain().await.expect("verify").is_intact());

    scenario.teardown();
}

#[tokio::test]
async fn purge_attempt_log_failure_keeps_records() {
    let scenario = fail::FailScenario::setup();
    let log = MemoryAppendLog::new();
    let store = MemoryRecordStore::new();
    store.insert("grade:alice:math", Bytes::from_static(b"B+"));
    let guard = PurgeGuard::new(
        SECRET,
        ledger(&log).await,
        Arc::new(store.clone()),
        Arc::new(ManualClock::default()),
    );

    fail::cfg("append-log-before-write", "return").expect("configure fail point");
    let result = guard.execute_purge("superintendent", SECRET).await;

    assert!(matches!(result, Err(AuditError::Storage(_))), "got {result:?}");
    assert_eq!(store.len(), 1, "purge must not run without a logged attempt");

    scenario.teardown();
}

#[tokio::test]
async fn purger_failure_is_logged_as_purge_failed() {
    let scenario = fail::FailScenario::setup();
    let log = MemoryAppendLog::new();
    let store = MemoryRecordStore::new();
    store.insert("grade:alice:math", Bytes::from_static(b"B+"));
    let guard = PurgeGuard::new(
        SECRET,
        ledger(&log).await,
        Arc::new(store.clone()),
        Arc::new(ManualClock::default()),
    );

    fail::cfg("purger-before-delete", "return").expect("configure fail point");
    let result = guard.execute_purge("superintendent", SECRET).await;

    assert!(matches!(result, Err(AuditError::Storage(_))), "got {result:?}");
    assert_eq!(store.len(), 1);

    let events: Vec<_> = guard
        .ledger()
        .entries()
        .await
        .expect("entries")
        .into_iter()
        .map(|e| e.event_type)
        .collect();
    assert_eq!(events, vec![EventType::PurgeAttempt, EventType::PurgeFailed]);

    scenario.teardown();
}
