//! Shared test utilities for collaborator testing.
//!
//! This module provides failing collaborator doubles, record generators and
//! assertion macros. It is feature-gated behind `testutil` to prevent leaking
//! into production builds.
//!
//! # Usage
//!
//! In integration tests, enable the feature in `Cargo.toml`:
//!
//! ```toml
//! [dev-dependencies]
//! gradeguard-storage = { path = "../storage", features = ["testutil"] }
//! ```
//!
//! Then import helpers:
//!
//! ```no_run
//! // Requires the `testutil` feature to be enabled.
//! use gradeguard_storage::testutil::{UnavailableAppendLog, make_record};
//! ```

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use async_trait::async_trait;
use bytes::Bytes;

use crate::{
    backend::AppendLog,
    error::{StorageError, StorageResult},
    memory::MemoryAppendLog,
    purge::RecordPurger,
};

/// Create a deterministic test record from a prefix and index.
///
/// Produces records like `"prefix:000042"` encoded as UTF-8 bytes.
#[must_use]
pub fn make_record(prefix: &str, idx: usize) -> Bytes {
    Bytes::from(format!("{prefix}:{idx:06}"))
}

/// Append log whose every operation fails with a connection error.
///
/// Models an audit sink that is down, for fail-closed tests.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnavailableAppendLog;

#[async_trait]
impl AppendLog for UnavailableAppendLog {
    async fn append(&self, _record: Bytes) -> StorageResult<()> {
        Err(StorageError::connection("append log unavailable"))
    }

    async fn scan(&self) -> StorageResult<Vec<Bytes>> {
        Err(StorageError::connection("append log unavailable"))
    }
}

/// Memory append log whose writes can be switched off at runtime.
///
/// Reads always succeed, so a ledger can be opened on it before the sink
/// "goes down". While unavailable, `append` fails with a connection error
/// and writes nothing.
#[derive(Debug, Default)]
pub struct SwitchableAppendLog {
    inner: MemoryAppendLog,
    unavailable: AtomicBool,
}

impl SwitchableAppendLog {
    /// Creates an empty, available log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes subsequent appends fail (`false`) or succeed (`true`).
    pub fn set_available(&self, available: bool) {
        self.unavailable.store(!available, Ordering::SeqCst);
    }

    /// The underlying memory log.
    pub fn inner(&self) -> &MemoryAppendLog {
        &self.inner
    }
}

#[async_trait]
impl AppendLog for SwitchableAppendLog {
    async fn append(&self, record: Bytes) -> StorageResult<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StorageError::connection("append log unavailable"));
        }
        self.inner.append(record).await
    }

    async fn scan(&self) -> StorageResult<Vec<Bytes>> {
        self.inner.scan().await
    }
}

/// Purger that counts invocations and optionally fails.
#[derive(Debug, Default)]
pub struct CountingPurger {
    calls: AtomicU64,
    fail: bool,
}

impl CountingPurger {
    /// Creates a purger that succeeds and reports zero deleted records.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a purger that always fails with a connection error.
    pub fn failing() -> Self {
        Self { calls: AtomicU64::new(0), fail: true }
    }

    /// Number of times `delete_all_sensitive_records` was invoked.
    pub fn calls(&self) -> u64 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RecordPurger for CountingPurger {
    async fn delete_all_sensitive_records(&self) -> StorageResult<u64> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(StorageError::connection("record store unavailable"));
        }
        Ok(0)
    }
}

/// Assert that a [`StorageResult`] is `Ok`.
///
/// Returns the inner value on success, panics with a descriptive message
/// on failure.
///
/// # Examples
///
/// ```no_run
/// // Requires the `testutil` feature to be enabled.
/// use gradeguard_storage::assert_storage_ok;
/// use gradeguard_storage::StorageResult;
///
/// let result: StorageResult<i32> = Ok(42);
/// let value = assert_storage_ok!(result);
/// assert_eq!(value, 42);
/// ```
#[macro_export]
macro_rules! assert_storage_ok {
    ($result:expr) => {
        match $result {
            Ok(val) => val,
            Err(e) => panic!("expected Ok, got StorageError: {e:?}"),
        }
    };
    ($result:expr, $msg:expr) => {
        match $result {
            Ok(val) => val,
            Err(e) => panic!("{}: expected Ok, got StorageError: {e:?}", $msg),
        }
    };
}

/// Assert that a [`StorageResult`] is a [`StorageError::Connection`].
#[macro_export]
macro_rules! assert_connection_error {
    ($result:expr) => {
        assert!(
            matches!($result, Err($crate::StorageError::Connection { .. })),
            "expected StorageError::Connection, got: {:?}",
            $result,
        );
    };
}
