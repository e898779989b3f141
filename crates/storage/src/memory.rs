//! In-memory append log implementation.
//!
//! This module provides [`MemoryAppendLog`], an in-memory implementation of
//! [`AppendLog`] suitable for testing, development and single-process
//! deployments that ship the log elsewhere through tracing.
//!
//! # Features
//!
//! - **Thread-safe**: Uses [`parking_lot::RwLock`] for concurrent access
//! - **Ordered storage**: Records live in a [`Vec`] in append order
//! - **Size limits**: Oversized records are rejected before they are stored
//! - **Fail points**: `append-log-before-write` injects write failures when the
//!   `failpoints` feature is enabled
//!
//! # Example
//!
//! ```
//! use bytes::Bytes;
//! use gradeguard_storage::{AppendLog, MemoryAppendLog};
//!
//! #[tokio::main]
//! async fn main() {
//!     let log = MemoryAppendLog::new();
//!     log.append(Bytes::from_static(b"entry")).await.unwrap();
//!     assert_eq!(log.len().await.unwrap(), 1);
//! }
//! ```
//!
//! # Limitations
//!
//! - Data is not persisted; all records are lost when the process exits

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use fail::fail_point;
use parking_lot::RwLock;

use crate::{
    backend::AppendLog,
    error::{StorageError, StorageResult},
    size_limits::{SizeLimits, validate_record_size},
};

/// In-memory append log backed by a [`Vec`].
///
/// # Cloning
///
/// `MemoryAppendLog` is cheaply cloneable via [`Arc`]. All clones share the
/// same underlying records.
#[derive(Clone, Debug, Default)]
pub struct MemoryAppendLog {
    records: Arc<RwLock<Vec<Bytes>>>,
    limits: SizeLimits,
}

impl MemoryAppendLog {
    /// Creates an empty log with default size limits.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty log with custom size limits.
    pub fn with_limits(limits: SizeLimits) -> Self {
        Self { records: Arc::default(), limits }
    }

    /// Returns the configured size limits.
    #[must_use]
    pub fn limits(&self) -> SizeLimits {
        self.limits
    }

    /// Overwrites the record at `index`, bypassing append-only semantics.
    ///
    /// Exists so tests can simulate tampering with persisted history.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Internal`] if `index` is out of range.
    #[cfg(any(test, feature = "testutil"))]
    pub fn replace(&self, index: usize, record: Bytes) -> StorageResult<()> {
        let mut records = self.records.write();
        let slot = records
            .get_mut(index)
            .ok_or_else(|| StorageError::internal(format!("no record at index {index}")))?;
        *slot = record;
        Ok(())
    }

    /// Drops every record from `len` onward, simulating a truncated log.
    #[cfg(any(test, feature = "testutil"))]
    pub fn truncate(&self, len: usize) {
        self.records.write().truncate(len);
    }

    /// Removes the record at `index`, simulating a deleted history entry.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Internal`] if `index` is out of range.
    #[cfg(any(test, feature = "testutil"))]
    pub fn remove(&self, index: usize) -> StorageResult<Bytes> {
        let mut records = self.records.write();
        if index >= records.len() {
            return Err(StorageError::internal(format!("no record at index {index}")));
        }
        Ok(records.remove(index))
    }
}

#[async_trait]
impl AppendLog for MemoryAppendLog {
    #[tracing::instrument(skip_all, fields(record_len = record.len()))]
    async fn append(&self, record: Bytes) -> StorageResult<()> {
        fail_point!("append-log-before-write", |_| {
            Err(StorageError::connection("append-log-before-write fail point"))
        });

        validate_record_size(&record, &self.limits)?;
        self.records.write().push(record);
        Ok(())
    }

    #[tracing::instrument(skip_all)]
    async fn scan(&self) -> StorageResult<Vec<Bytes>> {
        Ok(self.records.read().clone())
    }

    async fn last(&self) -> StorageResult<Option<Bytes>> {
        Ok(self.records.read().last().cloned())
    }

    async fn len(&self) -> StorageResult<u64> {
        Ok(self.records.read().len() as u64)
    }
}
