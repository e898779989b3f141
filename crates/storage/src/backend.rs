//! Append-log trait definition.
//!
//! This module defines the [`AppendLog`] trait, the durable sink the audit
//! ledger writes its records to. Durability is the implementor's concern; the
//! ledger only relies on the ordering and scan guarantees below.
//!
//! # Design Philosophy
//!
//! The trait is deliberately minimal:
//! - **Records are bytes**: No assumptions about serialization format
//! - **Async by default**: A file, a table or a remote log service all fit
//! - **Ordered**: `scan` returns records in exactly the order they were appended
//! - **Append-only**: There is no update or delete operation
//!
//! Hash chaining, sequencing and verification live in the ledger built on top
//! of this trait, not in the log implementations.
//!
//! # Implementing a Log
//!
//! 1. Implement [`AppendLog`]
//! 2. Map backend-specific errors to [`StorageError`](crate::StorageError)
//! 3. Never reorder, merge or drop records
//!
//! See [`MemoryAppendLog`](crate::MemoryAppendLog) for a reference implementation.

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::StorageResult;

/// Ordered, append-only record sink with full-scan read.
///
/// Implementations must be thread-safe (`Send + Sync`). Callers that need
/// an atomic read-modify-append sequence (the audit ledger does) serialize
/// their own calls; the log itself only has to apply each `append`
/// atomically.
///
/// # Example
///
/// ```
/// use bytes::Bytes;
/// use gradeguard_storage::{AppendLog, MemoryAppendLog};
///
/// # tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap().block_on(async {
/// let log = MemoryAppendLog::new();
/// log.append(Bytes::from_static(b"first")).await.unwrap();
/// log.append(Bytes::from_static(b"second")).await.unwrap();
///
/// let records = log.scan().await.unwrap();
/// assert_eq!(records, vec![Bytes::from("first"), Bytes::from("second")]);
/// # });
/// ```
#[async_trait]
pub trait AppendLog: Send + Sync {
    /// Appends one record to the end of the log.
    ///
    /// On `Ok(())` the record is durable as far as the implementation can
    /// guarantee. On `Err` the record must not have been written.
    #[must_use = "storage operations may fail and errors must be handled"]
    async fn append(&self, record: Bytes) -> StorageResult<()>;

    /// Returns every record in append order.
    #[must_use = "storage operations may fail and errors must be handled"]
    async fn scan(&self) -> StorageResult<Vec<Bytes>>;

    /// Returns the last record, if any.
    ///
    /// The default implementation scans the whole log; implementations with
    /// an index should override it.
    async fn last(&self) -> StorageResult<Option<Bytes>> {
        Ok(self.scan().await?.pop())
    }

    /// Returns the number of records in the log.
    async fn len(&self) -> StorageResult<u64> {
        Ok(self.scan().await?.len() as u64)
    }

    /// Returns `true` when no record has been appended yet.
    async fn is_empty(&self) -> StorageResult<bool> {
        Ok(self.len().await? == 0)
    }
}

#[async_trait]
impl<L: AppendLog + ?Sized> AppendLog for std::sync::Arc<L> {
    async fn append(&self, record: Bytes) -> StorageResult<()> {
        (**self).append(record).await
    }

    async fn scan(&self) -> StorageResult<Vec<Bytes>> {
        (**self).scan().await
    }

    async fn last(&self) -> StorageResult<Option<Bytes>> {
        (**self).last().await
    }

    async fn len(&self) -> StorageResult<u64> {
        (**self).len().await
    }
}
