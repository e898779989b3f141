//! Storage error types and result alias.
//!
//! This module defines the errors the core's persistence collaborators can
//! report. Every [`AppendLog`](crate::AppendLog) and
//! [`RecordPurger`](crate::RecordPurger) implementation must map its internal
//! errors to these standardized variants.
//!
//! # Error Types
//!
//! - [`StorageError::Connection`] - Network or connection-related failures
//! - [`StorageError::Serialization`] - Data encoding/decoding failures
//! - [`StorageError::Internal`] - Backend-specific internal errors
//! - [`StorageError::SizeLimitExceeded`] - Record larger than the configured limit
//!
//! The core never retries any of these. Retry and backoff belong to the
//! collaborator, so an error that reaches the core is final for the
//! operation that triggered it.
//!
//! # Example
//!
//! ```
//! use gradeguard_storage::{StorageError, StorageResult};
//!
//! fn append_somewhere(_record: &[u8]) -> StorageResult<()> {
//!     Err(StorageError::connection("audit sink unreachable"))
//! }
//! ```

use std::sync::Arc;

use thiserror::Error;

/// A boxed error type for source chain tracking.
pub type BoxError = Arc<dyn std::error::Error + Send + Sync>;

/// Result type alias for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors that can occur during collaborator storage operations.
///
/// Errors preserve their source chain via the `#[source]` attribute, enabling
/// debugging tools to display the full error context.
///
/// # Non-exhaustive
///
/// This enum is marked `#[non_exhaustive]`: new variants may be added in
/// future minor releases without a semver-breaking change. Downstream match
/// expressions must include a wildcard arm (`_ =>`).
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    /// Connection or network error.
    ///
    /// The collaborator could not reach its backing store (database down,
    /// disk unmounted, log service unreachable).
    #[error("Connection error: {message}")]
    Connection {
        /// Description of the connection error.
        message: String,
        /// The underlying error that caused this connection failure.
        #[source]
        source: Option<BoxError>,
    },

    /// Serialization or deserialization error.
    ///
    /// A stored record could not be encoded or decoded. For the audit log
    /// this usually indicates corruption.
    #[error("Serialization error: {message}")]
    Serialization {
        /// Description of the serialization error.
        message: String,
        /// The underlying error that caused serialization to fail.
        #[source]
        source: Option<BoxError>,
    },

    /// Internal storage backend error.
    ///
    /// Catch-all for backend-specific errors that don't fit other categories.
    #[error("Internal error: {message}")]
    Internal {
        /// Description of the internal error.
        message: String,
        /// The underlying error that caused this internal failure.
        #[source]
        source: Option<BoxError>,
    },

    /// A record exceeded the configured size limit.
    #[error("{kind} size {actual} exceeds limit {limit}")]
    SizeLimitExceeded {
        /// What was too large (e.g. `"record"`).
        kind: String,
        /// Actual size in bytes.
        actual: usize,
        /// Configured limit in bytes.
        limit: usize,
    },
}

impl StorageError {
    /// Creates a new `Connection` error with the given message.
    #[must_use]
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection { message: message.into(), source: None }
    }

    /// Creates a new `Connection` error with a message and source error.
    #[must_use]
    pub fn connection_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Connection { message: message.into(), source: Some(Arc::new(source)) }
    }

    /// Creates a new `Serialization` error with the given message.
    #[must_use]
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization { message: message.into(), source: None }
    }

    /// Creates a new `Internal` error with the given message.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal { message: message.into(), source: None }
    }

    /// Creates a new `SizeLimitExceeded` error.
    #[must_use]
    pub fn size_limit_exceeded(kind: impl Into<String>, actual: usize, limit: usize) -> Self {
        Self::SizeLimitExceeded { kind: kind.into(), actual, limit }
    }
}

/// Errors raised while validating storage limits.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ConfigError {
    /// A numeric field was below its allowed minimum.
    #[error("{field} must be at least {min}, got {value}")]
    BelowMinimum {
        /// Name of the offending field.
        field: &'static str,
        /// The minimum allowed value.
        min: String,
        /// The value that was supplied.
        value: String,
    },
}
