//! Audit error types.

use gradeguard_storage::StorageError;
use thiserror::Error;

/// Errors raised by [`AuditLedger`](crate::AuditLedger) and
/// [`PurgeGuard`](crate::PurgeGuard).
///
/// A failed append means the audited action did not happen as far as the
/// caller is concerned: the ledger head is left untouched and nothing was
/// written.
///
/// # Non-exhaustive
///
/// New variants may be added in future minor releases. Downstream match
/// expressions must include a wildcard arm (`_ =>`).
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AuditError {
    /// The append log or the record purger failed.
    #[error("Audit storage error: {0}")]
    Storage(#[from] StorageError),

    /// An entry or payload could not be encoded or decoded.
    #[error("Audit serialization error: {message}")]
    Serialization {
        /// Description of the failure.
        message: String,
    },

    /// The ledger has used every sequence number.
    #[error("Audit sequence space exhausted")]
    SequenceExhausted,
}

impl AuditError {
    /// Creates a `Serialization` error.
    #[must_use]
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization { message: message.into() }
    }
}

impl From<serde_json::Error> for AuditError {
    fn from(err: serde_json::Error) -> Self {
        Self::serialization(err.to_string())
    }
}

/// Result type alias for audit operations.
pub type Result<T> = std::result::Result<T, AuditError>;
