//! Security core error types.

use gradeguard_audit::AuditError;
use gradeguard_authn::AuthError;
use gradeguard_crypto::CryptoError;
use gradeguard_storage::Sequence;
use thiserror::Error;

use crate::config::ConfigError;

/// Errors raised by [`SecurityCore`](crate::SecurityCore).
///
/// Each variant wraps the error of the component that failed, so callers can
/// still match on the precise cause. For the HTTP layer,
/// [`is_access_denied`](Self::is_access_denied) collapses every
/// authentication failure into one answer.
///
/// # Non-exhaustive
///
/// New variants may be added in future minor releases. Downstream match
/// expressions must include a wildcard arm (`_ =>`).
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CoreError {
    /// The configuration is invalid.
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),

    /// Key management or encryption failed.
    #[error(transparent)]
    Crypto(#[from] CryptoError),

    /// Token issuance or verification failed.
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// The audit ledger or the purge failed.
    #[error(transparent)]
    Audit(#[from] AuditError),

    /// The log already holds an audit chain, but the core was started with
    /// freshly generated key rings.
    #[error("Audit chain resumes at sequence {sequence} but no key rings were restored")]
    KeysNotRestored {
        /// Sequence of the last entry in the existing chain.
        sequence: Sequence,
    },
}

impl CoreError {
    /// Returns `true` if the request must be answered with a uniform
    /// access-denied response.
    #[must_use]
    pub fn is_access_denied(&self) -> bool {
        matches!(self, Self::Auth(err) if err.is_access_denied())
    }

    /// Returns `true` if a sealed value failed its integrity check.
    #[must_use]
    pub fn is_integrity_failure(&self) -> bool {
        matches!(self, Self::Crypto(err) if err.is_integrity_failure())
    }

    /// Returns `true` if the audit trail could not be written, so the
    /// action was not completed.
    #[must_use]
    pub fn is_audit_failure(&self) -> bool {
        matches!(self, Self::Audit(_))
    }
}

/// Result type alias for security core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
