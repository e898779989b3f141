//! Key management and encryption error types.

use gradeguard_storage::KeyVersion;
use thiserror::Error;

use crate::key::KeyScope;

/// Errors raised by [`KeyRing`](crate::KeyRing) and [`Vault`](crate::Vault).
///
/// # Non-exhaustive
///
/// New variants may be added in future minor releases. Downstream match
/// expressions must include a wildcard arm (`_ =>`).
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CryptoError {
    /// No retained key has the requested version.
    ///
    /// Returned when decrypting a value whose key has been evicted. The vault
    /// never falls back to another key.
    #[error("Key version {version} not found")]
    KeyNotFound {
        /// Version that was looked up.
        version: KeyVersion,
    },

    /// Authentication tag did not verify.
    ///
    /// The ciphertext, tag, nonce or stamped key version was altered, or the
    /// value was sealed under different key material. No plaintext is
    /// released.
    #[error("Integrity check failed")]
    IntegrityError,

    /// A key ring of the wrong scope was supplied.
    #[error("Key ring scope mismatch: expected {expected}, got {actual}")]
    WrongScope {
        /// Scope the consumer requires.
        expected: KeyScope,
        /// Scope of the supplied ring.
        actual: KeyScope,
    },

    /// Attempted to evict the active key.
    #[error("Cannot evict active key version {version}")]
    ActiveKeyEviction {
        /// Version of the active key.
        version: KeyVersion,
    },

    /// Rotation would exceed the retired key bound.
    #[error("Retired key limit of {limit} reached; evict a retired key before rotating")]
    RetiredKeyLimit {
        /// Configured maximum number of retired keys.
        limit: usize,
    },

    /// Keys supplied to restore a ring do not form a valid history.
    #[error("Invalid key set: {message}")]
    InvalidKeySet {
        /// Why the keys were rejected.
        message: String,
    },

    /// The key version counter cannot be incremented further.
    #[error("Key version space exhausted")]
    VersionExhausted,

    /// A serialized sealed value could not be decoded.
    #[error("Malformed sealed value: {message}")]
    MalformedSealedValue {
        /// Description of the decoding failure.
        message: String,
    },

    /// The cipher rejected its inputs for a reason other than integrity.
    #[error("Cipher error: {message}")]
    Cipher {
        /// Description of the cipher failure.
        message: String,
    },
}

impl CryptoError {
    /// Creates a `KeyNotFound` error.
    #[must_use]
    pub fn key_not_found(version: KeyVersion) -> Self {
        Self::KeyNotFound { version }
    }

    /// Creates a `MalformedSealedValue` error.
    #[must_use]
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedSealedValue { message: message.into() }
    }

    /// Creates an `InvalidKeySet` error.
    #[must_use]
    pub fn invalid_key_set(message: impl Into<String>) -> Self {
        Self::InvalidKeySet { message: message.into() }
    }

    /// Creates a `Cipher` error.
    #[must_use]
    pub fn cipher(message: impl Into<String>) -> Self {
        Self::Cipher { message: message.into() }
    }

    /// Returns `true` if the error means stored data could not be trusted or
    /// recovered, as opposed to a caller or configuration mistake.
    #[must_use]
    pub fn is_integrity_failure(&self) -> bool {
        matches!(
            self,
            Self::IntegrityError | Self::KeyNotFound { .. } | Self::MalformedSealedValue { .. }
        )
    }
}

/// Result type alias for key management and encryption operations.
pub type Result<T> = std::result::Result<T, CryptoError>;
