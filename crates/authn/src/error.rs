//! Authentication error types.
//!
//! This module defines errors that can occur while issuing and verifying
//! access tokens. Verification failures are distinguished so they can be
//! recorded precisely in the audit ledger; callers that answer clients should
//! collapse them with [`AuthError::is_access_denied`].

use gradeguard_crypto::{CryptoError, KeyScope};
use thiserror::Error;

/// Authentication errors.
///
/// # Non-exhaustive
///
/// This enum is marked `#[non_exhaustive]`. New variants may be added in
/// future minor releases without a semver-breaking change. Downstream match
/// expressions must include a wildcard arm (`_ =>`).
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AuthError {
    /// Token is structurally invalid and cannot be decoded.
    #[error("Invalid token format: {message}")]
    Malformed {
        /// Description of the decoding failure.
        message: String,
    },

    /// Signature did not verify under any retained key, or the algorithm is
    /// not accepted.
    #[error("Invalid signature")]
    SignatureInvalid,

    /// Token has expired.
    #[error("Token expired")]
    Expired,

    /// Token was issued by a different authority.
    #[error("Invalid issuer")]
    IssuerMismatch {
        /// Issuer this authority accepts.
        expected: String,
        /// Issuer carried by the token.
        actual: String,
    },

    /// Required claim is missing or empty.
    #[error("Missing claim: {claim}")]
    MissingClaim {
        /// Name of the missing claim.
        claim: String,
    },

    /// The supplied key ring is not a signing ring.
    #[error("Token authority requires a signing key ring, got {actual}")]
    WrongScope {
        /// Scope of the supplied ring.
        actual: KeyScope,
    },

    /// Token could not be signed.
    #[error("Token signing failed: {message}")]
    Signing {
        /// Description of the signing failure.
        message: String,
    },

    /// Key material could not be obtained or converted.
    #[error("Signing key error: {0}")]
    Key(
        /// The underlying key ring error.
        #[source]
        CryptoError,
    ),
}

impl AuthError {
    /// Creates a `Malformed` error.
    #[must_use]
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::Malformed { message: message.into() }
    }

    /// Creates a `MissingClaim` error.
    #[must_use]
    pub fn missing_claim(claim: impl Into<String>) -> Self {
        Self::MissingClaim { claim: claim.into() }
    }

    /// Creates a `Signing` error.
    #[must_use]
    pub fn signing(message: impl Into<String>) -> Self {
        Self::Signing { message: message.into() }
    }

    /// Returns `true` when the error means "do not grant access".
    ///
    /// Every verification failure maps here, so the transport layer can
    /// answer with one uniform denial regardless of the precise cause.
    #[must_use]
    pub fn is_access_denied(&self) -> bool {
        matches!(
            self,
            Self::Malformed { .. }
                | Self::SignatureInvalid
                | Self::Expired
                | Self::IssuerMismatch { .. }
                | Self::MissingClaim { .. }
        )
    }

    /// Short machine-readable reason, used as the audit payload of a
    /// rejected token.
    #[must_use]
    pub fn reason(&self) -> &'static str {
        match self {
            Self::Malformed { .. } => "malformed",
            Self::SignatureInvalid => "signature_invalid",
            Self::Expired => "expired",
            Self::IssuerMismatch { .. } => "issuer_mismatch",
            Self::MissingClaim { .. } => "missing_claim",
            Self::WrongScope { .. } => "wrong_scope",
            Self::Signing { .. } => "signing",
            Self::Key(_) => "key",
        }
    }
}

impl From<jsonwebtoken::errors::Error> for AuthError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        use jsonwebtoken::errors::ErrorKind;

        match err.kind() {
            ErrorKind::InvalidSignature | ErrorKind::InvalidAlgorithm => AuthError::SignatureInvalid,
            ErrorKind::InvalidToken => AuthError::malformed("invalid token structure"),
            _ => AuthError::malformed(format!("token error: {err}")),
        }
    }
}

impl From<CryptoError> for AuthError {
    fn from(err: CryptoError) -> Self {
        AuthError::Key(err)
    }
}

/// Result type alias for authentication operations.
pub type Result<T> = std::result::Result<T, AuthError>;
