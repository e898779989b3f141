//! Token header validation.
//!
//! This module provides security checks applied to the token header before
//! any signature verification, ensuring only the EdDSA algorithm is accepted
//! and that key identifiers are well-formed key versions.
//!
//! # Security
//!
//! - Strict algorithm checks to prevent algorithm substitution attacks
//! - Symmetric algorithms and "none" are always rejected
//! - A `kid` only narrows which retained key is tried; it never selects a key
//!   outside the ring

use gradeguard_storage::KeyVersion;

use crate::error::AuthError;

/// Forbidden algorithms that are never accepted for security reasons.
///
/// - `none`: No signature verification (trivially bypassable)
/// - `HS256`, `HS384`, `HS512`: Symmetric algorithms (shared secret vulnerability)
pub const FORBIDDEN_ALGORITHMS: &[&str] = &["none", "HS256", "HS384", "HS512"];

/// Accepted algorithms. Tokens are signed with Ed25519 only.
pub const ACCEPTED_ALGORITHMS: &[&str] = &["EdDSA"];

/// Maximum length of a `kid` header (decimal digits of `u32::MAX`).
const MAX_KID_LEN: usize = 10;

/// Validate a token algorithm against security policies.
///
/// # Errors
///
/// Returns [`AuthError::SignatureInvalid`] if the algorithm is forbidden or
/// not in [`ACCEPTED_ALGORITHMS`]. The offending value is logged, not
/// returned.
///
/// # Examples
///
/// ```
/// use gradeguard_authn::validation::validate_algorithm;
///
/// assert!(validate_algorithm("EdDSA").is_ok());
/// assert!(validate_algorithm("RS256").is_err());
/// assert!(validate_algorithm("none").is_err());
/// ```
pub fn validate_algorithm(alg: &str) -> Result<(), AuthError> {
    if FORBIDDEN_ALGORITHMS.contains(&alg) {
        tracing::warn!(alg, "token rejected: forbidden algorithm");
        return Err(AuthError::SignatureInvalid);
    }

    if !ACCEPTED_ALGORITHMS.contains(&alg) {
        tracing::warn!(alg, "token rejected: algorithm not accepted");
        return Err(AuthError::SignatureInvalid);
    }

    Ok(())
}

/// Parse a `kid` header into a key version.
///
/// Returns `None` for anything that is not a canonical positive decimal
/// `u32` (leading zeros, signs, whitespace, overlong input).
///
/// # Examples
///
/// ```
/// use gradeguard_authn::validation::parse_kid;
/// use gradeguard_storage::KeyVersion;
///
/// assert_eq!(parse_kid("3"), Some(KeyVersion(3)));
/// assert_eq!(parse_kid("03"), None);
/// assert_eq!(parse_kid("key-3"), None);
/// ```
#[must_use]
pub fn parse_kid(kid: &str) -> Option<KeyVersion> {
    if kid.is_empty()
        || kid.len() > MAX_KID_LEN
        || kid.starts_with('0')
        || !kid.bytes().all(|b| b.is_ascii_digit())
    {
        return None;
    }
    kid.parse::<u32>().ok().map(KeyVersion)
}
