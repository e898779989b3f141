//! Shared test utilities for authentication testing.
//!
//! This module provides helpers for building token authorities on a manual
//! clock, generating foreign Ed25519 keys, signing tokens outside any
//! authority, and crafting raw token strings for attack testing. It is
//! feature-gated behind `testutil` to prevent leaking into production builds.
//!
//! # Usage
//!
//! In integration tests, enable the feature in `Cargo.toml`:
//!
//! ```toml
//! [dev-dependencies]
//! gradeguard-authn = { path = "../authn", features = ["testutil"] }
//! ```
//!
//! Then import helpers:
//!
//! ```no_run
//! // Requires the `testutil` feature to be enabled.
//! use gradeguard_authn::testutil::{test_authority, craft_raw_token};
//! ```

use std::sync::Arc;

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use ed25519_dalek::SigningKey;
use gradeguard_crypto::{KeyRing, KeyScope};
use gradeguard_storage::ManualClock;
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use rand_core::OsRng;
use zeroize::Zeroizing;

use crate::token::{TokenAuthority, TokenClaims};

/// Builds an authority for `issuer` on a fresh signing ring and a manual clock.
///
/// The returned clock is shared with the authority and its ring, so
/// advancing it moves token expiry.
///
/// # Panics
///
/// Panics if `issuer` is empty.
pub fn test_authority(issuer: &str) -> (TokenAuthority, ManualClock) {
    let clock = ManualClock::default();
    let ring = Arc::new(KeyRing::new(KeyScope::Signing, Arc::new(clock.clone())));
    let authority =
        TokenAuthority::new(issuer, ring, Arc::new(clock.clone())).expect("valid test authority");
    (authority, clock)
}

/// Generates a fresh Ed25519 key unrelated to any key ring.
///
/// Returns the private key in PKCS#8 DER format wrapped in [`Zeroizing`]
/// (suitable for [`EncodingKey::from_ed_der`]).
pub fn generate_foreign_key() -> Zeroizing<Vec<u8>> {
    let signing_key = SigningKey::generate(&mut OsRng);

    let private_bytes: Zeroizing<[u8; 32]> = Zeroizing::new(signing_key.to_bytes());
    let mut pkcs8_der = Zeroizing::new(vec![
        0x30, 0x2e, // SEQUENCE, 46 bytes
        0x02, 0x01, 0x00, // INTEGER version 0
        0x30, 0x05, // SEQUENCE, 5 bytes (algorithm identifier)
        0x06, 0x03, 0x2b, 0x65, 0x70, // OID 1.3.101.112 (Ed25519)
        0x04, 0x22, // OCTET STRING, 34 bytes
        0x04, 0x20, // OCTET STRING, 32 bytes (the actual key)
    ]);
    pkcs8_der.extend_from_slice(&*private_bytes);
    pkcs8_der
}

/// Signs `claims` with an arbitrary PKCS#8 Ed25519 key, bypassing any
/// authority. `kid` is placed in the header when given.
///
/// # Panics
///
/// Panics if encoding fails (should not happen with valid inputs).
pub fn sign_with_key(pkcs8_der: &[u8], kid: Option<&str>, claims: &TokenClaims) -> String {
    let mut header = Header::new(Algorithm::EdDSA);
    header.kid = kid.map(str::to_owned);
    jsonwebtoken::encode(&header, claims, &EncodingKey::from_ed_der(pkcs8_der))
        .expect("Failed to encode test token")
}

/// Builds claims for `subject` issued by `issuer`, valid from `iat` for
/// `ttl_secs` seconds.
pub fn claims(subject: &str, issuer: &str, iat: i64, ttl_secs: i64) -> TokenClaims {
    TokenClaims { sub: subject.to_owned(), iss: issuer.to_owned(), iat, exp: iat + ttl_secs }
}

/// Creates a raw token string from arbitrary header and payload JSON.
///
/// The resulting token has the structure `{header_b64}.{payload_b64}.` with
/// an empty signature. This is useful for testing rejection of malformed or
/// attack tokens (e.g., `alg: "none"`, algorithm confusion).
///
/// # Panics
///
/// Panics if JSON serialization fails.
pub fn craft_raw_token(
    header_json: &serde_json::Value,
    payload_json: &serde_json::Value,
) -> String {
    let header_b64 = URL_SAFE_NO_PAD.encode(serde_json::to_vec(header_json).expect("header json"));
    let payload_b64 =
        URL_SAFE_NO_PAD.encode(serde_json::to_vec(payload_json).expect("payload json"));
    format!("{header_b64}.{payload_b64}.")
}

/// Asserts that a [`Result<T, AuthError>`] is an `Err` matching the given
/// [`AuthError`](crate::AuthError) variant.
///
/// # Examples
///
/// ```no_run
/// // Requires the `testutil` feature to be enabled.
/// use gradeguard_authn::assert_auth_error;
/// use gradeguard_authn::error::AuthError;
///
/// let result: Result<(), AuthError> = Err(AuthError::Expired);
/// assert_auth_error!(result, Expired);
/// ```
#[macro_export]
macro_rules! assert_auth_error {
    ($result:expr, $variant:ident) => {
        assert!(
            matches!($result, Err($crate::error::AuthError::$variant { .. })),
            "expected AuthError::{}, got: {:?}",
            stringify!($variant),
            $result,
        );
    };
    ($result:expr, $variant:ident, $msg:expr) => {
        assert!(
            matches!($result, Err($crate::error::AuthError::$variant { .. })),
            "{}: expected AuthError::{}, got: {:?}",
            $msg,
            stringify!($variant),
            $result,
        );
    };
}

#[cfg(test)]
#[allow(clippy::expect_used)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::error::AuthError;

    #[test]
    fn test_generate_foreign_key_is_pkcs8() {
        let der = generate_foreign_key();
        // PKCS#8 DER for Ed25519 is 48 bytes (16 header + 32 key)
        assert_eq!(der.len(), 48);
        assert_ne!(*der, *generate_foreign_key(), "each call should produce a unique key");
    }

    #[test]
    fn test_sign_with_key_produces_three_part_token() {
        let der = generate_foreign_key();
        let token = sign_with_key(&der, Some("1"), &claims("alice", "gradeguard", 0, 60));
        let parts: Vec<&str> = token.split('.').collect();
        assert_eq!(parts.len(), 3, "token should have header.payload.signature");
        assert!(!parts[2].is_empty(), "signature should not be empty");
    }

    #[test]
    fn test_craft_raw_token_format() {
        let token = craft_raw_token(&json!({"alg": "none"}), &json!({"sub": "test"}));
        let parts: Vec<&str> = token.split('.').collect();
        assert_eq!(parts.len(), 3);
        assert!(parts[2].is_empty(), "signature should be empty for raw tokens");
    }

    #[test]
    fn test_test_authority_verifies_own_tokens() {
        let (authority, _) = test_authority("gradeguard");
        let token =
            authority.issue("alice", std::time::Duration::from_secs(60)).expect("issue");
        assert_eq!(authority.verify(token.as_str()).expect("verify"), "alice");
    }

    #[test]
    fn test_assert_auth_error_variants() {
        let result: Result<(), AuthError> = Err(AuthError::Expired);
        assert_auth_error!(result, Expired);

        let result: Result<(), AuthError> = Err(AuthError::SignatureInvalid);
        assert_auth_error!(result, SignatureInvalid, "signature should be invalid");

        let result: Result<(), AuthError> = Err(AuthError::malformed("x"));
        assert_auth_error!(result, Malformed);
    }
}
