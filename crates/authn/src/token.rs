//! Access token issuance and verification.
//!
//! Tokens are compact JWS strings (`header.payload.signature`, base64url)
//! signed with Ed25519. The header `kid` carries the signing key version so a
//! verifier can pick the right retained key after rotation.
//!
//! # Verification order
//!
//! 1. Structure: three base64url segments and a readable header, else
//!    [`AuthError::Malformed`]
//! 2. Algorithm must be EdDSA, else [`AuthError::SignatureInvalid`]
//! 3. Signature under the `kid`-named retained key, or under any retained key
//!    when `kid` is absent or unknown, else [`AuthError::SignatureInvalid`]
//! 4. Claims parse, else [`AuthError::Malformed`]
//! 5. `now >= exp` gives [`AuthError::Expired`]
//! 6. Issuer mismatch gives [`AuthError::IssuerMismatch`]
//!
//! No claim is trusted before its signature has been checked.
//!
//! # Example
//!
//! ```
//! use std::{sync::Arc, time::Duration};
//! use gradeguard_authn::TokenAuthority;
//! use gradeguard_crypto::{KeyRing, KeyScope};
//! use gradeguard_storage::SystemClock;
//!
//! # fn main() -> Result<(), gradeguard_authn::AuthError> {
//! let clock = Arc::new(SystemClock);
//! let ring = Arc::new(KeyRing::new(KeyScope::Signing, clock.clone()));
//! let authority = TokenAuthority::new("gradeguard", ring, clock)?;
//!
//! let token = authority.issue("alice", Duration::from_secs(2 * 3600))?;
//! assert_eq!(authority.verify(token.as_str())?, "alice");
//! # Ok(())
//! # }
//! ```

use std::{fmt, sync::Arc, time::Duration};

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::{DateTime, Utc};
use ed25519_dalek::SigningKey;
use gradeguard_crypto::{KEY_SIZE, Key, KeyRing, KeyScope};
use gradeguard_storage::{Clock, KeyVersion};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, errors::ErrorKind};
use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use crate::{
    error::{AuthError, Result},
    validation::{parse_kid, validate_algorithm},
};

/// PKCS#8 v1 DER prefix for a raw 32-byte Ed25519 seed.
const ED25519_PKCS8_PREFIX: [u8; 16] = [
    0x30, 0x2e, // SEQUENCE, 46 bytes
    0x02, 0x01, 0x00, // INTEGER version 0
    0x30, 0x05, // SEQUENCE, 5 bytes (algorithm identifier)
    0x06, 0x03, 0x2b, 0x65, 0x70, // OID 1.3.101.112 (Ed25519)
    0x04, 0x22, // OCTET STRING, 34 bytes
    0x04, 0x20, // OCTET STRING, 32 bytes (the seed)
];

/// Token claims.
///
/// ```json
/// {
///   "sub": "alice",
///   "iss": "gradeguard",
///   "iat": 1725177600,
///   "exp": 1725184800
/// }
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Subject the token was issued to.
    pub sub: String,
    /// Issuer, the name of the authority that signed the token.
    pub iss: String,
    /// Issued at (seconds since epoch).
    pub iat: i64,
    /// Expiration time (seconds since epoch).
    pub exp: i64,
}

/// Header fields read before the signature is verified.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct TokenHeader {
    /// Signature algorithm name.
    pub alg: String,
    /// Key identifier: the signing key version in decimal.
    #[serde(default)]
    pub kid: Option<String>,
    /// Media type, normally `JWT`.
    #[serde(default)]
    pub typ: Option<String>,
}

/// A signed bearer token together with the claims it carries.
#[derive(Clone, PartialEq, Eq)]
pub struct Token {
    encoded: String,
    claims: TokenClaims,
    key_version: KeyVersion,
}

impl Token {
    /// The compact serialized token.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.encoded
    }

    /// Consumes the token, returning the compact serialized form.
    #[must_use]
    pub fn into_string(self) -> String {
        self.encoded
    }

    /// The claims that were signed.
    #[must_use]
    pub fn claims(&self) -> &TokenClaims {
        &self.claims
    }

    /// Version of the key that signed the token.
    #[must_use]
    pub fn key_version(&self) -> KeyVersion {
        self.key_version
    }

    /// Instant at which the token stops verifying.
    #[must_use]
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.claims.exp, 0)
    }
}

impl AsRef<str> for Token {
    fn as_ref(&self) -> &str {
        &self.encoded
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Token")
            .field("encoded", &"[REDACTED]")
            .field("claims", &self.claims)
            .field("key_version", &self.key_version)
            .finish()
    }
}

/// Split a token into its three segments, checking each is base64url.
fn split_token(token: &str) -> Result<[&str; 3]> {
    let parts: Vec<&str> = token.split('.').collect();
    let [header, payload, signature] = parts[..] else {
        return Err(AuthError::malformed("token must have 3 parts separated by dots"));
    };
    if header.is_empty() || payload.is_empty() {
        return Err(AuthError::malformed("token header and payload must not be empty"));
    }
    for (name, segment) in [("header", header), ("payload", payload), ("signature", signature)] {
        if URL_SAFE_NO_PAD.decode(segment).is_err() {
            return Err(AuthError::malformed(format!("token {name} is not base64url")));
        }
    }
    Ok([header, payload, signature])
}

/// Decode the token header without verification.
///
/// # Errors
///
/// Returns [`AuthError::Malformed`] if the token is not three base64url
/// segments or the header is not a JSON object with an `alg` field.
pub fn decode_token_header(token: &str) -> Result<TokenHeader> {
    let [header, ..] = split_token(token)?;
    let bytes = URL_SAFE_NO_PAD
        .decode(header)
        .map_err(|e| AuthError::malformed(format!("failed to decode token header: {e}")))?;
    serde_json::from_slice(&bytes)
        .map_err(|e| AuthError::malformed(format!("failed to parse token header: {e}")))
}

/// Decode token claims without verification.
///
/// Only for diagnostics; never make an access decision on the result.
///
/// # Errors
///
/// Returns [`AuthError::Malformed`] if the payload does not decode or parse.
pub fn decode_token_claims(token: &str) -> Result<TokenClaims> {
    let [_, payload, _] = split_token(token)?;
    let bytes = URL_SAFE_NO_PAD
        .decode(payload)
        .map_err(|e| AuthError::malformed(format!("failed to decode token payload: {e}")))?;
    serde_json::from_slice(&bytes)
        .map_err(|e| AuthError::malformed(format!("failed to parse token claims: {e}")))
}

fn encoding_key(key: &Key) -> EncodingKey {
    let mut der = Zeroizing::new(Vec::with_capacity(ED25519_PKCS8_PREFIX.len() + KEY_SIZE));
    der.extend_from_slice(&ED25519_PKCS8_PREFIX);
    der.extend_from_slice(key.material());
    EncodingKey::from_ed_der(&der)
}

fn decoding_key(key: &Key) -> Result<DecodingKey> {
    let verifying_key = SigningKey::from_bytes(key.material()).verifying_key();
    DecodingKey::from_ed_components(&URL_SAFE_NO_PAD.encode(verifying_key.to_bytes()))
        .map_err(|e| AuthError::signing(format!("invalid verifying key: {e}")))
}

fn validation() -> Validation {
    let mut validation = Validation::new(Algorithm::EdDSA);
    // Time and issuer checks run after signature verification, against the
    // injected clock.
    validation.validate_exp = false;
    validation.validate_nbf = false;
    validation.validate_aud = false;
    validation.leeway = 0;
    validation.required_spec_claims.clear();
    validation
}

/// Mints and verifies access tokens with keys from a signing [`KeyRing`].
///
/// Holds no per-token state; verification is a pure function of the token,
/// the ring's retained keys and the clock.
#[derive(Clone)]
pub struct TokenAuthority {
    issuer: String,
    keyring: Arc<KeyRing>,
    clock: Arc<dyn Clock>,
}

impl TokenAuthority {
    /// Creates an authority for `issuer` over a signing-scoped ring.
    ///
    /// # Errors
    ///
    /// - [`AuthError::MissingClaim`] if `issuer` is empty
    /// - [`AuthError::WrongScope`] if the ring is not signing-scoped
    pub fn new(
        issuer: impl Into<String>,
        keyring: Arc<KeyRing>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        let issuer = issuer.into();
        if issuer.is_empty() {
            return Err(AuthError::missing_claim("iss"));
        }
        if keyring.scope() != KeyScope::Signing {
            return Err(AuthError::WrongScope { actual: keyring.scope() });
        }
        Ok(Self { issuer, keyring, clock })
    }

    /// The issuer name stamped into and required of every token.
    #[must_use]
    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    /// The signing key ring.
    #[must_use]
    pub fn keyring(&self) -> &Arc<KeyRing> {
        &self.keyring
    }

    /// Issues a token for `subject` valid for `ttl` (truncated to whole
    /// seconds), signed with the active key.
    ///
    /// # Errors
    ///
    /// - [`AuthError::MissingClaim`] if `subject` is empty
    /// - [`AuthError::Signing`] if the expiry overflows or signing fails
    #[tracing::instrument(skip(self), fields(ttl_secs = ttl.as_secs()))]
    pub fn issue(&self, subject: &str, ttl: Duration) -> Result<Token> {
        if subject.is_empty() {
            return Err(AuthError::missing_claim("sub"));
        }

        let key = self.keyring.active();
        let iat = self.clock.now().timestamp();
        let exp = i64::try_from(ttl.as_secs())
            .ok()
            .and_then(|ttl| iat.checked_add(ttl))
            .ok_or_else(|| AuthError::signing("ttl out of range"))?;
        let claims =
            TokenClaims { sub: subject.to_owned(), iss: self.issuer.clone(), iat, exp };

        let mut header = Header::new(Algorithm::EdDSA);
        header.kid = Some(key.version().to_string());

        let encoded = jsonwebtoken::encode(&header, &claims, &encoding_key(&key))
            .map_err(|e| AuthError::signing(e.to_string()))?;

        tracing::debug!(key_version = %key.version(), exp, "token issued");
        Ok(Token { encoded, claims, key_version: key.version() })
    }

    /// Verifies a token and returns its subject.
    ///
    /// # Errors
    ///
    /// See [`verify_claims`](Self::verify_claims).
    pub fn verify(&self, token: &str) -> Result<String> {
        self.verify_claims(token).map(|claims| claims.sub)
    }

    /// Verifies a token and returns all of its claims.
    ///
    /// # Errors
    ///
    /// Returns the first failing check in the order documented at module
    /// level: [`AuthError::Malformed`], [`AuthError::SignatureInvalid`],
    /// [`AuthError::Expired`], [`AuthError::IssuerMismatch`].
    #[tracing::instrument(skip_all)]
    pub fn verify_claims(&self, token: &str) -> Result<TokenClaims> {
        let header = decode_token_header(token)?;
        validate_algorithm(&header.alg)?;

        let named = header
            .kid
            .as_deref()
            .and_then(parse_kid)
            .and_then(|version| self.keyring.find(version).ok());
        let candidates = match named {
            Some(key) => vec![key],
            None => self.keyring.retained_keys(),
        };

        let claims = verify_signature(token, &candidates)?;

        let now = self.clock.now().timestamp();
        if now >= claims.exp {
            tracing::debug!(exp = claims.exp, now, "token rejected: expired");
            return Err(AuthError::Expired);
        }
        if claims.iss != self.issuer {
            tracing::warn!(iss = %claims.iss, "token rejected: issuer mismatch");
            return Err(AuthError::IssuerMismatch {
                expected: self.issuer.clone(),
                actual: claims.iss,
            });
        }

        Ok(claims)
    }
}

impl fmt::Debug for TokenAuthority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenAuthority")
            .field("issuer", &self.issuer)
            .field("keyring", &self.keyring)
            .finish_non_exhaustive()
    }
}

/// Try each candidate key until one verifies the signature.
fn verify_signature(token: &str, candidates: &[Arc<Key>]) -> Result<TokenClaims> {
    let validation = validation();
    for key in candidates {
        match jsonwebtoken::decode::<TokenClaims>(token, &decoding_key(key)?, &validation) {
            Ok(data) => {
                tracing::debug!(key_version = %key.version(), "token signature verified");
                return Ok(data.claims);
            },
            Err(e) if matches!(e.kind(), ErrorKind::InvalidSignature) => continue,
            Err(e) => return Err(e.into()),
        }
    }
    tracing::warn!(candidates = candidates.len(), "token rejected: signature did not verify");
    Err(AuthError::SignatureInvalid)
}
