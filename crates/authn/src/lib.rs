//! # gradeguard authn
//!
//! Access token issuance and verification for the gradeguard security core.
//!
//! This crate provides:
//! - **Token authority**: mints EdDSA-signed, expiring, issuer-bound tokens
//!   and verifies them against a rotating signing key ring
//! - **Algorithm validation**: only EdDSA is accepted; `none` and symmetric
//!   algorithms are rejected before any key is touched
//! - **Uniform denial**: every verification failure classifies as access
//!   denied, while keeping the precise reason for the audit trail
//!
//! ## Example
//!
//! ```
//! use std::{sync::Arc, time::Duration};
//! use gradeguard_authn::{AuthError, TokenAuthority};
//! use gradeguard_crypto::{KeyRing, KeyScope};
//! use gradeguard_storage::SystemClock;
//!
//! # fn main() -> Result<(), AuthError> {
//! let clock = Arc::new(SystemClock);
//! let ring = Arc::new(KeyRing::new(KeyScope::Signing, clock.clone()));
//! let authority = TokenAuthority::new("gradeguard", ring, clock)?;
//!
//! let token = authority.issue("alice", Duration::from_secs(3600))?;
//! let subject = authority.verify(token.as_str())?;
//! assert_eq!(subject, "alice");
//!
//! let denied = authority.verify("not-a-token").unwrap_err();
//! assert!(denied.is_access_denied());
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

/// Authentication error types.
pub mod error;
/// Shared test utilities.
#[cfg(any(test, feature = "testutil"))]
#[allow(clippy::expect_used, clippy::panic)]
pub mod testutil;
/// Token issuance and verification.
pub mod token;
/// Header validation.
pub mod validation;

// Re-export key types for convenience
pub use error::{AuthError, Result};
pub use token::{Token, TokenAuthority, TokenClaims, TokenHeader};
pub use validation::{ACCEPTED_ALGORITHMS, FORBIDDEN_ALGORITHMS, validate_algorithm};
