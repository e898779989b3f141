//! # gradeguard crypto
//!
//! Versioned key management and envelope encryption.
//!
//! This crate provides:
//! - **Key ring**: one active key plus a bounded retired history, with
//!   explicit rotation and eviction
//! - **Vault**: AES-256-GCM sealing stamped with the key version, so values
//!   survive rotation until their key is evicted
//! - **Sealed value codec**: a self-describing binary form and a JSON form
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//! use gradeguard_crypto::{KeyRing, KeyScope, SealedValue, Vault};
//! use gradeguard_storage::SystemClock;
//!
//! # fn main() -> Result<(), gradeguard_crypto::CryptoError> {
//! let ring = Arc::new(KeyRing::new(KeyScope::Encryption, Arc::new(SystemClock)));
//! let vault = Vault::new(Arc::clone(&ring))?;
//!
//! let sealed = vault.encrypt(b"B+")?;
//! let stored = sealed.to_bytes();
//!
//! ring.rotate()?;
//! let opened = vault.decrypt(&SealedValue::from_bytes(&stored)?)?;
//! assert_eq!(opened.as_slice(), b"B+");
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

/// Key management and encryption error types.
pub mod error;
/// Versioned key material.
pub mod key;
/// Key ring rotation and eviction.
pub mod keyring;
/// Envelope encryption.
pub mod vault;

pub use error::{CryptoError, Result};
pub use key::{KEY_SIZE, Key, KeyScope};
pub use keyring::{DEFAULT_MAX_RETIRED, KeyRing};
pub use vault::{NONCE_SIZE, SealedValue, TAG_SIZE, Vault};
