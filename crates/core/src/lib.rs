//! # gradeguard core
//!
//! Audited, fail-closed security facade for student grade records.
//!
//! [`SecurityCore`] is built from a validated [`CoreConfig`] plus the three
//! collaborators the host provides (an append log, a record purger and a
//! clock). It owns one encryption key ring and one signing key ring, and
//! routes every security-relevant action through the audit ledger.
//!
//! [`SecurityCore::new`] starts a fresh deployment. A restarted process
//! passes the rings it exported with [`SecurityCore::key_rings`] to
//! [`SecurityCore::restore`]; starting fresh rings over an existing audit
//! chain is refused with [`CoreError::KeysNotRestored`].
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │                 SecurityCore                 │
//! ├──────────────┬──────────────┬────────────────┤
//! │    Vault     │ TokenAuthority│  PurgeGuard   │
//! │ (encryption) │  (signing)    │               │
//! ├──────────────┴──────────────┼────────────────┤
//! │        KeyRing × 2          │  AuditLedger   │
//! └─────────────────────────────┴───────┬────────┘
//!                                       │
//!                    AppendLog · RecordPurger · Clock
//! ```
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//! use gradeguard_core::{CoreConfig, SecurityCore};
//! use gradeguard_storage::{MemoryAppendLog, MemoryRecordStore, SystemClock};
//!
//! # tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap().block_on(async {
//! let config = CoreConfig::builder()
//!     .issuer("gradeguard")
//!     .termination_secret("district-termination-secret")
//!     .build()
//!     .unwrap();
//! let core = SecurityCore::new(
//!     config,
//!     Arc::new(MemoryAppendLog::new()),
//!     Arc::new(MemoryRecordStore::new()),
//!     Arc::new(SystemClock),
//! )
//! .await
//! .unwrap();
//!
//! let token = core.issue_token("alice", None).await.unwrap();
//! assert_eq!(core.verify_token(token.as_str()).await.unwrap(), "alice");
//!
//! let sealed = core.encrypt("alice", b"B+").await.unwrap();
//! assert_eq!(core.decrypt("alice", &sealed).await.unwrap().as_slice(), b"B+");
//!
//! assert!(core.verify_chain().await.unwrap().is_intact());
//! # });
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

/// Security core configuration.
pub mod config;
/// Security core error types.
pub mod error;
/// The audited facade.
pub mod security;

pub use config::{ConfigError, CoreConfig, DEFAULT_TOKEN_TTL, MIN_SECRET_LEN};
pub use error::{CoreError, Result};
pub use security::{ANONYMOUS_ACTOR, KeyRings, SecurityCore};
