//! # gradeguard audit
//!
//! Tamper-evident audit trail and the authenticated purge built on it.
//!
//! This crate provides:
//! - **Audit ledger**: an append-only SHA-256 hash chain persisted through an
//!   [`AppendLog`](gradeguard_storage::AppendLog), with gap-free sequencing
//!   under concurrent appenders
//! - **Chain verification**: recomputes every entry and reports the first
//!   tampered, missing or truncated sequence
//! - **Purge guard**: constant-time termination secret check and a purge
//!   that is logged before anything is deleted
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//! use gradeguard_audit::{AuditLedger, EventType};
//! use gradeguard_storage::{MemoryAppendLog, SystemClock};
//!
//! # tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap().block_on(async {
//! let ledger = AuditLedger::open(Arc::new(MemoryAppendLog::new()), Arc::new(SystemClock))
//!     .await
//!     .unwrap();
//!
//! let entry = ledger.append("alice", EventType::Login, b"{}").await.unwrap();
//! assert_eq!(entry.sequence.get(), 1);
//! assert!(ledger.verify_chain().await.unwrap().is_intact());
//! # });
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

/// Audit entries and their hash encoding.
pub mod entry;
/// Audit error types.
pub mod error;
/// The hash-chained ledger.
pub mod ledger;
/// Authenticated purge.
pub mod purge;

pub use entry::{AuditEntry, DIGEST_SIZE, Digest, EventType, HASH_DOMAIN};
pub use error::{AuditError, Result};
pub use ledger::{AuditLedger, BreakReason, ChainHead, ChainVerification};
pub use purge::{PurgeGuard, PurgeOutcome, PurgeRecord};
