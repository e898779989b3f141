//! Persistence seams for the gradeguard security core.
//!
//! The security core never talks to a database directly. Everything it needs
//! from the outside world goes through the small set of collaborator traits
//! defined here, so the core can be exercised in-process with in-memory
//! implementations and wired to real storage by the host application.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     gradeguard-core                         │
//! │        (SecurityCore: tokens, vault, audit, purge)          │
//! ├─────────────────────────────────────────────────────────────┤
//! │  gradeguard-authn │ gradeguard-crypto │ gradeguard-audit    │
//! ├─────────────────────────────────────────────────────────────┤
//! │                   gradeguard-storage                        │
//! │        AppendLog │ RecordPurger │ Clock │ KeyVersion        │
//! ├──────────────────┬──────────────────────────────────────────┤
//! │ MemoryAppendLog  │   host-provided log / record store       │
//! │ MemoryRecordStore│            (production)                  │
//! └──────────────────┴──────────────────────────────────────────┘
//! ```
//!
//! # Quick Start
//!
//! ```
//! use bytes::Bytes;
//! use gradeguard_storage::{AppendLog, MemoryAppendLog, MemoryRecordStore, RecordPurger};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let log = MemoryAppendLog::new();
//!     log.append(Bytes::from_static(b"{\"sequence\":1}")).await?;
//!     assert_eq!(log.len().await?, 1);
//!
//!     let store = MemoryRecordStore::new();
//!     store.insert("grade:alice:math", Bytes::from_static(b"B+"));
//!     assert_eq!(store.delete_all_sensitive_records().await?, 1);
//!
//!     Ok(())
//! }
//! ```
//!
//! # Available Implementations
//!
//! | Type | Trait | Persistence |
//! |------|-------|-------------|
//! | [`MemoryAppendLog`] | [`AppendLog`] | No |
//! | [`MemoryRecordStore`] | [`RecordPurger`] | No |
//! | [`SystemClock`] | [`Clock`] | n/a |
//! | [`ManualClock`] | [`Clock`] | n/a (tests) |
//!
//! # Error Handling
//!
//! All collaborator operations return [`StorageResult<T>`]. Implementations
//! map their internal errors to the standardized [`StorageError`] variants.
//!
//! # Feature Flags
//!
//! - **`testutil`**: Enables the `testutil` module with failing collaborator doubles, record
//!   generators and assertion macros, plus tamper helpers on [`MemoryAppendLog`]. Enable this in
//!   `[dev-dependencies]` for integration tests.
//! - **`failpoints`**: Activates the `fail` crate's fail points inside the in-memory
//!   implementations for fault-injection tests.

#![deny(unsafe_code)]

pub mod backend;
pub mod clock;
pub mod error;
pub mod memory;
pub mod purge;
pub mod size_limits;
#[cfg(any(test, feature = "testutil"))]
#[allow(clippy::expect_used, clippy::panic)]
pub mod testutil;
pub mod types;

// Re-export primary types at crate root for convenience
pub use backend::AppendLog;
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{BoxError, ConfigError, StorageError, StorageResult};
pub use memory::MemoryAppendLog;
pub use purge::{MemoryRecordStore, RecordPurger};
pub use size_limits::{DEFAULT_MAX_RECORD_SIZE, SizeLimits, validate_record_size};
pub use types::{KeyVersion, Sequence};
