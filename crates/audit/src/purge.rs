//! Authenticated, log-first purge of all sensitive records.
//!
//! [`PurgeGuard::execute_purge`] writes a `purge_attempt` entry before it
//! does anything else, authorized or not. Deletion only starts once that
//! entry is durable, so no purge can ever happen without a trace.
//!
//! # Flow
//!
//! ```text
//! authenticate ──► append purge_attempt ──✗──► Err (nothing deleted)
//!                        │
//!              invalid ──┴──► Denied
//!                valid
//!                  │
//!                  ▼
//!   delete_all_sensitive_records ──✗──► append purge_failed, Err
//!                  │
//!                  ▼
//!        append purge_completed ──► Executed
//! ```

use std::{fmt, sync::Arc};

use chrono::{DateTime, Utc};
use gradeguard_storage::{Clock, RecordPurger};
use serde::{Deserialize, Serialize};
use sha2::{Digest as _, Sha256};
use subtle::ConstantTimeEq;
use tokio::sync::Mutex;
use zeroize::Zeroizing;

use crate::{
    entry::{AuditEntry, DIGEST_SIZE, EventType},
    error::Result,
    ledger::AuditLedger,
};

/// Audit payload describing one purge request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurgeRecord {
    /// When the purge was requested.
    pub requested_at: DateTime<Utc>,
    /// Whether the presented secret matched.
    pub authenticator_valid: bool,
    /// Whether the sensitive records were deleted.
    pub executed: bool,
    /// Number of records deleted, once known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted: Option<u64>,
}

impl PurgeRecord {
    fn to_payload(self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(&self)?)
    }
}

/// Result of a purge request that reached the ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PurgeOutcome {
    /// The secret did not match; nothing was deleted.
    Denied {
        /// The logged `purge_attempt` entry.
        attempt: AuditEntry,
    },
    /// The records were deleted.
    Executed {
        /// Number of records deleted.
        deleted: u64,
        /// The logged `purge_attempt` entry.
        attempt: AuditEntry,
        /// The logged `purge_completed` entry.
        completion: AuditEntry,
    },
}

impl PurgeOutcome {
    /// Returns `true` if the records were deleted.
    #[must_use]
    pub const fn is_executed(&self) -> bool {
        matches!(self, Self::Executed { .. })
    }

    /// The `purge_attempt` entry written for this request.
    #[must_use]
    pub const fn attempt(&self) -> &AuditEntry {
        match self {
            Self::Denied { attempt } | Self::Executed { attempt, .. } => attempt,
        }
    }
}

/// Gatekeeper for the irreversible purge.
///
/// Holds only the SHA-256 of the termination secret. Presented secrets are
/// hashed and compared in constant time, so neither their content nor their
/// length shortens the comparison.
pub struct PurgeGuard {
    secret_digest: Zeroizing<[u8; DIGEST_SIZE]>,
    ledger: Arc<AuditLedger>,
    purger: Arc<dyn RecordPurger>,
    clock: Arc<dyn Clock>,
    in_progress: Mutex<()>,
}

impl PurgeGuard {
    /// Creates a guard for `secret`.
    ///
    /// Secret strength is enforced by the caller's configuration.
    pub fn new(
        secret: &[u8],
        ledger: Arc<AuditLedger>,
        purger: Arc<dyn RecordPurger>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            secret_digest: Zeroizing::new(Sha256::digest(secret).into()),
            ledger,
            purger,
            clock,
            in_progress: Mutex::new(()),
        }
    }

    /// The ledger purge requests are logged to.
    #[must_use]
    pub fn ledger(&self) -> &Arc<AuditLedger> {
        &self.ledger
    }

    /// Checks `presented` against the termination secret in constant time.
    #[must_use]
    pub fn authenticate(&self, presented: &[u8]) -> bool {
        let presented: Zeroizing<[u8; DIGEST_SIZE]> =
            Zeroizing::new(Sha256::digest(presented).into());
        presented.as_slice().ct_eq(self.secret_digest.as_slice()).into()
    }

    /// Authenticates `presented` and, if it matches, deletes every sensitive
    /// record.
    ///
    /// Concurrent calls are serialized.
    ///
    /// # Errors
    ///
    /// - [`AuditError::Storage`](crate::AuditError::Storage) if the
    ///   `purge_attempt` entry cannot be written (nothing is deleted), or if
    ///   deletion fails (a `purge_failed` entry is attempted first)
    /// - any error from writing the `purge_completed` entry; the records are
    ///   already gone at that point
    #[tracing::instrument(skip(self, presented))]
    pub async fn execute_purge(&self, actor: &str, presented: &[u8]) -> Result<PurgeOutcome> {
        let _serialized = self.in_progress.lock().await;

        let authenticator_valid = self.authenticate(presented);
        let mut record = PurgeRecord {
            requested_at: self.clock.now(),
            authenticator_valid,
            executed: false,
            deleted: None,
        };

        let attempt =
            self.ledger.append(actor, EventType::PurgeAttempt, &record.to_payload()?).await?;

        if !authenticator_valid {
            tracing::warn!(actor, sequence = attempt.sequence.get(), "purge denied");
            return Ok(PurgeOutcome::Denied { attempt });
        }

        let deleted = match self.purger.delete_all_sensitive_records().await {
            Ok(deleted) => deleted,
            Err(err) => {
                tracing::error!(actor, error = %err, "purge deletion failed");
                if let Err(log_err) = self
                    .ledger
                    .append(actor, EventType::PurgeFailed, &record.to_payload()?)
                    .await
                {
                    tracing::error!(error = %log_err, "failed to record purge failure");
                }
                return Err(err.into());
            },
        };

        record.executed = true;
        record.deleted = Some(deleted);
        let completion =
            self.ledger.append(actor, EventType::PurgeCompleted, &record.to_payload()?).await?;

        tracing::warn!(actor, deleted, "sensitive records purged");
        Ok(PurgeOutcome::Executed { deleted, attempt, completion })
    }
}

impl fmt::Debug for PurgeGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PurgeGuard")
            .field("secret_digest", &"[REDACTED]")
            .field("ledger", &self.ledger)
            .finish_non_exhaustive()
    }
}
