//! The hash-chained audit ledger.
//!
//! [`AuditLedger`] owns the chain head (last sequence and hash) and is the
//! only writer of its [`AppendLog`]. Appends are serialized by an async
//! mutex held across the log write, so concurrent callers always extend the
//! chain one at a time and a failed write leaves the head untouched.
//!
//! # Verification
//!
//! [`AuditLedger::verify_chain`] re-reads the whole log and checks, for each
//! record in order:
//!
//! 1. it decodes as an [`AuditEntry`]
//! 2. its sequence is exactly one more than the previous entry's
//! 3. its `prev_entry_hash` equals the previous entry's `entry_hash`
//! 4. its `entry_hash` matches the recomputed hash
//!
//! and finally that the log still reaches the head this ledger last wrote.
//! The first failing check is reported as [`ChainVerification::Broken`].

use std::{fmt, sync::Arc};

use gradeguard_storage::{AppendLog, Clock, Sequence};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::{
    entry::{AuditEntry, Digest, EventType},
    error::{AuditError, Result},
};

/// The last entry of the chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainHead {
    /// Sequence of the last entry.
    pub sequence: Sequence,
    /// `entry_hash` of the last entry.
    pub entry_hash: Digest,
}

/// Why a chain failed verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum BreakReason {
    /// The record is not a valid entry.
    Undecodable,
    /// The entry carries a different sequence than its position implies.
    SequenceGap {
        /// Sequence found at this position.
        found: Sequence,
    },
    /// `prev_entry_hash` does not match the previous entry.
    PrevHashMismatch,
    /// `entry_hash` does not match the entry's fields.
    HashMismatch,
    /// The log ends before the head this ledger wrote.
    Truncated,
    /// The last entry is not the one this ledger wrote.
    HeadMismatch,
    /// The log holds entries past the head this ledger wrote.
    UnexpectedEntries,
}

impl fmt::Display for BreakReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Undecodable => f.write_str("record is not a valid audit entry"),
            Self::SequenceGap { found } => write!(f, "unexpected sequence {found}"),
            Self::PrevHashMismatch => f.write_str("previous hash does not match"),
            Self::HashMismatch => f.write_str("entry hash does not match its fields"),
            Self::Truncated => f.write_str("log ends before the recorded head"),
            Self::HeadMismatch => f.write_str("last entry differs from the recorded head"),
            Self::UnexpectedEntries => f.write_str("log holds entries this ledger did not write"),
        }
    }
}

/// Result of [`AuditLedger::verify_chain`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "status")]
pub enum ChainVerification {
    /// Every entry verified.
    Intact {
        /// Number of entries checked.
        entries: u64,
    },
    /// Verification stopped at the first bad entry.
    Broken {
        /// First sequence that is tampered with or missing.
        sequence: Sequence,
        /// What check failed.
        reason: BreakReason,
    },
}

impl ChainVerification {
    /// Returns `true` if every entry verified.
    #[must_use]
    pub const fn is_intact(&self) -> bool {
        matches!(self, Self::Intact { .. })
    }

    /// Returns the first bad sequence, if any.
    #[must_use]
    pub const fn broken_at(&self) -> Option<Sequence> {
        match self {
            Self::Intact { .. } => None,
            Self::Broken { sequence, .. } => Some(*sequence),
        }
    }
}

/// Append-only, hash-chained audit ledger.
///
/// Cheap to share behind an [`Arc`]; every method takes `&self`.
///
/// A log must have exactly one ledger writing to it. The head is held in
/// memory, so a second writer would reuse sequence numbers; entries it adds
/// surface in [`verify_chain`](Self::verify_chain) as
/// [`BreakReason::UnexpectedEntries`].
pub struct AuditLedger {
    log: Arc<dyn AppendLog>,
    clock: Arc<dyn Clock>,
    head: Mutex<Option<ChainHead>>,
}

impl AuditLedger {
    /// Opens a ledger over `log`, resuming the chain from its last record.
    ///
    /// An empty log starts a new chain at [`Sequence::FIRST`].
    ///
    /// # Errors
    ///
    /// - [`AuditError::Storage`] if the log cannot be read
    /// - [`AuditError::Serialization`] if the last record is not a valid
    ///   entry; the chain cannot be extended safely and must be inspected
    #[tracing::instrument(skip_all)]
    pub async fn open(log: Arc<dyn AppendLog>, clock: Arc<dyn Clock>) -> Result<Self> {
        let head = match log.last().await? {
            Some(record) => {
                let entry = AuditEntry::from_record(&record)?;
                Some(ChainHead { sequence: entry.sequence, entry_hash: entry.entry_hash })
            },
            None => None,
        };

        tracing::debug!(head = ?head.map(|h| h.sequence), "audit ledger opened");
        Ok(Self { log, clock, head: Mutex::new(head) })
    }

    /// Appends an entry recording `event_type` performed by `actor`.
    ///
    /// Only the SHA-256 of `payload` is stored.
    ///
    /// # Errors
    ///
    /// - [`AuditError::Storage`] if the log write fails; the head is not
    ///   advanced and the next append reuses the same sequence
    /// - [`AuditError::SequenceExhausted`] if the sequence would overflow
    #[tracing::instrument(skip(self, payload), fields(payload_len = payload.len()))]
    pub async fn append(
        &self,
        actor: &str,
        event_type: EventType,
        payload: &[u8],
    ) -> Result<AuditEntry> {
        let mut head = self.head.lock().await;

        let (sequence, prev_entry_hash) = match *head {
            Some(h) => {
                (h.sequence.checked_next().ok_or(AuditError::SequenceExhausted)?, h.entry_hash)
            },
            None => (Sequence::FIRST, Digest::ZERO),
        };

        let entry = AuditEntry::new(
            sequence,
            self.clock.now(),
            actor,
            event_type,
            Digest::of(payload),
            prev_entry_hash,
        );
        self.log.append(entry.to_record()?).await?;
        *head = Some(ChainHead { sequence, entry_hash: entry.entry_hash });

        tracing::info!(
            audit.sequence = sequence.get(),
            audit.actor = %entry.actor,
            audit.event_type = %event_type,
            audit.timestamp = %entry.timestamp,
            audit.payload_digest = %entry.payload_digest,
            audit.entry_hash = %entry.entry_hash,
            "audit entry appended"
        );
        Ok(entry)
    }

    /// Recomputes the whole chain and reports the first inconsistency.
    ///
    /// Appends wait while verification runs.
    ///
    /// # Errors
    ///
    /// Returns [`AuditError::Storage`] if the log cannot be read. Tampering is
    /// not an error; it is reported as [`ChainVerification::Broken`].
    #[tracing::instrument(skip(self))]
    pub async fn verify_chain(&self) -> Result<ChainVerification> {
        let head = self.head.lock().await;
        let records = self.log.scan().await?;

        let result = verify_records(&records, *head);
        match result {
            ChainVerification::Intact { entries } => {
                tracing::debug!(entries, "audit chain intact");
            },
            ChainVerification::Broken { sequence, reason } => {
                tracing::warn!(sequence = sequence.get(), %reason, "audit chain broken");
            },
        }
        Ok(result)
    }

    /// Returns every entry in sequence order.
    ///
    /// # Errors
    ///
    /// - [`AuditError::Storage`] if the log cannot be read
    /// - [`AuditError::Serialization`] if any record is not a valid entry
    pub async fn entries(&self) -> Result<Vec<AuditEntry>> {
        self.log.scan().await?.iter().map(|record| AuditEntry::from_record(record)).collect()
    }

    /// Returns the number of records in the log.
    ///
    /// # Errors
    ///
    /// Returns [`AuditError::Storage`] if the log cannot be read.
    pub async fn len(&self) -> Result<u64> {
        Ok(self.log.len().await?)
    }

    /// Returns `true` if nothing has been appended yet.
    ///
    /// # Errors
    ///
    /// Returns [`AuditError::Storage`] if the log cannot be read.
    pub async fn is_empty(&self) -> Result<bool> {
        Ok(self.log.is_empty().await?)
    }

    /// Returns the head this ledger will chain the next entry onto.
    pub async fn head(&self) -> Option<ChainHead> {
        *self.head.lock().await
    }
}

impl fmt::Debug for AuditLedger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuditLedger").field("clock", &self.clock).finish_non_exhaustive()
    }
}

fn verify_records(records: &[bytes::Bytes], head: Option<ChainHead>) -> ChainVerification {
    let mut prev = Digest::ZERO;
    let mut expected = Sequence::FIRST;

    for record in records {
        let broken = |reason| ChainVerification::Broken { sequence: expected, reason };

        let Ok(entry) = AuditEntry::from_record(record) else {
            return broken(BreakReason::Undecodable);
        };
        if entry.sequence != expected {
            return broken(BreakReason::SequenceGap { found: entry.sequence });
        }
        if entry.prev_entry_hash != prev {
            return broken(BreakReason::PrevHashMismatch);
        }
        if !entry.is_consistent() {
            return broken(BreakReason::HashMismatch);
        }

        prev = entry.entry_hash;
        expected = match expected.checked_next() {
            Some(next) => next,
            None => break,
        };
    }

    let entries = records.len() as u64;
    let written = head.map_or(0, |head| head.sequence.get());
    if written < entries {
        return ChainVerification::Broken {
            sequence: Sequence(written + 1),
            reason: BreakReason::UnexpectedEntries,
        };
    }
    if let Some(head) = head {
        if head.sequence.get() > entries {
            return ChainVerification::Broken {
                sequence: Sequence(entries + 1),
                reason: BreakReason::Truncated,
            };
        }
        if head.sequence.get() == entries && head.entry_hash != prev {
            return ChainVerification::Broken {
                sequence: head.sequence,
                reason: BreakReason::HeadMismatch,
            };
        }
    }

    ChainVerification::Intact { entries }
}
