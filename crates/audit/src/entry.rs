//! Audit entries and their hash encoding.
//!
//! Every entry commits to its predecessor through `prev_entry_hash`, so
//! editing, removing or reordering any stored entry changes a hash that a
//! later verification recomputes.
//!
//! # Hash Encoding
//!
//! `entry_hash` is SHA-256 over, in order:
//!
//! | Field             | Encoding                                    |
//! |-------------------|---------------------------------------------|
//! | domain tag        | the bytes of [`HASH_DOMAIN`]                |
//! | `sequence`        | u64 big-endian                              |
//! | `timestamp`       | i64 big-endian, microseconds since epoch    |
//! | `actor`           | u32 big-endian length, then UTF-8 bytes     |
//! | `event_type`      | u32 big-endian length, then UTF-8 bytes     |
//! | `payload_digest`  | 32 raw bytes                                |
//! | `prev_entry_hash` | 32 raw bytes ([`Digest::ZERO`] for genesis) |
//!
//! Entries are persisted as one JSON object per record, digests hex-encoded.
//! The payload itself is never persisted, only its digest.

use std::fmt;

use bytes::Bytes;
use chrono::{DateTime, SubsecRound, Utc};
use gradeguard_storage::Sequence;
use serde::{Deserialize, Deserializer, Serialize, Serializer, de::Error as _};
use sha2::{Digest as _, Sha256};

use crate::error::Result;

/// Domain separation tag prefixed to every entry hash.
pub const HASH_DOMAIN: &[u8] = b"gradeguard.audit.v1";

/// Size of a SHA-256 digest in bytes.
pub const DIGEST_SIZE: usize = 32;

/// A SHA-256 digest.
///
/// Serializes as a lowercase hex string.
///
/// # Examples
///
/// ```
/// use gradeguard_audit::Digest;
///
/// let d = Digest::of(b"abc");
/// assert_eq!(d.to_string().len(), 64);
/// assert_eq!(Digest::from_hex(&d.to_string()), Some(d));
/// ```
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Digest([u8; DIGEST_SIZE]);

impl Digest {
    /// The all-zero digest used as the genesis `prev_entry_hash`.
    pub const ZERO: Self = Self([0; DIGEST_SIZE]);

    /// Hashes `data` with SHA-256.
    #[must_use]
    pub fn of(data: &[u8]) -> Self {
        Self(Sha256::digest(data).into())
    }

    /// Wraps raw digest bytes.
    #[must_use]
    pub const fn from_bytes(bytes: [u8; DIGEST_SIZE]) -> Self {
        Self(bytes)
    }

    /// Returns the raw digest bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; DIGEST_SIZE] {
        &self.0
    }

    /// Parses a 64-character hex string.
    #[must_use]
    pub fn from_hex(s: &str) -> Option<Self> {
        let mut bytes = [0u8; DIGEST_SIZE];
        hex::decode_to_slice(s, &mut bytes).ok()?;
        Some(Self(bytes))
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl fmt::Debug for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Digest({self})")
    }
}

impl Serialize for Digest {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(self.0))
    }
}

impl<'de> Deserialize<'de> for Digest {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).ok_or_else(|| D::Error::custom("expected 64 hex characters"))
    }
}

/// Kind of security-relevant event recorded in the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    /// A token was issued.
    Login,
    /// A presented token failed verification.
    TokenRejected,
    /// Sealing a value failed.
    EncryptFailure,
    /// Opening a sealed value failed.
    DecryptFailure,
    /// A key ring was rotated.
    KeyRotated,
    /// A retired key was evicted.
    KeyEvicted,
    /// A purge was requested, whether or not it was authorized.
    PurgeAttempt,
    /// An authorized purge deleted the sensitive records.
    PurgeCompleted,
    /// An authorized purge failed while deleting.
    PurgeFailed,
}

impl EventType {
    /// Every event type, in declaration order.
    pub const ALL: [Self; 9] = [
        Self::Login,
        Self::TokenRejected,
        Self::EncryptFailure,
        Self::DecryptFailure,
        Self::KeyRotated,
        Self::KeyEvicted,
        Self::PurgeAttempt,
        Self::PurgeCompleted,
        Self::PurgeFailed,
    ];

    /// The wire name, as hashed and serialized.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Login => "login",
            Self::TokenRejected => "token_rejected",
            Self::EncryptFailure => "encrypt_failure",
            Self::DecryptFailure => "decrypt_failure",
            Self::KeyRotated => "key_rotated",
            Self::KeyEvicted => "key_evicted",
            Self::PurgeAttempt => "purge_attempt",
            Self::PurgeCompleted => "purge_completed",
            Self::PurgeFailed => "purge_failed",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One link of the audit hash chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEntry {
    /// Position in the ledger, starting at 1.
    pub sequence: Sequence,
    /// When the entry was appended, truncated to microseconds.
    pub timestamp: DateTime<Utc>,
    /// Who performed the action.
    pub actor: String,
    /// What happened.
    pub event_type: EventType,
    /// SHA-256 of the event payload.
    pub payload_digest: Digest,
    /// `entry_hash` of the previous entry, or [`Digest::ZERO`] for the first.
    pub prev_entry_hash: Digest,
    /// SHA-256 over the fields above, see the module docs.
    pub entry_hash: Digest,
}

impl AuditEntry {
    /// Builds an entry and computes its hash.
    ///
    /// `timestamp` is truncated to microseconds so the stored value and the
    /// hashed value agree.
    #[must_use]
    pub fn new(
        sequence: Sequence,
        timestamp: DateTime<Utc>,
        actor: impl Into<String>,
        event_type: EventType,
        payload_digest: Digest,
        prev_entry_hash: Digest,
    ) -> Self {
        let mut entry = Self {
            sequence,
            timestamp: timestamp.trunc_subsecs(6),
            actor: actor.into(),
            event_type,
            payload_digest,
            prev_entry_hash,
            entry_hash: Digest::ZERO,
        };
        entry.entry_hash = entry.compute_hash();
        entry
    }

    /// Recomputes the hash from the entry's fields.
    ///
    /// Differs from `entry_hash` exactly when a hashed field was altered
    /// after the entry was built.
    #[must_use]
    pub fn compute_hash(&self) -> Digest {
        let mut hasher = Sha256::new();
        hasher.update(HASH_DOMAIN);
        hasher.update(self.sequence.get().to_be_bytes());
        hasher.update(self.timestamp.timestamp_micros().to_be_bytes());
        update_prefixed(&mut hasher, self.actor.as_bytes());
        update_prefixed(&mut hasher, self.event_type.as_str().as_bytes());
        hasher.update(self.payload_digest.as_bytes());
        hasher.update(self.prev_entry_hash.as_bytes());
        Digest(hasher.finalize().into())
    }

    /// Returns `true` if the stored hash matches the fields.
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        self.compute_hash() == self.entry_hash
    }

    /// Encodes the entry as an append-log record.
    ///
    /// # Errors
    ///
    /// Returns [`AuditError::Serialization`](crate::AuditError::Serialization)
    /// if JSON encoding fails.
    pub fn to_record(&self) -> Result<Bytes> {
        Ok(Bytes::from(serde_json::to_vec(self)?))
    }

    /// Decodes an append-log record.
    ///
    /// # Errors
    ///
    /// Returns [`AuditError::Serialization`](crate::AuditError::Serialization)
    /// if the record is not a valid entry.
    pub fn from_record(record: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(record)?)
    }
}

/// Length-prefixes a variable field so adjacent fields cannot be shifted
/// into one another.
fn update_prefixed(hasher: &mut Sha256, bytes: &[u8]) {
    // Actor names and event types are far below 4 GiB.
    let len = u32::try_from(bytes.len()).unwrap_or(u32::MAX);
    hasher.update(len.to_be_bytes());
    hasher.update(bytes);
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use chrono::TimeZone;
    use rstest::rstest;

    use super::*;

    fn at(micros: i64) -> DateTime<Utc> {
        Utc.timestamp_micros(micros).single().expect("valid timestamp")
    }

    fn sample() -> AuditEntry {
        AuditEntry::new(
            Sequence(1),
            at(1_700_000_000_123_456),
            "alice",
            EventType::Login,
            Digest::of(b"{}"),
            Digest::ZERO,
        )
    }

    #[test]
    fn test_sha256_known_vector() {
        assert_eq!(
            Digest::of(b"abc").to_string(),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_new_entry_is_consistent() {
        let entry = sample();
        assert!(entry.is_consistent());
        assert_ne!(entry.entry_hash, Digest::ZERO);
    }

    #[test]
    fn test_hash_is_deterministic() {
        assert_eq!(sample().entry_hash, sample().entry_hash);
    }

    #[test]
    fn test_timestamp_truncated_to_micros() {
        let precise = Utc.timestamp_nanos(1_700_000_000_123_456_789);
        let entry =
            AuditEntry::new(Sequence(1), precise, "a", EventType::Login, Digest::ZERO, Digest::ZERO);
        assert_eq!(entry.timestamp.timestamp_subsec_nanos(), 123_456_000);
    }

    #[rstest]
    #[case::sequence(|e: &mut AuditEntry| e.sequence = Sequence(2))]
    #[case::timestamp(|e: &mut AuditEntry| e.timestamp = at(0))]
    #[case::actor(|e: &mut AuditEntry| e.actor = "mallory".into())]
    #[case::event_type(|e: &mut AuditEntry| e.event_type = EventType::KeyRotated)]
    #[case::payload(|e: &mut AuditEntry| e.payload_digest = Digest::of(b"other"))]
    #[case::prev(|e: &mut AuditEntry| e.prev_entry_hash = Digest::of(b"fork"))]
    fn test_every_field_is_hashed(#[case] tamper: fn(&mut AuditEntry)) {
        let mut entry = sample();
        tamper(&mut entry);
        assert!(!entry.is_consistent());
    }

    #[test]
    fn test_record_roundtrip_preserves_hash() {
        let entry = sample();
        let decoded = AuditEntry::from_record(&entry.to_record().unwrap()).unwrap();
        assert_eq!(decoded, entry);
        assert!(decoded.is_consistent());
    }

    #[test]
    fn test_record_uses_hex_digests_and_snake_case_events() {
        let json: serde_json::Value =
            serde_json::from_slice(&sample().to_record().unwrap()).unwrap();
        assert_eq!(json["event_type"], "login");
        assert_eq!(json["prev_entry_hash"], "0".repeat(64));
        assert_eq!(json["sequence"], 1);
    }

    #[rstest]
    #[case::not_json(b"garbage".as_slice())]
    #[case::short_digest(br#"{"sequence":1,"timestamp":"2024-01-01T00:00:00Z","actor":"a","event_type":"login","payload_digest":"00","prev_entry_hash":"00","entry_hash":"00"}"#.as_slice())]
    #[case::unknown_event(br#"{"sequence":1,"timestamp":"2024-01-01T00:00:00Z","actor":"a","event_type":"logout","payload_digest":"","prev_entry_hash":"","entry_hash":""}"#.as_slice())]
    fn test_from_record_rejects_invalid(#[case] record: &[u8]) {
        assert!(AuditEntry::from_record(record).is_err());
    }

    #[test]
    fn test_event_type_names_match_serde() {
        for event in EventType::ALL {
            let json = serde_json::to_string(&event).unwrap();
            assert_eq!(json, format!("\"{}\"", event.as_str()));
        }
    }

    #[test]
    fn test_digest_from_hex_rejects_bad_input() {
        assert_eq!(Digest::from_hex("zz"), None);
        assert_eq!(Digest::from_hex(&"0".repeat(62)), None);
        assert_eq!(Digest::from_hex(&"0".repeat(64)), Some(Digest::ZERO));
    }
}
