//! Versioned key ring with explicit rotation and eviction.
//!
//! A [`KeyRing`] owns one active key plus a bounded history of retired keys.
//! Every ciphertext and token names the version that produced it, so values
//! created before a rotation stay readable until their key is explicitly
//! evicted.
//!
//! # Lifecycle
//!
//! ```text
//!  new()            rotate()               rotate()          evict(1)
//!  ┌────────┐       ┌────────┬────────┐    ┌───┬───┬───┐     ┌───┬───┐
//!  │ v1 (A) │  ──▶  │ v1 (R) │ v2 (A) │ ─▶ │ 1 │ 2 │ 3A│ ──▶ │ 2 │ 3A│
//!  └────────┘       └────────┴────────┘    └───┴───┴───┘     └───┴───┘
//! ```
//!
//! Versions strictly increase and are never reused. Eviction is never
//! automatic: once the retired history reaches its bound, rotation fails
//! with [`CryptoError::RetiredKeyLimit`] until the operator evicts.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use gradeguard_crypto::{KeyRing, KeyScope};
//! use gradeguard_storage::{KeyVersion, SystemClock};
//!
//! let ring = KeyRing::new(KeyScope::Encryption, Arc::new(SystemClock));
//! assert_eq!(ring.active().version(), KeyVersion(1));
//!
//! let v2 = ring.rotate().unwrap();
//! assert_eq!(v2.version(), KeyVersion(2));
//! assert!(ring.find(KeyVersion(1)).is_ok());
//!
//! ring.evict(KeyVersion(1)).unwrap();
//! assert!(ring.find(KeyVersion(1)).is_err());
//! ```

use std::{collections::BTreeMap, fmt, sync::Arc};

use gradeguard_storage::{Clock, KeyVersion};
use parking_lot::RwLock;

use crate::{
    error::{CryptoError, Result},
    key::{Key, KeyScope},
};

/// Default upper bound on retired keys held by a ring.
pub const DEFAULT_MAX_RETIRED: usize = 32;

struct KeyRingState {
    active: Arc<Key>,
    retired: BTreeMap<KeyVersion, Arc<Key>>,
}

/// Authoritative source of key material for one scope.
///
/// Rotation and eviction are atomic with respect to lookups: a reader sees
/// either the ring before or after the change, never an intermediate state.
pub struct KeyRing {
    scope: KeyScope,
    max_retired: usize,
    clock: Arc<dyn Clock>,
    state: RwLock<KeyRingState>,
}

impl KeyRing {
    /// Creates a ring whose active key is version 1.
    pub fn new(scope: KeyScope, clock: Arc<dyn Clock>) -> Self {
        Self::with_max_retired(scope, clock, DEFAULT_MAX_RETIRED)
    }

    /// Creates a ring with a custom retired-key bound.
    pub fn with_max_retired(scope: KeyScope, clock: Arc<dyn Clock>, max_retired: usize) -> Self {
        let active = Arc::new(Key::generate(KeyVersion::FIRST, scope, clock.now()));
        Self {
            scope,
            max_retired,
            clock,
            state: RwLock::new(KeyRingState { active, retired: BTreeMap::new() }),
        }
    }

    /// Restores a ring from keys retained by an earlier process.
    ///
    /// Retired keys without a retirement timestamp are stamped with the
    /// current time. The next rotation continues from `active`'s version.
    ///
    /// # Errors
    ///
    /// - [`CryptoError::WrongScope`] if any key belongs to another scope
    /// - [`CryptoError::InvalidKeySet`] if `active` is marked retired, or a
    ///   retired version is duplicated or not older than `active`
    /// - [`CryptoError::RetiredKeyLimit`] if more than `max_retired` retired
    ///   keys are supplied
    pub fn from_keys(
        scope: KeyScope,
        clock: Arc<dyn Clock>,
        active: Key,
        retired: impl IntoIterator<Item = Key>,
        max_retired: usize,
    ) -> Result<Self> {
        let check_scope = |key: &Key| {
            if key.scope() == scope {
                Ok(())
            } else {
                Err(CryptoError::WrongScope { expected: scope, actual: key.scope() })
            }
        };

        check_scope(&active)?;
        if !active.is_active() {
            return Err(CryptoError::invalid_key_set(format!(
                "active key version {} is marked retired",
                active.version()
            )));
        }

        let now = clock.now();
        let mut history = BTreeMap::new();
        for key in retired {
            check_scope(&key)?;
            let version = key.version();
            if version >= active.version() {
                return Err(CryptoError::invalid_key_set(format!(
                    "retired version {version} is not older than active version {}",
                    active.version()
                )));
            }
            let key = if key.is_active() { key.retired(now) } else { key };
            if history.insert(version, Arc::new(key)).is_some() {
                return Err(CryptoError::invalid_key_set(format!(
                    "retired version {version} supplied twice"
                )));
            }
        }
        if history.len() > max_retired {
            return Err(CryptoError::RetiredKeyLimit { limit: max_retired });
        }

        tracing::info!(
            %scope,
            active_version = %active.version(),
            retired = history.len(),
            "key ring restored"
        );
        Ok(Self {
            scope,
            max_retired,
            clock,
            state: RwLock::new(KeyRingState { active: Arc::new(active), retired: history }),
        })
    }

    /// Scope of every key in this ring.
    #[must_use]
    pub fn scope(&self) -> KeyScope {
        self.scope
    }

    /// Maximum number of retired keys the ring retains.
    #[must_use]
    pub fn max_retired(&self) -> usize {
        self.max_retired
    }

    /// Returns the current active key.
    #[must_use]
    pub fn active(&self) -> Arc<Key> {
        Arc::clone(&self.state.read().active)
    }

    /// Looks up a retained key by version.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::KeyNotFound`] if the version was never issued or
    /// has been evicted.
    pub fn find(&self, version: KeyVersion) -> Result<Arc<Key>> {
        let state = self.state.read();
        if state.active.version() == version {
            return Ok(Arc::clone(&state.active));
        }
        state.retired.get(&version).cloned().ok_or_else(|| CryptoError::key_not_found(version))
    }

    /// Generates a new active key and retires the previous one.
    ///
    /// # Errors
    ///
    /// - [`CryptoError::RetiredKeyLimit`] if the retired history is full
    /// - [`CryptoError::VersionExhausted`] if the version counter would overflow
    #[tracing::instrument(skip(self), fields(scope = %self.scope))]
    pub fn rotate(&self) -> Result<Arc<Key>> {
        let now = self.clock.now();
        let mut state = self.state.write();

        if state.retired.len() >= self.max_retired {
            tracing::warn!(limit = self.max_retired, "rotation refused: retired key limit reached");
            return Err(CryptoError::RetiredKeyLimit { limit: self.max_retired });
        }
        let next = state.active.version().checked_next().ok_or(CryptoError::VersionExhausted)?;

        let fresh = Arc::new(Key::generate(next, self.scope, now));
        let previous = std::mem::replace(&mut state.active, Arc::clone(&fresh));
        state.retired.insert(previous.version(), Arc::new(previous.retired(now)));

        tracing::info!(
            retired_version = %previous.version(),
            active_version = %next,
            "key rotated"
        );
        Ok(fresh)
    }

    /// Permanently removes a retired key.
    ///
    /// Values sealed or tokens signed under the evicted version can no longer
    /// be decrypted or verified.
    ///
    /// # Errors
    ///
    /// - [`CryptoError::ActiveKeyEviction`] if `version` is the active key
    /// - [`CryptoError::KeyNotFound`] if no retained key has `version`
    #[tracing::instrument(skip(self), fields(scope = %self.scope))]
    pub fn evict(&self, version: KeyVersion) -> Result<()> {
        let mut state = self.state.write();
        if state.active.version() == version {
            return Err(CryptoError::ActiveKeyEviction { version });
        }
        if state.retired.remove(&version).is_none() {
            return Err(CryptoError::key_not_found(version));
        }
        tracing::info!(evicted_version = %version, "key evicted");
        Ok(())
    }

    /// Versions of every retained key, ascending, active last.
    #[must_use]
    pub fn retained_versions(&self) -> Vec<KeyVersion> {
        let state = self.state.read();
        state.retired.keys().copied().chain(std::iter::once(state.active.version())).collect()
    }

    /// Every retained key, active first, then retired from newest to oldest.
    #[must_use]
    pub fn retained_keys(&self) -> Vec<Arc<Key>> {
        let state = self.state.read();
        std::iter::once(Arc::clone(&state.active))
            .chain(state.retired.values().rev().cloned())
            .collect()
    }
}

impl fmt::Debug for KeyRing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyRing")
            .field("scope", &self.scope)
            .field("max_retired", &self.max_retired)
            .field("versions", &self.retained_versions())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use chrono::{Duration, Utc};
    use gradeguard_storage::ManualClock;
    use rstest::rstest;
    use zeroize::Zeroizing;

    use super::*;
    use crate::key::KEY_SIZE;

    fn ring(scope: KeyScope) -> (KeyRing, ManualClock) {
        let clock = ManualClock::default();
        (KeyRing::new(scope, Arc::new(clock.clone())), clock)
    }

    #[test]
    fn test_new_ring_starts_at_version_one() {
        let (ring, _) = ring(KeyScope::Encryption);
        let active = ring.active();
        assert_eq!(active.version(), KeyVersion::FIRST);
        assert!(active.is_active());
        assert_eq!(active.scope(), KeyScope::Encryption);
        assert_eq!(ring.retained_versions(), vec![KeyVersion(1)]);
    }

    #[test]
    fn test_rotate_retires_previous_with_timestamp() {
        let (ring, clock) = ring(KeyScope::Encryption);
        let v1 = ring.active();
        clock.advance(Duration::days(30));

        let v2 = ring.rotate().unwrap();
        assert_eq!(v2.version(), KeyVersion(2));
        assert_eq!(ring.active().version(), KeyVersion(2));

        let retired = ring.find(KeyVersion(1)).unwrap();
        assert_eq!(retired.retired_at(), Some(clock.now()));
        assert_eq!(retired.material(), v1.material());
        assert!(v1.is_active(), "earlier snapshot is unchanged");
    }

    #[test]
    fn test_versions_strictly_increase_across_evictions() {
        let (ring, _) = ring(KeyScope::Signing);
        ring.rotate().unwrap();
        ring.rotate().unwrap();
        ring.evict(KeyVersion(2)).unwrap();
        let v4 = ring.rotate().unwrap();
        assert_eq!(v4.version(), KeyVersion(4));
        assert_eq!(ring.retained_versions(), vec![KeyVersion(1), KeyVersion(3), KeyVersion(4)]);
    }

    #[test]
    fn test_find_unknown_version() {
        let (ring, _) = ring(KeyScope::Encryption);
        let err = ring.find(KeyVersion(9)).unwrap_err();
        assert!(matches!(err, CryptoError::KeyNotFound { version } if version == KeyVersion(9)));
    }

    #[test]
    fn test_evict_active_rejected() {
        let (ring, _) = ring(KeyScope::Encryption);
        let err = ring.evict(KeyVersion(1)).unwrap_err();
        assert!(matches!(err, CryptoError::ActiveKeyEviction { .. }));
        assert!(ring.find(KeyVersion(1)).is_ok());
    }

    #[rstest]
    #[case::never_issued(KeyVersion(7))]
    #[case::already_evicted(KeyVersion(1))]
    fn test_evict_missing_version(#[case] version: KeyVersion) {
        let (ring, _) = ring(KeyScope::Encryption);
        ring.rotate().unwrap();
        ring.evict(KeyVersion(1)).unwrap();

        let err = ring.evict(version).unwrap_err();
        assert!(matches!(err, CryptoError::KeyNotFound { .. }));
    }

    #[test]
    fn test_retired_limit_blocks_rotation_until_eviction() {
        let clock = ManualClock::default();
        let ring = KeyRing::with_max_retired(KeyScope::Encryption, Arc::new(clock), 2);
        ring.rotate().unwrap();
        ring.rotate().unwrap();

        let err = ring.rotate().unwrap_err();
        assert!(matches!(err, CryptoError::RetiredKeyLimit { limit: 2 }));
        assert_eq!(ring.active().version(), KeyVersion(3), "failed rotation changes nothing");

        ring.evict(KeyVersion(1)).unwrap();
        assert_eq!(ring.rotate().unwrap().version(), KeyVersion(4));
    }

    #[test]
    fn test_retained_keys_order() {
        let (ring, _) = ring(KeyScope::Signing);
        ring.rotate().unwrap();
        ring.rotate().unwrap();
        let versions: Vec<KeyVersion> =
            ring.retained_keys().iter().map(|key| key.version()).collect();
        assert_eq!(versions, vec![KeyVersion(3), KeyVersion(2), KeyVersion(1)]);
    }

    fn restored(version: u32, fill: u8, scope: KeyScope) -> Key {
        let material = Zeroizing::new([fill; KEY_SIZE]);
        Key::from_material(KeyVersion(version), scope, material, Utc::now())
    }

    #[test]
    fn test_from_keys_restores_material_and_continues_versions() {
        let (original, _) = ring(KeyScope::Encryption);
        original.rotate().unwrap();
        original.rotate().unwrap();
        original.evict(KeyVersion(1)).unwrap();

        let active = original.active();
        let retired: Vec<Key> =
            original.retained_keys().iter().skip(1).map(|key| (**key).clone()).collect();
        let clock = ManualClock::default();
        let ring = KeyRing::from_keys(
            KeyScope::Encryption,
            Arc::new(clock),
            (*active).clone(),
            retired,
            DEFAULT_MAX_RETIRED,
        )
        .unwrap();

        assert_eq!(ring.retained_versions(), vec![KeyVersion(2), KeyVersion(3)]);
        assert_eq!(
            ring.find(KeyVersion(2)).unwrap().material(),
            original.find(KeyVersion(2)).unwrap().material()
        );
        assert_eq!(ring.active().material(), active.material());
        assert!(matches!(ring.find(KeyVersion(1)), Err(CryptoError::KeyNotFound { .. })));
        assert_eq!(ring.rotate().unwrap().version(), KeyVersion(4));
    }

    #[test]
    fn test_from_keys_stamps_unretired_history() {
        let clock = ManualClock::default();
        let ring = KeyRing::from_keys(
            KeyScope::Signing,
            Arc::new(clock.clone()),
            restored(2, 0x22, KeyScope::Signing),
            [restored(1, 0x11, KeyScope::Signing)],
            4,
        )
        .unwrap();

        let v1 = ring.find(KeyVersion(1)).unwrap();
        assert_eq!(v1.retired_at(), Some(clock.now()));
        assert!(ring.active().is_active());
    }

    #[test]
    fn test_from_keys_rejects_foreign_scope() {
        let err = KeyRing::from_keys(
            KeyScope::Encryption,
            Arc::new(ManualClock::default()),
            restored(2, 0x22, KeyScope::Encryption),
            [restored(1, 0x11, KeyScope::Signing)],
            4,
        )
        .unwrap_err();
        assert!(matches!(err, CryptoError::WrongScope { actual: KeyScope::Signing, .. }));
    }

    #[rstest]
    #[case::newer_than_active(vec![3])]
    #[case::same_as_active(vec![2])]
    #[case::duplicate(vec![1, 1])]
    fn test_from_keys_rejects_inconsistent_history(#[case] versions: Vec<u32>) {
        let retired = versions.into_iter().map(|v| restored(v, 0x11, KeyScope::Encryption));
        let err = KeyRing::from_keys(
            KeyScope::Encryption,
            Arc::new(ManualClock::default()),
            restored(2, 0x22, KeyScope::Encryption),
            retired,
            4,
        )
        .unwrap_err();
        assert!(matches!(err, CryptoError::InvalidKeySet { .. }), "got {err:?}");
    }

    #[test]
    fn test_from_keys_rejects_retired_active() {
        let now = Utc::now();
        let err = KeyRing::from_keys(
            KeyScope::Encryption,
            Arc::new(ManualClock::default()),
            restored(2, 0x22, KeyScope::Encryption).retired(now),
            Vec::new(),
            4,
        )
        .unwrap_err();
        assert!(matches!(err, CryptoError::InvalidKeySet { .. }));
    }

    #[test]
    fn test_from_keys_enforces_retired_bound() {
        let retired = (1..=3).map(|v| restored(v, 0x11, KeyScope::Encryption));
        let err = KeyRing::from_keys(
            KeyScope::Encryption,
            Arc::new(ManualClock::default()),
            restored(4, 0x44, KeyScope::Encryption),
            retired,
            2,
        )
        .unwrap_err();
        assert!(matches!(err, CryptoError::RetiredKeyLimit { limit: 2 }));
    }

    #[test]
    fn test_debug_does_not_leak_material() {
        let (ring, _) = ring(KeyScope::Encryption);
        let rendered = format!("{ring:?}");
        assert!(rendered.contains("KeyRing"));
        assert!(!rendered.contains("material"));
    }

    #[test]
    fn test_concurrent_rotations_yield_unique_versions() {
        let clock = ManualClock::default();
        let ring = Arc::new(KeyRing::with_max_retired(KeyScope::Encryption, Arc::new(clock), 64));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let ring = Arc::clone(&ring);
                std::thread::spawn(move || {
                    (0..4).map(|_| ring.rotate().unwrap().version()).collect::<Vec<_>>()
                })
            })
            .collect();

        let mut versions: Vec<KeyVersion> =
            handles.into_iter().flat_map(|h| h.join().unwrap()).collect();
        versions.sort();
        versions.dedup();
        assert_eq!(versions.len(), 32);
        assert_eq!(ring.active().version(), KeyVersion(33));
    }
}
