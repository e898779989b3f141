//! Versioned symmetric key material.

use std::fmt;

use chrono::{DateTime, Utc};
use gradeguard_storage::KeyVersion;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

/// Key material length in bytes (256 bits).
pub const KEY_SIZE: usize = 32;

/// What a key ring's keys may be used for.
///
/// A ring has exactly one scope for its whole life, so the same secret can
/// never both seal data and sign tokens.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyScope {
    /// AES-256-GCM sealing of sensitive values.
    Encryption,
    /// Ed25519 token signing (material used as the seed).
    Signing,
}

impl KeyScope {
    /// Returns the lowercase scope name used in logs and errors.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Encryption => "encryption",
            Self::Signing => "signing",
        }
    }
}

impl fmt::Display for KeyScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One version of a key ring's secret.
///
/// A `Key` is immutable once created. Retiring a key produces a copy with
/// `retired_at` set; callers holding the earlier `Arc` keep a consistent
/// snapshot. Material is zeroized on drop and never appears in `Debug`
/// output.
#[derive(Clone)]
pub struct Key {
    version: KeyVersion,
    scope: KeyScope,
    material: Zeroizing<[u8; KEY_SIZE]>,
    created_at: DateTime<Utc>,
    retired_at: Option<DateTime<Utc>>,
}

impl Key {
    /// Generates a key with fresh random material from the OS-seeded CSPRNG.
    #[must_use]
    pub fn generate(version: KeyVersion, scope: KeyScope, created_at: DateTime<Utc>) -> Self {
        let mut material = Zeroizing::new([0u8; KEY_SIZE]);
        rand::rng().fill_bytes(&mut *material);
        Self { version, scope, material, created_at, retired_at: None }
    }

    /// Builds an active key from existing material.
    ///
    /// Used to restore a ring with [`KeyRing::from_keys`](crate::KeyRing::from_keys)
    /// after a restart. Pair with [`retired`](Self::retired) for keys that
    /// were no longer active.
    #[must_use]
    pub fn from_material(
        version: KeyVersion,
        scope: KeyScope,
        material: Zeroizing<[u8; KEY_SIZE]>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self { version, scope, material, created_at, retired_at: None }
    }

    /// Returns a copy of this key marked retired at `at`.
    #[must_use]
    pub fn retired(&self, at: DateTime<Utc>) -> Self {
        Self { retired_at: Some(at), ..self.clone() }
    }

    /// Key version within its ring.
    #[must_use]
    pub fn version(&self) -> KeyVersion {
        self.version
    }

    /// Scope of the ring that owns this key.
    #[must_use]
    pub fn scope(&self) -> KeyScope {
        self.scope
    }

    /// Raw 256-bit secret.
    #[must_use]
    pub fn material(&self) -> &[u8; KEY_SIZE] {
        &self.material
    }

    /// When the key was generated.
    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// When the key stopped being active, if it has.
    #[must_use]
    pub fn retired_at(&self) -> Option<DateTime<Utc>> {
        self.retired_at
    }

    /// Returns `true` for the ring's current active key.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.retired_at.is_none()
    }
}

impl fmt::Debug for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Key")
            .field("version", &self.version)
            .field("scope", &self.scope)
            .field("material", &"[REDACTED]")
            .field("created_at", &self.created_at)
            .field("retired_at", &self.retired_at)
            .finish()
    }
}
