//! AES-256-GCM envelope encryption for sensitive values.
//!
//! [`Vault`] seals plaintext under the key ring's active key and opens sealed
//! values under whichever retained key they name. The vault never generates
//! keys of its own.
//!
//! # Sealed value layout
//!
//! ```text
//! ┌──────┬─────┬─────────────┬──────────┬─────────┬────────────┐
//! │ "GS" │ fmt │ key_version │  nonce   │   tag   │ ciphertext │
//! │  2B  │ 1B  │   u32 BE    │   12B    │   16B   │    ...     │
//! └──────┴─────┴─────────────┴──────────┴─────────┴────────────┘
//! ```
//!
//! The big-endian key version is also fed to the cipher as associated data,
//! so restamping a value with another version fails authentication.

use std::sync::Arc;

use aes_gcm::{
    Aes256Gcm, Nonce, Tag,
    aead::{AeadInPlace, KeyInit},
};
use gradeguard_storage::KeyVersion;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use crate::{
    error::{CryptoError, Result},
    key::{Key, KeyScope},
    keyring::KeyRing,
};

/// AES-GCM nonce length in bytes (96 bits).
pub const NONCE_SIZE: usize = 12;

/// AES-GCM authentication tag length in bytes.
pub const TAG_SIZE: usize = 16;

const MAGIC: &[u8; 2] = b"GS";
const FORMAT_V1: u8 = 1;
const HEADER_LEN: usize = MAGIC.len() + 1 + 4 + NONCE_SIZE + TAG_SIZE;

/// An encrypted value that names the key version needed to open it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SealedValue {
    /// Version of the key that sealed this value.
    pub key_version: KeyVersion,
    /// Random per-value nonce.
    #[serde(with = "b64")]
    pub nonce: [u8; NONCE_SIZE],
    /// Detached GCM authentication tag.
    #[serde(with = "b64")]
    pub tag: [u8; TAG_SIZE],
    /// Encrypted payload, same length as the plaintext.
    #[serde(with = "b64")]
    pub ciphertext: Vec<u8>,
}

impl SealedValue {
    /// Encodes the value in its canonical binary form.
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(HEADER_LEN + self.ciphertext.len());
        out.extend_from_slice(MAGIC);
        out.push(FORMAT_V1);
        out.extend_from_slice(&self.key_version.get().to_be_bytes());
        out.extend_from_slice(&self.nonce);
        out.extend_from_slice(&self.tag);
        out.extend_from_slice(&self.ciphertext);
        out
    }

    /// Decodes a value produced by [`to_bytes`](Self::to_bytes).
    ///
    /// Decoding checks structure only; authenticity is checked by
    /// [`Vault::decrypt`].
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::MalformedSealedValue`] on a short buffer, wrong
    /// magic or unknown format version.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < HEADER_LEN {
            return Err(CryptoError::malformed(format!(
                "expected at least {HEADER_LEN} bytes, got {}",
                bytes.len()
            )));
        }
        let (magic, rest) = bytes.split_at(MAGIC.len());
        if magic != MAGIC {
            return Err(CryptoError::malformed("bad magic"));
        }
        let (format, rest) = rest.split_at(1);
        if format[0] != FORMAT_V1 {
            return Err(CryptoError::malformed(format!("unknown format version {}", format[0])));
        }
        let (version, rest) = rest.split_at(4);
        let (nonce, rest) = rest.split_at(NONCE_SIZE);
        let (tag, ciphertext) = rest.split_at(TAG_SIZE);

        let version: [u8; 4] =
            version.try_into().map_err(|_| CryptoError::malformed("bad key version"))?;
        Ok(Self {
            key_version: KeyVersion(u32::from_be_bytes(version)),
            nonce: nonce.try_into().map_err(|_| CryptoError::malformed("bad nonce"))?,
            tag: tag.try_into().map_err(|_| CryptoError::malformed("bad tag"))?,
            ciphertext: ciphertext.to_vec(),
        })
    }
}

/// Envelope encryption over an injected [`KeyRing`].
///
/// Stateless apart from the ring handle; any number of threads may encrypt
/// and decrypt concurrently, including across a rotation.
#[derive(Debug, Clone)]
pub struct Vault {
    keyring: Arc<KeyRing>,
}

impl Vault {
    /// Creates a vault over an encryption-scoped ring.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::WrongScope`] for a signing ring.
    pub fn new(keyring: Arc<KeyRing>) -> Result<Self> {
        if keyring.scope() != KeyScope::Encryption {
            return Err(CryptoError::WrongScope {
                expected: KeyScope::Encryption,
                actual: keyring.scope(),
            });
        }
        Ok(Self { keyring })
    }

    /// The ring this vault draws keys from.
    #[must_use]
    pub fn keyring(&self) -> &Arc<KeyRing> {
        &self.keyring
    }

    /// Seals `plaintext` under the active key with a fresh random nonce.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::Cipher`] if the cipher rejects its inputs.
    #[tracing::instrument(skip_all, fields(plaintext_len = plaintext.len()))]
    pub fn encrypt(&self, plaintext: &[u8]) -> Result<SealedValue> {
        let key = self.keyring.active();
        let cipher = cipher_for(&key)?;

        let mut nonce = [0u8; NONCE_SIZE];
        rand::rng().fill_bytes(&mut nonce);

        let mut buffer = plaintext.to_vec();
        let tag = cipher
            .encrypt_in_place_detached(
                Nonce::from_slice(&nonce),
                &associated_data(key.version()),
                &mut buffer,
            )
            .map_err(|e| CryptoError::cipher(format!("encryption failed: {e}")))?;

        let mut tag_bytes = [0u8; TAG_SIZE];
        tag_bytes.copy_from_slice(&tag);

        tracing::debug!(key_version = %key.version(), "value sealed");
        Ok(SealedValue { key_version: key.version(), nonce, tag: tag_bytes, ciphertext: buffer })
    }

    /// Opens a sealed value with the key version it names.
    ///
    /// The tag is verified before any plaintext is returned.
    ///
    /// # Errors
    ///
    /// - [`CryptoError::KeyNotFound`] if the named key has been evicted
    /// - [`CryptoError::IntegrityError`] if authentication fails
    #[tracing::instrument(skip_all, fields(key_version = %sealed.key_version))]
    pub fn decrypt(&self, sealed: &SealedValue) -> Result<Zeroizing<Vec<u8>>> {
        let key = self.keyring.find(sealed.key_version).inspect_err(|_| {
            tracing::warn!("decrypt refused: key version not retained");
        })?;
        let cipher = cipher_for(&key)?;

        let mut buffer = Zeroizing::new(sealed.ciphertext.clone());
        cipher
            .decrypt_in_place_detached(
                Nonce::from_slice(&sealed.nonce),
                &associated_data(sealed.key_version),
                &mut buffer,
                Tag::from_slice(&sealed.tag),
            )
            .map_err(|_| {
                tracing::warn!("decrypt refused: authentication tag mismatch");
                CryptoError::IntegrityError
            })?;

        Ok(buffer)
    }
}

fn cipher_for(key: &Key) -> Result<Aes256Gcm> {
    Aes256Gcm::new_from_slice(key.material())
        .map_err(|e| CryptoError::cipher(format!("invalid key: {e}")))
}

fn associated_data(version: KeyVersion) -> [u8; 4] {
    version.get().to_be_bytes()
}

/// Serde adapter encoding byte fields as unpadded base64url strings.
mod b64 {
    use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
    use serde::{Deserialize, Deserializer, Serializer, de::Error};

    pub(super) fn serialize<S: Serializer, T: AsRef<[u8]>>(
        value: &T,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&URL_SAFE_NO_PAD.encode(value.as_ref()))
    }

    pub(super) fn deserialize<'de, D, T>(deserializer: D) -> Result<T, D::Error>
    where
        D: Deserializer<'de>,
        T: TryFrom<Vec<u8>>,
    {
        let encoded = String::deserialize(deserializer)?;
        let bytes = URL_SAFE_NO_PAD.decode(encoded).map_err(D::Error::custom)?;
        T::try_from(bytes).map_err(|_| D::Error::custom("unexpected byte length"))
    }
}
