//! The audited security facade.
//!
//! [`SecurityCore`] wires the key rings, vault, token authority, audit ledger
//! and purge guard together and makes every security-relevant operation leave
//! an audit entry.
//!
//! # Audit Rules
//!
//! | Operation                    | Entry on success | Entry on failure   |
//! |------------------------------|------------------|--------------------|
//! | `issue_token`                | `login`          | none               |
//! | `verify_token`               | none             | `token_rejected`   |
//! | `encrypt`                    | none             | `encrypt_failure`  |
//! | `decrypt`                    | none             | `decrypt_failure`  |
//! | `rotate_*_key`               | `key_rotated`    | none               |
//! | `evict_*_key`                | `key_evicted`    | none               |
//! | `execute_purge`              | see [`PurgeGuard`] | see [`PurgeGuard`] |
//!
//! Where an entry is required for success, a failed append fails the
//! operation: a token whose `login` entry could not be written is dropped.
//! Where the entry records a failure, the original error is returned even if
//! the append also fails; the append failure is logged.

use std::{fmt, sync::Arc, time::Duration};

use gradeguard_audit::{AuditLedger, ChainVerification, EventType, PurgeGuard, PurgeOutcome};
use gradeguard_authn::{Token, TokenAuthority};
use gradeguard_crypto::{CryptoError, KeyRing, KeyScope, SealedValue, Vault};
use gradeguard_storage::{AppendLog, Clock, KeyVersion, RecordPurger};
use serde_json::json;
use zeroize::Zeroizing;

use crate::{
    config::CoreConfig,
    error::{CoreError, Result},
};

/// Actor recorded for requests that carry no verified identity.
pub const ANONYMOUS_ACTOR: &str = "anonymous";

/// Audited, fail-closed entry point to the security core.
///
/// Every method takes `&self`; share it behind an [`Arc`] across request
/// handlers.
pub struct SecurityCore {
    config: CoreConfig,
    encryption_ring: Arc<KeyRing>,
    vault: Vault,
    authority: TokenAuthority,
    ledger: Arc<AuditLedger>,
    purge_guard: PurgeGuard,
}

/// The encryption and signing key rings a core runs on.
///
/// Export both rings with
/// [`SecurityCore::key_rings`] before shutdown and pass them to
/// [`SecurityCore::restore`] on the next start, so stored values and issued
/// tokens stay readable.
#[derive(Clone, Debug)]
pub struct KeyRings {
    /// Ring whose keys seal sensitive values.
    pub encryption: Arc<KeyRing>,
    /// Ring whose keys sign tokens.
    pub signing: Arc<KeyRing>,
}

impl KeyRings {
    /// Creates two rings, each with a fresh version 1 key.
    #[must_use]
    pub fn generate(clock: Arc<dyn Clock>, max_retired: usize) -> Self {
        Self {
            encryption: Arc::new(KeyRing::with_max_retired(
                KeyScope::Encryption,
                Arc::clone(&clock),
                max_retired,
            )),
            signing: Arc::new(KeyRing::with_max_retired(KeyScope::Signing, clock, max_retired)),
        }
    }
}

impl SecurityCore {
    /// Builds a core for a fresh deployment.
    ///
    /// Both key rings start with a fresh version 1 key. Values sealed by an
    /// earlier process would name versions whose material is gone, so a log
    /// that already holds an audit chain is refused; use
    /// [`restore`](Self::restore) instead.
    ///
    /// # Errors
    ///
    /// - [`CoreError::Config`](crate::CoreError::Config) if `config` fails validation
    /// - [`CoreError::Audit`](crate::CoreError::Audit) if the audit log cannot be opened
    /// - [`CoreError::KeysNotRestored`](crate::CoreError::KeysNotRestored) if `log` already
    ///   holds audit entries
    #[tracing::instrument(skip_all, fields(issuer = %config.issuer()))]
    pub async fn new(
        config: CoreConfig,
        log: Arc<dyn AppendLog>,
        purger: Arc<dyn RecordPurger>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        config.validate()?;
        let ledger = AuditLedger::open(log, Arc::clone(&clock)).await?;
        if let Some(head) = ledger.head().await {
            tracing::error!(
                sequence = head.sequence.get(),
                "audit chain already exists but no key rings were restored"
            );
            return Err(CoreError::KeysNotRestored { sequence: head.sequence });
        }

        let rings = KeyRings::generate(Arc::clone(&clock), config.max_retired_keys());
        Self::assemble(config, rings, ledger, purger, clock)
    }

    /// Builds a core on key rings carried over from an earlier process,
    /// resuming the audit chain stored in `log`.
    ///
    /// The rings keep their own retired-key bound.
    ///
    /// # Errors
    ///
    /// - [`CoreError::Config`](crate::CoreError::Config) if `config` fails validation
    /// - [`CoreError::Crypto`](crate::CoreError::Crypto) if `rings.encryption` is not an
    ///   encryption ring
    /// - [`CoreError::Auth`](crate::CoreError::Auth) if `rings.signing` is not a signing ring
    /// - [`CoreError::Audit`](crate::CoreError::Audit) if the audit log cannot be opened
    #[tracing::instrument(skip_all, fields(issuer = %config.issuer()))]
    pub async fn restore(
        config: CoreConfig,
        rings: KeyRings,
        log: Arc<dyn AppendLog>,
        purger: Arc<dyn RecordPurger>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        config.validate()?;
        let ledger = AuditLedger::open(log, Arc::clone(&clock)).await?;
        Self::assemble(config, rings, ledger, purger, clock)
    }

    fn assemble(
        config: CoreConfig,
        rings: KeyRings,
        ledger: AuditLedger,
        purger: Arc<dyn RecordPurger>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        let KeyRings { encryption: encryption_ring, signing: signing_ring } = rings;
        let vault = Vault::new(Arc::clone(&encryption_ring))?;
        let authority = TokenAuthority::new(config.issuer(), signing_ring, Arc::clone(&clock))?;
        let ledger = Arc::new(ledger);
        let purge_guard = PurgeGuard::new(
            config.termination_secret(),
            Arc::clone(&ledger),
            purger,
            clock,
        );

        tracing::info!(
            encryption_version = %encryption_ring.active().version(),
            signing_version = %authority.keyring().active().version(),
            "security core started"
        );
        Ok(Self { config, encryption_ring, vault, authority, ledger, purge_guard })
    }

    /// Both key rings, for persisting across a restart.
    #[must_use]
    pub fn key_rings(&self) -> KeyRings {
        KeyRings {
            encryption: Arc::clone(&self.encryption_ring),
            signing: Arc::clone(self.authority.keyring()),
        }
    }

    /// The active configuration.
    #[must_use]
    pub fn config(&self) -> &CoreConfig {
        &self.config
    }

    /// The audit ledger.
    #[must_use]
    pub fn ledger(&self) -> &Arc<AuditLedger> {
        &self.ledger
    }

    /// The encryption key ring.
    #[must_use]
    pub fn encryption_keyring(&self) -> &Arc<KeyRing> {
        &self.encryption_ring
    }

    /// The signing key ring.
    #[must_use]
    pub fn signing_keyring(&self) -> &Arc<KeyRing> {
        self.authority.keyring()
    }

    /// Issues a token for `subject` and records a `login` entry.
    ///
    /// `ttl` defaults to the configured token lifetime.
    ///
    /// # Errors
    ///
    /// - [`CoreError::Auth`](crate::CoreError::Auth) if signing fails
    /// - [`CoreError::Audit`](crate::CoreError::Audit) if the `login` entry cannot be written; no
    ///   token is returned
    #[tracing::instrument(skip(self))]
    pub async fn issue_token(&self, subject: &str, ttl: Option<Duration>) -> Result<Token> {
        let token = self.authority.issue(subject, ttl.unwrap_or(self.config.token_ttl()))?;

        let payload = json!({
            "key_version": token.key_version(),
            "iat": token.claims().iat,
            "exp": token.claims().exp,
        });
        self.ledger.append(subject, EventType::Login, payload.to_string().as_bytes()).await?;

        Ok(token)
    }

    /// Verifies `token` and returns its subject.
    ///
    /// A rejected token is recorded as `token_rejected` with the precise
    /// reason; the returned error should be answered uniformly (see
    /// [`CoreError::is_access_denied`](crate::CoreError::is_access_denied)).
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Auth`](crate::CoreError::Auth) if the token does not verify.
    #[tracing::instrument(skip_all)]
    pub async fn verify_token(&self, token: &str) -> Result<String> {
        match self.authority.verify(token) {
            Ok(subject) => Ok(subject),
            Err(err) => {
                let payload = json!({ "reason": err.reason() });
                self.record_failure(ANONYMOUS_ACTOR, EventType::TokenRejected, &payload).await;
                Err(err.into())
            },
        }
    }

    /// Seals `plaintext` under the active encryption key.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Crypto`](crate::CoreError::Crypto) if sealing
    /// fails; an `encrypt_failure` entry is recorded.
    #[tracing::instrument(skip(self, plaintext), fields(len = plaintext.len()))]
    pub async fn encrypt(&self, actor: &str, plaintext: &[u8]) -> Result<SealedValue> {
        match self.vault.encrypt(plaintext) {
            Ok(sealed) => Ok(sealed),
            Err(err) => {
                let payload = json!({ "error": err.to_string() });
                self.record_failure(actor, EventType::EncryptFailure, &payload).await;
                Err(err.into())
            },
        }
    }

    /// Opens `sealed` with the key version it names.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Crypto`](crate::CoreError::Crypto) if the key was
    /// evicted or the value was tampered with; a `decrypt_failure` entry is
    /// recorded.
    #[tracing::instrument(skip(self, sealed), fields(key_version = %sealed.key_version))]
    pub async fn decrypt(&self, actor: &str, sealed: &SealedValue) -> Result<Zeroizing<Vec<u8>>> {
        match self.vault.decrypt(sealed) {
            Ok(plaintext) => Ok(plaintext),
            Err(err) => {
                let payload = json!({
                    "key_version": sealed.key_version,
                    "error": decrypt_failure_kind(&err),
                });
                self.record_failure(actor, EventType::DecryptFailure, &payload).await;
                Err(err.into())
            },
        }
    }

    /// Rotates the encryption key ring and records `key_rotated`.
    ///
    /// # Errors
    ///
    /// - [`CoreError::Crypto`](crate::CoreError::Crypto) if the retired key bound is reached
    /// - [`CoreError::Audit`](crate::CoreError::Audit) if the entry cannot be written; the rotation
    ///   has already taken effect
    pub async fn rotate_encryption_key(&self, actor: &str) -> Result<KeyVersion> {
        self.rotate(actor, &self.encryption_ring).await
    }

    /// Rotates the signing key ring and records `key_rotated`.
    ///
    /// # Errors
    ///
    /// Same as [`rotate_encryption_key`](Self::rotate_encryption_key).
    pub async fn rotate_signing_key(&self, actor: &str) -> Result<KeyVersion> {
        self.rotate(actor, self.authority.keyring()).await
    }

    /// Evicts a retired encryption key and records `key_evicted`.
    ///
    /// Values sealed under `version` can no longer be opened.
    ///
    /// # Errors
    ///
    /// - [`CoreError::Crypto`](crate::CoreError::Crypto) if `version` is active or unknown
    /// - [`CoreError::Audit`](crate::CoreError::Audit) if the entry cannot be written; the eviction
    ///   has already taken effect
    pub async fn evict_encryption_key(&self, actor: &str, version: KeyVersion) -> Result<()> {
        self.evict(actor, &self.encryption_ring, version).await
    }

    /// Evicts a retired signing key and records `key_evicted`.
    ///
    /// Tokens signed with `version` stop verifying.
    ///
    /// # Errors
    ///
    /// Same as [`evict_encryption_key`](Self::evict_encryption_key).
    pub async fn evict_signing_key(&self, actor: &str, version: KeyVersion) -> Result<()> {
        self.evict(actor, self.authority.keyring(), version).await
    }

    /// Runs the authenticated purge; see [`PurgeGuard::execute_purge`].
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Audit`](crate::CoreError::Audit) if logging or deletion fails.
    pub async fn execute_purge(&self, actor: &str, presented: &[u8]) -> Result<PurgeOutcome> {
        Ok(self.purge_guard.execute_purge(actor, presented).await?)
    }

    /// Verifies the audit chain; see [`AuditLedger::verify_chain`].
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Audit`](crate::CoreError::Audit) if the log cannot be read.
    pub async fn verify_chain(&self) -> Result<ChainVerification> {
        Ok(self.ledger.verify_chain().await?)
    }

    #[tracing::instrument(skip(self, ring), fields(scope = %ring.scope()))]
    async fn rotate(&self, actor: &str, ring: &KeyRing) -> Result<KeyVersion> {
        let key = ring.rotate()?;
        let payload = json!({ "scope": ring.scope(), "version": key.version() });
        self.ledger.append(actor, EventType::KeyRotated, payload.to_string().as_bytes()).await?;
        Ok(key.version())
    }

    #[tracing::instrument(skip(self, ring), fields(scope = %ring.scope()))]
    async fn evict(&self, actor: &str, ring: &KeyRing, version: KeyVersion) -> Result<()> {
        ring.evict(version)?;
        let payload = json!({ "scope": ring.scope(), "version": version });
        self.ledger.append(actor, EventType::KeyEvicted, payload.to_string().as_bytes()).await?;
        Ok(())
    }

    /// Best-effort entry for an operation that already failed.
    async fn record_failure(
        &self,
        actor: &str,
        event_type: EventType,
        payload: &serde_json::Value,
    ) {
        if let Err(err) =
            self.ledger.append(actor, event_type, payload.to_string().as_bytes()).await
        {
            tracing::error!(%event_type, error = %err, "failed to record audit entry");
        }
    }
}

impl fmt::Debug for SecurityCore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecurityCore")
            .field("config", &self.config)
            .field("encryption_ring", &self.encryption_ring)
            .field("authority", &self.authority)
            .field("ledger", &self.ledger)
            .finish_non_exhaustive()
    }
}

fn decrypt_failure_kind(err: &CryptoError) -> &'static str {
    match err {
        CryptoError::KeyNotFound { .. } => "key_not_found",
        CryptoError::IntegrityError => "integrity",
        CryptoError::MalformedSealedValue { .. } => "malformed",
        _ => "cipher",
    }
}
