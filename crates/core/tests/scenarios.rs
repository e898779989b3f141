//! End-to-end scenarios through the security facade.

#![allow(clippy::expect_used, clippy::panic, clippy::unwrap_used)]

use std::{sync::Arc, time::Duration};

use bytes::Bytes;
use gradeguard_audit::{EventType, PurgeOutcome};
use gradeguard_authn::AuthError;
use gradeguard_core::{CoreConfig, CoreError, KeyRings, SecurityCore};
use gradeguard_crypto::{CryptoError, Key, KeyRing, SealedValue};
use gradeguard_storage::{KeyVersion, ManualClock, MemoryAppendLog, MemoryRecordStore};
use zeroize::Zeroizing;

const SECRET: &str = "district-termination-secret";

struct Harness {
    core: SecurityCore,
    clock: ManualClock,
    store: MemoryRecordStore,
    log: MemoryAppendLog,
}

async fn harness() -> Harness {
    let clock = ManualClock::default();
    let store = MemoryRecordStore::new();
    let log = MemoryAppendLog::new();
    let config = CoreConfig::builder()
        .issuer("gradeguard")
        .termination_secret(SECRET)
        .build()
        .expect("valid config");
    let core = SecurityCore::new(
        config,
        Arc::new(log.clone()),
        Arc::new(store.clone()),
        Arc::new(clock.clone()),
    )
    .await
    .expect("core");
    Harness { core, clock, store, log }
}

async fn events(core: &SecurityCore) -> Vec<EventType> {
    core.ledger().entries().await.expect("entries").into_iter().map(|e| e.event_type).collect()
}

// ---------------------------------------------------------------------------
// Token lifecycle
// ---------------------------------------------------------------------------

#[tokio::test]
async fn alice_token_expires_after_two_hours() {
    let Harness { core, clock, .. } = harness().await;

    let token = core
        .issue_token("alice@example.edu", Some(Duration::from_secs(2 * 3600)))
        .await
        .expect("issue");
    assert_eq!(core.verify_token(token.as_str()).await.expect("verify"), "alice@example.edu");

    clock.advance(chrono::Duration::hours(2) + chrono::Duration::minutes(1));
    let err = core.verify_token(token.as_str()).await.unwrap_err();

    assert!(matches!(err, CoreError::Auth(AuthError::Expired)));
    assert!(err.is_access_denied());
    assert_eq!(events(&core).await, vec![EventType::Login, EventType::TokenRejected]);
}

#[tokio::test]
async fn signing_rotation_keeps_tokens_until_eviction() {
    let Harness { core, .. } = harness().await;
    let before = core.issue_token("alice", None).await.expect("issue");

    assert_eq!(core.rotate_signing_key("admin").await.expect("rotate"), KeyVersion(2));
    assert!(core.verify_token(before.as_str()).await.is_ok());

    core.evict_signing_key("admin", KeyVersion(1)).await.expect("evict");
    let err = core.verify_token(before.as_str()).await.unwrap_err();
    assert!(matches!(err, CoreError::Auth(AuthError::SignatureInvalid)));
}

// ---------------------------------------------------------------------------
// Envelope encryption across rotation
// ---------------------------------------------------------------------------

#[tokio::test]
async fn grades_survive_rotation_until_eviction() {
    let Harness { core, .. } = harness().await;

    let b_plus = core.encrypt("registrar", b"B+").await.expect("encrypt");
    core.rotate_encryption_key("admin").await.expect("rotate");
    let a_minus = core.encrypt("registrar", b"A-").await.expect("encrypt");

    assert_eq!(b_plus.key_version, KeyVersion(1));
    assert_eq!(a_minus.key_version, KeyVersion(2));
    assert_eq!(core.decrypt("registrar", &b_plus).await.expect("decrypt").as_slice(), b"B+");
    assert_eq!(core.decrypt("registrar", &a_minus).await.expect("decrypt").as_slice(), b"A-");

    core.evict_encryption_key("admin", KeyVersion(1)).await.expect("evict");

    let err = core.decrypt("registrar", &b_plus).await.unwrap_err();
    assert!(matches!(
        err,
        CoreError::Crypto(CryptoError::KeyNotFound { version: KeyVersion(1) })
    ));
    assert_eq!(core.decrypt("registrar", &a_minus).await.expect("decrypt").as_slice(), b"A-");

    assert_eq!(
        events(&core).await,
        vec![EventType::KeyRotated, EventType::KeyEvicted, EventType::DecryptFailure]
    );
}

#[tokio::test]
async fn stored_bytes_decrypt_after_round_trip() {
    let Harness { core, .. } = harness().await;

    let stored = core.encrypt("registrar", b"C-").await.expect("encrypt").to_bytes();
    core.rotate_encryption_key("admin").await.expect("rotate");

    let sealed = SealedValue::from_bytes(&stored).expect("decode");
    assert_eq!(core.decrypt("registrar", &sealed).await.expect("decrypt").as_slice(), b"C-");
}

// ---------------------------------------------------------------------------
// Purge
// ---------------------------------------------------------------------------

#[tokio::test]
async fn wrong_purge_secret_is_denied() {
    let Harness { core, store, .. } = harness().await;
    store.insert("grade:alice:math", Bytes::from_static(b"B+"));

    let outcome = core.execute_purge("intruder", b"guess").await.expect("purge");

    assert!(matches!(outcome, PurgeOutcome::Denied { .. }));
    assert_eq!(store.len(), 1);
    assert_eq!(events(&core).await, vec![EventType::PurgeAttempt]);
}

#[tokio::test]
async fn correct_purge_secret_deletes_grades() {
    let Harness { core, store, .. } = harness().await;
    store.insert("grade:alice:math", Bytes::from_static(b"B+"));
    store.insert("grade:bob:math", Bytes::from_static(b"A-"));

    let outcome = core.execute_purge("superintendent", SECRET.as_bytes()).await.expect("purge");

    assert!(matches!(outcome, PurgeOutcome::Executed { deleted: 2, .. }));
    assert!(store.is_empty());
    assert_eq!(events(&core).await, vec![EventType::PurgeAttempt, EventType::PurgeCompleted]);
}

// ---------------------------------------------------------------------------
// Chain
// ---------------------------------------------------------------------------

#[tokio::test]
async fn mixed_activity_keeps_chain_intact() {
    let Harness { core, .. } = harness().await;

    let token = core.issue_token("alice", None).await.expect("issue");
    core.verify_token("not-a-token").await.unwrap_err();
    core.rotate_encryption_key("admin").await.expect("rotate");
    core.execute_purge("intruder", b"guess").await.expect("purge");
    core.verify_token(token.as_str()).await.expect("verify");

    let verification = core.verify_chain().await.expect("verify chain");
    assert!(verification.is_intact(), "{verification:?}");
    assert_eq!(core.ledger().len().await.expect("len"), 4);
}

// ---------------------------------------------------------------------------
// Restart
// ---------------------------------------------------------------------------

fn config() -> CoreConfig {
    CoreConfig::builder().issuer("gradeguard").termination_secret(SECRET).build().unwrap()
}

/// Rebuilds both rings from exported material, as a host reloading keys from
/// its secret store would.
fn reload(rings: &KeyRings, clock: &ManualClock) -> KeyRings {
    let reload_ring = |ring: &KeyRing| {
        let keys = ring.retained_keys();
        let export = |key: &Key| {
            let restored = Key::from_material(
                key.version(),
                key.scope(),
                Zeroizing::new(*key.material()),
                key.created_at(),
            );
            match key.retired_at() {
                Some(at) => restored.retired(at),
                None => restored,
            }
        };
        let active = export(&keys[0]);
        let retired: Vec<Key> = keys[1..].iter().map(|key| export(key)).collect();
        Arc::new(
            KeyRing::from_keys(
                ring.scope(),
                Arc::new(clock.clone()),
                active,
                retired,
                ring.max_retired(),
            )
            .expect("restore ring"),
        )
    };
    KeyRings { encryption: reload_ring(&rings.encryption), signing: reload_ring(&rings.signing) }
}

#[tokio::test]
async fn restored_core_reads_values_and_tokens_from_before_restart() {
    let Harness { core, log, clock, store } = harness().await;
    let b_plus = core.encrypt("registrar", b"B+").await.expect("encrypt");
    core.rotate_encryption_key("admin").await.expect("rotate");
    let a_minus = core.encrypt("registrar", b"A-").await.expect("encrypt");
    let token = core.issue_token("alice", None).await.expect("issue");
    let rings = reload(&core.key_rings(), &clock);
    drop(core);

    let restored =
        SecurityCore::restore(config(), rings, Arc::new(log), Arc::new(store), Arc::new(clock))
            .await
            .expect("restore");

    assert_eq!(restored.decrypt("registrar", &b_plus).await.expect("decrypt").as_slice(), b"B+");
    assert_eq!(restored.decrypt("registrar", &a_minus).await.expect("decrypt").as_slice(), b"A-");
    assert_eq!(restored.verify_token(token.as_str()).await.expect("verify"), "alice");
    assert_eq!(restored.rotate_encryption_key("admin").await.expect("rotate"), KeyVersion(3));
    assert!(restored.verify_chain().await.expect("verify chain").is_intact());
}

#[tokio::test]
async fn restored_core_continues_the_chain() {
    let Harness { core, log, clock, store } = harness().await;
    core.issue_token("alice", None).await.expect("issue");
    core.issue_token("bob", None).await.expect("issue");
    let rings = core.key_rings();
    drop(core);

    let restored =
        SecurityCore::restore(config(), rings, Arc::new(log), Arc::new(store), Arc::new(clock))
            .await
            .unwrap();

    let token = restored.issue_token("carol", None).await.expect("issue");
    assert_eq!(restored.verify_token(token.as_str()).await.expect("verify"), "carol");
    assert_eq!(restored.ledger().entries().await.unwrap()[2].sequence.get(), 3);
    assert!(restored.verify_chain().await.unwrap().is_intact());
}

#[tokio::test]
async fn restart_without_restored_keys_is_refused() {
    let Harness { core, log, clock, store } = harness().await;
    core.encrypt("registrar", b"B+").await.expect("encrypt");
    core.issue_token("alice", None).await.expect("issue");
    drop(core);

    let result =
        SecurityCore::new(config(), Arc::new(log), Arc::new(store), Arc::new(clock)).await;

    assert!(
        matches!(result, Err(CoreError::KeysNotRestored { sequence }) if sequence.get() == 1),
        "got {result:?}"
    );
}

#[tokio::test]
async fn restore_rejects_swapped_rings() {
    let Harness { core, log, clock, store } = harness().await;
    let KeyRings { encryption, signing } = core.key_rings();
    drop(core);

    let swapped = KeyRings { encryption: signing, signing: encryption };
    let result =
        SecurityCore::restore(config(), swapped, Arc::new(log), Arc::new(store), Arc::new(clock))
            .await;

    assert!(
        matches!(result, Err(CoreError::Crypto(CryptoError::WrongScope { .. }))),
        "got {result:?}"
    );
}
