//! Integration test verifying facade spans and that secrets stay out of
//! the trace output.

#![allow(clippy::expect_used)]

use std::{
    fmt,
    sync::{Arc, Mutex},
};

use gradeguard_core::{CoreConfig, SecurityCore};
use gradeguard_storage::{ManualClock, MemoryAppendLog, MemoryRecordStore};
use tracing::{
    Event, Subscriber,
    field::{Field, Visit},
    span,
};
use tracing_subscriber::{layer::SubscriberExt, registry::LookupSpan};

const SECRET: &str = "district-termination-secret";

#[derive(Clone, Default)]
struct Recorder {
    spans: Arc<Mutex<Vec<String>>>,
    output: Arc<Mutex<String>>,
}

struct TextVisitor<'a>(&'a mut String);

impl Visit for TextVisitor<'_> {
    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        self.0.push_str(&format!("{}={value:?} ", field.name()));
    }
}

impl<S> tracing_subscriber::Layer<S> for Recorder
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_new_span(
        &self,
        attrs: &span::Attributes<'_>,
        _id: &span::Id,
        _ctx: tracing_subscriber::layer::Context<'_, S>,
    ) {
        self.spans.lock().expect("lock poisoned").push(attrs.metadata().name().to_owned());
        attrs.record(&mut TextVisitor(&mut self.output.lock().expect("lock poisoned")));
    }

    fn on_event(&self, event: &Event<'_>, _ctx: tracing_subscriber::layer::Context<'_, S>) {
        event.record(&mut TextVisitor(&mut self.output.lock().expect("lock poisoned")));
    }
}

async fn core() -> SecurityCore {
    let config = CoreConfig::builder()
        .issuer("gradeguard")
        .termination_secret(SECRET)
        .build()
        .expect("valid config");
    SecurityCore::new(
        config,
        Arc::new(MemoryAppendLog::new()),
        Arc::new(MemoryRecordStore::new()),
        Arc::new(ManualClock::default()),
    )
    .await
    .expect("core")
}

#[tokio::test]
async fn facade_operations_open_named_spans() {
    let recorder = Recorder::default();
    let _guard =
        tracing::subscriber::set_default(tracing_subscriber::registry().with(recorder.clone()));

    let core = core().await;
    let token = core.issue_token("alice@example.edu", None).await.expect("issue");
    core.verify_token(token.as_str()).await.expect("verify");
    core.rotate_encryption_key("admin").await.expect("rotate");

    let spans = recorder.spans.lock().expect("lock poisoned").clone();
    for name in ["new", "issue_token", "verify_token", "rotate", "append"] {
        assert!(spans.iter().any(|s| s == name), "missing span {name} in {spans:?}");
    }
}

#[tokio::test]
async fn secrets_and_plaintext_never_traced() {
    let recorder = Recorder::default();
    let _guard =
        tracing::subscriber::set_default(tracing_subscriber::registry().with(recorder.clone()));

    let core = core().await;
    let token = core.issue_token("alice@example.edu", None).await.expect("issue");
    let sealed = core.encrypt("registrar", b"grade=B+").await.expect("encrypt");
    core.decrypt("registrar", &sealed).await.expect("decrypt");
    core.execute_purge("intruder", SECRET.as_bytes()).await.expect("purge");

    let output = recorder.output.lock().expect("lock poisoned").clone();
    assert!(!output.is_empty());
    assert!(!output.contains(SECRET), "termination secret leaked");
    assert!(!output.contains("grade=B+"), "plaintext leaked");
    assert!(!output.contains(token.as_str()), "token leaked");
}
