mod support;

use std::sync::Arc;
use std::time::Duration;

use linecrab::{CallOptions, IdleReaper, SessionId, SessionRegistry};
use serde_json::json;
use support::MockBackend;

fn short_idle_registry(backend: &MockBackend) -> Arc<SessionRegistry> {
    let mut settings = support::settings(backend.addr());
    settings.idle_timeout = Duration::from_millis(150);
    settings.sweep_interval = Duration::from_millis(50);
    Arc::new(SessionRegistry::new(settings))
}

#[tokio::test]
async fn idle_session_is_reaped_and_next_call_reconnects() {
    let backend = MockBackend::echo().await;
    let registry = short_idle_registry(&backend);
    let reaper = IdleReaper::spawn(registry.clone());
    let sid = SessionId::new("idle");

    registry
        .send(&sid, &json!({ "op": "lt" }), CallOptions::default())
        .await
        .unwrap();
    assert_eq!(registry.len(), 1);

    let reaped = support::eventually(Duration::from_secs(2), || registry.is_empty()).await;
    assert!(reaped, "idle session was not reaped");

    let value = registry
        .send(&sid, &json!({ "op": "sc" }), CallOptions::default())
        .await
        .unwrap();
    assert_eq!(value, json!({ "echo": { "op": "sc" } }));
    assert_eq!(backend.connections(), 2);

    reaper.stop().await;
}

#[tokio::test]
async fn active_session_survives_sweeps() {
    let backend = MockBackend::echo().await;
    let registry = short_idle_registry(&backend);
    let reaper = IdleReaper::spawn(registry.clone());
    let sid = SessionId::new("busy");

    for _ in 0..8 {
        registry
            .send(&sid, &json!({ "op": "lt" }), CallOptions::default())
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
    }

    assert_eq!(registry.len(), 1);
    assert_eq!(backend.connections(), 1);

    reaper.stop().await;
}

#[tokio::test]
async fn stopped_reaper_no_longer_sweeps() {
    let backend = MockBackend::echo().await;
    let registry = short_idle_registry(&backend);
    let reaper = IdleReaper::spawn(registry.clone());
    reaper.stop().await;

    registry
        .send(&SessionId::new("kept"), &json!({ "op": "lt" }), CallOptions::default())
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(400)).await;

    assert_eq!(registry.len(), 1);
}
