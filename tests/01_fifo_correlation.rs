mod support;

use std::time::Duration;

use linecrab::{CallOptions, SessionId};
use serde_json::json;
use support::{Event, MockBackend, Reply};

#[tokio::test]
async fn concurrent_calls_resolve_in_submission_order() {
    // Earlier requests take longer, so a backend that answered out of order
    // would be caught.
    let backend = MockBackend::start(None, |req| {
        let n = req["n"].as_u64().unwrap_or(0);
        Reply::Delayed(
            Duration::from_millis(40u64.saturating_sub(n * 10)),
            Box::new(Reply::Json(json!({ "n": n }))),
        )
    })
    .await;
    let registry = support::registry(backend.addr());
    let sid = SessionId::new("fifo");

    let call = |n: u64| {
        let registry = registry.clone();
        let sid = sid.clone();
        async move {
            registry
                .send(&sid, &json!({ "op": "gi", "n": n }), CallOptions::default())
                .await
        }
    };

    // join! polls its futures in order, so the calls are queued 0, 1, 2, 3.
    let (r0, r1, r2, r3) = tokio::join!(call(0), call(1), call(2), call(3));
    let results = [r0, r1, r2, r3];

    for (n, result) in results.into_iter().enumerate() {
        assert_eq!(result.unwrap(), json!({ "n": n }));
    }

    let sent: Vec<_> = backend.requests().iter().map(|r| r["n"].clone()).collect();
    assert_eq!(sent, vec![json!(0), json!(1), json!(2), json!(3)]);
}

#[tokio::test]
async fn only_one_request_is_in_flight() {
    let backend = MockBackend::start(None, |req| {
        Reply::Delayed(
            Duration::from_millis(30),
            Box::new(Reply::Json(json!({ "op": req["op"] }))),
        )
    })
    .await;
    let registry = support::registry(backend.addr());
    let sid = SessionId::new("depth");

    let req_a = json!({ "op": "lt" });
    let req_b = json!({ "op": "sc" });
    let a = registry.send(&sid, &req_a, CallOptions::default());
    let b = registry.send(&sid, &req_b, CallOptions::default());
    let (a, b) = tokio::join!(a, b);

    assert_eq!(a.unwrap(), json!({ "op": "lt" }));
    assert_eq!(b.unwrap(), json!({ "op": "sc" }));

    let events = backend.events();
    assert_eq!(
        events,
        vec![
            Event::Received { conn: 1, request: json!({ "op": "lt" }) },
            Event::Replied { conn: 1, op: "lt".into() },
            Event::Received { conn: 1, request: json!({ "op": "sc" }) },
            Event::Replied { conn: 1, op: "sc".into() },
        ]
    );
}

#[tokio::test]
async fn calls_queued_before_connect_are_written_in_order() {
    let backend = MockBackend::start(Some(r#"{"message":"Welcome to the shop"}"#), |req| {
        Reply::Json(json!({ "got": req["op"] }))
    })
    .await;
    let registry = support::registry(backend.addr());
    let sid = SessionId::new("queued");

    let send = |op: &'static str| {
        let registry = registry.clone();
        let sid = sid.clone();
        async move { registry.send(&sid, &json!({ "op": op }), CallOptions::default()).await }
    };

    let (a, b, c) = tokio::join!(send("lt"), send("sc"), send("co"));

    assert_eq!(a.unwrap(), json!({ "got": "lt" }));
    assert_eq!(b.unwrap(), json!({ "got": "sc" }));
    assert_eq!(c.unwrap(), json!({ "got": "co" }));
    assert_eq!(backend.connections(), 1);
}
