// SPDX-FileCopyrightText: 2026 Claimline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end tests across the gateway, engine, notification worker and sweeper.
//!
//! Each test builds an isolated TestHarness with a temp SQLite file and mock
//! collaborators. Tests are independent and order-insensitive.

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use claimline_core::EventKind;
use claimline_gateway::{GatewayState, HealthState, router};
use claimline_queue::QueueSweeper;
use claimline_test_utils::TestHarness;
use http_body_util::BodyExt;
use serde_json::{Value, json};
use serial_test::serial;
use tokio_util::sync::CancellationToken;
use tower::ServiceExt;

async fn call(h: &TestHarness, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let app = router(GatewayState {
        engine: h.engine.clone(),
        queries: h.queries.clone(),
        health: HealthState {
            start_time: std::time::Instant::now(),
            prometheus_render: None,
        },
    });
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
}

async fn submit(h: &TestHarness, item: &str, user: &str) -> String {
    let (status, body) = call(
        h,
        "POST",
        &format!("/v1/items/{item}/claims"),
        Some(json!({ "user_id": user, "pickup_preference": "evenings" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    body["id"].as_str().unwrap().to_string()
}

async fn set_status(h: &TestHarness, claim: &str, status: &str) -> (StatusCode, Value) {
    call(
        h,
        "POST",
        &format!("/v1/claims/{claim}/status"),
        Some(json!({ "status": status })),
    )
    .await
}

// ---- Full handover over HTTP ----

#[tokio::test]
async fn item_is_handed_over_and_queue_closes_up() {
    let h = TestHarness::builder().build().await.unwrap();
    let first = submit(&h, "lamp", "ana").await;
    let second = submit(&h, "lamp", "ben").await;
    let third = submit(&h, "lamp", "cy").await;

    assert_eq!(set_status(&h, &first, "contacted").await.0, StatusCode::OK);
    let (status, selected) = set_status(&h, &first, "selected").await;
    assert_eq!(status, StatusCode::OK);
    assert!(selected["queue_position"].is_null());
    assert_eq!(set_status(&h, &first, "completed").await.0, StatusCode::OK);

    let (_, info) = call(&h, "GET", "/v1/items/lamp/queue-info?user_id=cy", None).await;
    assert_eq!(info["active_count"], 2);
    assert_eq!(info["user_position"], 2);
    assert_eq!(info["head"]["claim"]["id"], second.as_str());
    h.assert_dense("lamp").await;

    let (_, stats) = call(&h, "GET", "/v1/items/lamp/stats", None).await;
    assert_eq!(stats["counts"]["completed"], 1);
    assert_eq!(stats["active"], 2);
    assert!(stats["mean_time_to_completion_secs"].as_f64().is_some());

    // ana: next-in-queue, selected, resolved. ben: next-in-queue.
    let events = h.notifier.wait_for(4, Duration::from_secs(5)).await;
    let kinds: Vec<(String, EventKind)> = events
        .iter()
        .map(|e| (e.user_id.0.clone(), e.kind))
        .collect();
    assert!(kinds.contains(&("ana".to_string(), EventKind::NextInQueue)));
    assert!(kinds.contains(&("ana".to_string(), EventKind::Selected)));
    assert!(kinds.contains(&("ana".to_string(), EventKind::Resolved)));
    assert!(kinds.contains(&("ben".to_string(), EventKind::NextInQueue)));
    assert!(!events.iter().any(|e| e.claim_id.0 == third));
}

#[tokio::test]
async fn reorder_then_cancel_keeps_positions_dense() {
    let h = TestHarness::builder().build().await.unwrap();
    let mut ids = Vec::new();
    for user in ["u1", "u2", "u3", "u4"] {
        ids.push(submit(&h, "desk", user).await);
    }

    let (status, moved) = call(
        &h,
        "POST",
        &format!("/v1/claims/{}/position", ids[3]),
        Some(json!({ "position": 1 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(moved["queue_position"], 1);

    let (status, _) = set_status(&h, &ids[0], "cancelled").await;
    assert_eq!(status, StatusCode::OK);

    assert_eq!(
        h.positions("desk").await.unwrap(),
        vec![
            ("u4".to_string(), 1),
            ("u2".to_string(), 2),
            ("u3".to_string(), 3),
        ]
    );

    let (_, history) = call(&h, "GET", "/v1/users/u1/claims", None).await;
    assert_eq!(history[0]["status"], "cancelled");
}

#[tokio::test]
async fn second_live_claim_for_same_user_is_rejected_until_resolved() {
    let h = TestHarness::builder().build().await.unwrap();
    let first = submit(&h, "chair", "dee").await;

    let (status, body) = call(
        &h,
        "POST",
        "/v1/items/chair/claims",
        Some(json!({ "user_id": "dee" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["kind"], "duplicate_active_claim");

    set_status(&h, &first, "cancelled").await;
    submit(&h, "chair", "dee").await;
}

// ---- Sweeper against the served queue ----

#[tokio::test]
async fn sweep_expires_old_claims_visible_over_http() {
    let h = TestHarness::builder().build().await.unwrap();
    submit(&h, "rug", "old1").await;
    submit(&h, "rug", "old2").await;
    tokio::time::sleep(Duration::from_millis(30)).await;

    let sweeper = QueueSweeper::new(
        h.engine.clone(),
        h.queries.clone(),
        Some(h.trigger.clone()),
        Duration::from_secs(60),
        Duration::from_secs(3600),
        Some(Duration::from_millis(10)),
    );
    let report = sweeper.run_once(&CancellationToken::new()).await.unwrap();
    assert_eq!(report.expired, 2);

    let (_, info) = call(&h, "GET", "/v1/items/rug/queue-info", None).await;
    assert_eq!(info["active_count"], 0);
    assert!(info["head"].is_null());

    let (_, claims) = call(&h, "GET", "/v1/items/rug/claims?include_terminal=true", None).await;
    let statuses: Vec<&str> = claims
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["status"].as_str().unwrap())
        .collect();
    assert_eq!(statuses, vec!["expired", "expired"]);
}

#[tokio::test]
async fn health_reports_ok_while_queue_is_busy() {
    let h = Arc::new(TestHarness::builder().build().await.unwrap());
    let mut tasks = Vec::new();
    for i in 0..8 {
        let h = h.clone();
        tasks.push(tokio::spawn(async move {
            h.submit("shelf", &format!("user-{i}")).await.unwrap();
        }));
    }
    let (status, health) = call(&h, "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(health["status"], "ok");
    for task in tasks {
        task.await.unwrap();
    }
    h.assert_dense("shelf").await;
}

// ---- Configuration ----

#[test]
#[serial]
fn env_overrides_apply_to_queue_settings() {
    // SAFETY: serialized with every other env-mutating test in this binary.
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("claimline.toml");
    std::fs::write(&path, "[sweep]\ninterval_secs = 42\n").unwrap();

    unsafe { std::env::set_var("CLAIMLINE_QUEUE_LOCK_TIMEOUT_MS", "750") };
    let config = claimline_config::load_and_validate_path(&path);
    unsafe { std::env::remove_var("CLAIMLINE_QUEUE_LOCK_TIMEOUT_MS") };

    let config = config.unwrap();
    assert_eq!(config.queue.lock_timeout(), Duration::from_millis(750));
    assert_eq!(config.sweep.interval(), Duration::from_secs(42));
}

#[test]
#[serial]
fn unknown_config_key_is_rejected() {
    let errors = claimline_config::load_and_validate_str("[queue]\nlock_timeout = 5\n").unwrap_err();
    assert!(!errors.is_empty());
}
