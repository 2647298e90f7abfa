// SPDX-FileCopyrightText: 2026 Claimline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Request/response tests for the HTTP API, driven through the router.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use claimline_gateway::{GatewayState, HealthState, router};
use claimline_test_utils::TestHarness;
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;

struct Api {
    harness: TestHarness,
    render: Option<Arc<dyn Fn() -> String + Send + Sync>>,
}

impl Api {
    async fn new() -> Self {
        Self {
            harness: TestHarness::builder()
                .with_items(["bike", "tent"])
                .build()
                .await
                .unwrap(),
            render: None,
        }
    }

    fn app(&self) -> axum::Router {
        router(GatewayState {
            engine: self.harness.engine.clone(),
            queries: self.harness.queries.clone(),
            health: HealthState {
                start_time: std::time::Instant::now(),
                prometheus_render: self.render.clone(),
            },
        })
    }

    async fn call(&self, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        let response = self.app().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    async fn submit(&self, item: &str, user: &str) -> Value {
        let (status, body) = self
            .call(
                "POST",
                &format!("/v1/items/{item}/claims"),
                Some(json!({ "user_id": user })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body
    }
}

#[tokio::test]
async fn submit_then_read_queue() {
    let api = Api::new().await;
    let first = api.submit("bike", "u1").await;
    assert_eq!(first["status"], "pending");
    assert_eq!(first["queue_position"], 1);
    api.submit("bike", "u2").await;

    let (status, info) = api
        .call("GET", "/v1/items/bike/queue-info?user_id=u2", None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(info["active_count"], 2);
    assert_eq!(info["user_position"], 2);
    assert_eq!(info["estimated_wait"], 1);
    assert_eq!(info["head"]["claim"]["id"], first["id"]);

    let (status, claims) = api.call("GET", "/v1/items/bike/claims", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(claims.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn error_kinds_keep_distinct_statuses() {
    let api = Api::new().await;
    let claim = api.submit("bike", "u1").await;
    let id = claim["id"].as_str().unwrap();

    let (status, body) = api
        .call("POST", "/v1/items/bike/claims", Some(json!({ "user_id": "u1" })))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["kind"], "duplicate_active_claim");
    assert_eq!(body["retryable"], false);

    let (status, body) = api
        .call("POST", "/v1/items/car/claims", Some(json!({ "user_id": "u1" })))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["kind"], "not_found");

    let (status, body) = api
        .call(
            "POST",
            &format!("/v1/claims/{id}/status"),
            Some(json!({ "status": "completed" })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["kind"], "invalid_transition");

    let (status, body) = api
        .call(
            "POST",
            &format!("/v1/claims/{id}/position"),
            Some(json!({ "position": 5 })),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["kind"], "invalid_position");

    let (status, body) = api
        .call(
            "POST",
            "/v1/claims/nope/status",
            Some(json!({ "status": "cancelled" })),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["kind"], "not_found");
}

#[tokio::test]
async fn advance_and_move_return_the_claim() {
    let api = Api::new().await;
    let a = api.submit("tent", "a").await;
    api.submit("tent", "b").await;
    let c = api.submit("tent", "c").await;

    let (status, moved) = api
        .call(
            "POST",
            &format!("/v1/claims/{}/position", c["id"].as_str().unwrap()),
            Some(json!({ "position": 1 })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(moved["queue_position"], 1);

    let (status, cancelled) = api
        .call(
            "POST",
            &format!("/v1/claims/{}/status", a["id"].as_str().unwrap()),
            Some(json!({ "status": "cancelled", "reason": "no longer needed" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cancelled["status"], "cancelled");
    assert_eq!(cancelled["reason"], "no longer needed");
    assert_eq!(cancelled["queue_position"], Value::Null);

    let (_, stats) = api.call("GET", "/v1/items/tent/stats", None).await;
    assert_eq!(stats["total"], 3);
    assert_eq!(stats["active"], 2);
    assert_eq!(stats["counts"]["cancelled"], 1);
}

#[tokio::test]
async fn user_claims_accept_filters() {
    let api = Api::new().await;
    api.submit("bike", "u1").await;
    api.submit("tent", "u1").await;

    let (status, all) = api.call("GET", "/v1/users/u1/claims", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(all.as_array().unwrap().len(), 2);

    let (_, limited) = api.call("GET", "/v1/users/u1/claims?limit=1", None).await;
    assert_eq!(limited.as_array().unwrap().len(), 1);

    let (_, none) = api
        .call("GET", "/v1/users/u1/claims?status=completed", None)
        .await;
    assert!(none.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn health_and_metrics_endpoints() {
    let mut api = Api::new().await;
    let (status, health) = api.call("GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(health["status"], "ok");

    let (status, _) = api.call("GET", "/metrics", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    api.render = Some(Arc::new(|| "claims_submitted_total 3\n".to_string()));
    let response = api
        .app()
        .oneshot(Request::get("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(&bytes[..], b"claims_submitted_total 3\n");
}
