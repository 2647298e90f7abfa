// SPDX-FileCopyrightText: 2026 Claimline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP request handlers for the claim queue API.
//!
//! Mutating handlers tie a cancellation token to the request: if the client
//! goes away before the engine commits, the transaction is rolled back.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use claimline_core::{Claim, ClaimDetails, ClaimId, ClaimStatus, ItemId, UserId};
use claimline_queue::{QueueInfo, QueueStatistics};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::error::ApiError;
use crate::server::GatewayState;

/// Request body for POST /v1/items/{item_id}/claims.
#[derive(Debug, Deserialize)]
pub struct SubmitClaimRequest {
    pub user_id: String,
    #[serde(default)]
    pub pickup_preference: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Request body for POST /v1/claims/{claim_id}/status.
#[derive(Debug, Deserialize)]
pub struct AdvanceStatusRequest {
    pub status: ClaimStatus,
    #[serde(default)]
    pub reason: Option<String>,
}

/// Request body for POST /v1/claims/{claim_id}/position.
#[derive(Debug, Deserialize)]
pub struct MoveRequest {
    pub position: i64,
}

#[derive(Debug, Deserialize)]
pub struct QueueInfoParams {
    #[serde(default)]
    pub user_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ItemClaimsParams {
    #[serde(default)]
    pub include_terminal: bool,
}

#[derive(Debug, Deserialize)]
pub struct UserClaimsParams {
    #[serde(default)]
    pub status: Option<ClaimStatus>,
    #[serde(default)]
    pub limit: Option<usize>,
}

/// Response body for GET /health.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
}

/// Token cancelled when the handler future is dropped before completion.
fn request_token() -> (CancellationToken, tokio_util::sync::DropGuard) {
    let token = CancellationToken::new();
    let guard = token.clone().drop_guard();
    (token, guard)
}

/// POST /v1/items/{item_id}/claims
pub async fn submit_claim(
    State(state): State<GatewayState>,
    Path(item_id): Path<String>,
    Json(body): Json<SubmitClaimRequest>,
) -> Result<(StatusCode, Json<Claim>), ApiError> {
    let (cancel, _guard) = request_token();
    let details = ClaimDetails {
        pickup_preference: body.pickup_preference,
        notes: body.notes,
    };
    let claim = state
        .engine
        .submit_claim(
            &ItemId::from(item_id),
            &UserId::from(body.user_id),
            details,
            &cancel,
        )
        .await?;
    Ok((StatusCode::CREATED, Json(claim)))
}

/// POST /v1/claims/{claim_id}/status
pub async fn advance_status(
    State(state): State<GatewayState>,
    Path(claim_id): Path<String>,
    Json(body): Json<AdvanceStatusRequest>,
) -> Result<Json<Claim>, ApiError> {
    let (cancel, _guard) = request_token();
    let claim = state
        .engine
        .advance_status(&ClaimId::from(claim_id), body.status, body.reason, &cancel)
        .await?;
    Ok(Json(claim))
}

/// POST /v1/claims/{claim_id}/position
pub async fn move_to_position(
    State(state): State<GatewayState>,
    Path(claim_id): Path<String>,
    Json(body): Json<MoveRequest>,
) -> Result<Json<Claim>, ApiError> {
    let (cancel, _guard) = request_token();
    let claim = state
        .engine
        .move_to_position(&ClaimId::from(claim_id), body.position, &cancel)
        .await?;
    Ok(Json(claim))
}

/// GET /v1/items/{item_id}/queue-info
pub async fn get_queue_info(
    State(state): State<GatewayState>,
    Path(item_id): Path<String>,
    Query(params): Query<QueueInfoParams>,
) -> Result<Json<QueueInfo>, ApiError> {
    let user_id = params.user_id.map(UserId::from);
    let info = state
        .queries
        .get_queue_info(&ItemId::from(item_id), user_id.as_ref())
        .await?;
    Ok(Json(info))
}

/// GET /v1/items/{item_id}/claims
pub async fn get_queue_for_item(
    State(state): State<GatewayState>,
    Path(item_id): Path<String>,
    Query(params): Query<ItemClaimsParams>,
) -> Result<Json<Vec<Claim>>, ApiError> {
    let claims = state
        .queries
        .get_queue_for_item(&ItemId::from(item_id), params.include_terminal)
        .await?;
    Ok(Json(claims))
}

/// GET /v1/users/{user_id}/claims
pub async fn get_user_claims(
    State(state): State<GatewayState>,
    Path(user_id): Path<String>,
    Query(params): Query<UserClaimsParams>,
) -> Result<Json<Vec<Claim>>, ApiError> {
    let claims = state
        .queries
        .get_user_claims(&UserId::from(user_id), params.status, params.limit)
        .await?;
    Ok(Json(claims))
}

/// GET /v1/items/{item_id}/stats
pub async fn get_queue_statistics(
    State(state): State<GatewayState>,
    Path(item_id): Path<String>,
) -> Result<Json<QueueStatistics>, ApiError> {
    let stats = state
        .queries
        .get_queue_statistics(&ItemId::from(item_id))
        .await?;
    Ok(Json(stats))
}

/// GET /health
pub async fn get_health(State(state): State<GatewayState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.health.start_time.elapsed().as_secs(),
    })
}

/// GET /metrics
///
/// Prometheus text format, or 404 when metrics are disabled.
pub async fn get_metrics(State(state): State<GatewayState>) -> Response {
    match &state.health.prometheus_render {
        Some(render) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4")],
            render(),
        )
            .into_response(),
        None => (StatusCode::NOT_FOUND, "metrics disabled").into_response(),
    }
}
