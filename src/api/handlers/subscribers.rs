use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::Json;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::require_admin;
use crate::access;
use crate::api::response::{ApiError, AppQuery, JSend, JSendPaginated, Pagination};
use crate::storage::models::{DeliveryRecord, Subscriber};
use crate::AppState;

// ============================================================================
// Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct SubscriberResponse {
    pub principal: i64,
    pub display_name: String,
    pub alias: String,
    pub subscribed_at: Option<String>,
    pub files_received: u32,
    pub pending_file: bool,
    pub last_file_sent: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct DeliveryResponse {
    pub file_seq: u64,
    pub status: crate::storage::models::DeliveryStatus,
    pub error: Option<String>,
    pub recovery_attempts: u32,
    pub attempted_at: String,
}

#[derive(Debug, Deserialize)]
pub struct ListSubscribersParams {
    #[serde(default = "default_limit")]
    pub limit: u32,
    #[serde(default)]
    pub offset: u32,
}

fn default_limit() -> u32 {
    20
}

// ============================================================================
// Handlers
// ============================================================================

/// Active subscriber roster, in subscription order.
pub async fn list_subscribers(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    AppQuery(params): AppQuery<ListSubscribersParams>,
) -> Result<Json<JSendPaginated<SubscriberResponse>>, ApiError> {
    require_admin(&state, &headers)?;

    if params.limit == 0 {
        return Err(ApiError::bad_request("limit must be greater than 0"));
    }

    let subs = state
        .db
        .active_subscribers()
        .map_err(|e| ApiError::internal(e.to_string()))?;

    let total = subs.len() as u64;
    let items: Vec<SubscriberResponse> = subs
        .iter()
        .skip(params.offset as usize)
        .take(params.limit as usize)
        .map(subscriber_to_response)
        .collect();

    Ok(JSendPaginated::success(
        items,
        Pagination {
            limit: params.limit,
            offset: params.offset,
            total,
        },
    ))
}

/// Subscription status for one principal (the frontend's status command).
pub async fn get_subscriber(
    State(state): State<Arc<AppState>>,
    Path(principal): Path<i64>,
) -> Result<Json<JSend<SubscriberResponse>>, ApiError> {
    let sub = state
        .db
        .get_subscriber(principal)
        .map_err(|e| ApiError::internal(e.to_string()))?
        .ok_or_else(|| ApiError::not_found("No subscription for principal"))?;

    Ok(JSend::success(subscriber_to_response(&sub)))
}

/// Delivery history for one principal, oldest attempt first.
pub async fn delivery_history(
    State(state): State<Arc<AppState>>,
    Path(principal): Path<i64>,
) -> Result<Json<JSend<Vec<DeliveryResponse>>>, ApiError> {
    if !access::has_active_subscription(&state.db, principal) {
        return Err(ApiError::forbidden("No active subscription for principal"));
    }

    let records = state
        .db
        .deliveries_for(principal)
        .map_err(|e| ApiError::internal(e.to_string()))?;

    Ok(JSend::success(
        records.iter().map(delivery_to_response).collect(),
    ))
}

// ============================================================================
// Helpers
// ============================================================================

fn subscriber_to_response(sub: &Subscriber) -> SubscriberResponse {
    SubscriberResponse {
        principal: sub.principal,
        display_name: sub.display_name.clone(),
        alias: sub.alias.clone(),
        subscribed_at: sub.subscribed_at.map(|t| t.to_rfc3339()),
        files_received: sub.files_received,
        pending_file: sub.pending_file,
        last_file_sent: sub.last_file_sent.map(|t| t.to_rfc3339()),
    }
}

fn delivery_to_response(record: &DeliveryRecord) -> DeliveryResponse {
    DeliveryResponse {
        file_seq: record.file_seq,
        status: record.status,
        error: record.error.clone(),
        recovery_attempts: record.recovery_attempts,
        attempted_at: record.attempted_at.to_rfc3339(),
    }
}
