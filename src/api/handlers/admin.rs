use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::require_admin;
use crate::api::response::{ApiError, AppJson, JSend};
use crate::storage::models::{AdminRecord, Stats};
use crate::AppState;

// ============================================================================
// Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

#[derive(Debug, Deserialize)]
pub struct AddAdminRequest {
    pub principal: i64,
    #[serde(default)]
    pub display_name: String,
}

#[derive(Debug, Serialize)]
pub struct AdminResponse {
    pub principal: i64,
    pub display_name: String,
    pub added_by: i64,
    pub added_at: String,
}

// ============================================================================
// Handlers
// ============================================================================

pub async fn health() -> Json<JSend<HealthResponse>> {
    JSend::success(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

pub async fn stats(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<JSend<Stats>>, ApiError> {
    require_admin(&state, &headers)?;

    let stats = state
        .db
        .stats()
        .map_err(|e| ApiError::internal(e.to_string()))?;
    Ok(JSend::success(stats))
}

pub async fn list_admins(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<JSend<Vec<AdminResponse>>>, ApiError> {
    require_admin(&state, &headers)?;

    let admins = state
        .db
        .list_admins()
        .map_err(|e| ApiError::internal(e.to_string()))?;

    Ok(JSend::success(
        admins.iter().map(admin_to_response).collect(),
    ))
}

pub async fn add_admin(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    AppJson(req): AppJson<AddAdminRequest>,
) -> Result<Json<JSend<AdminResponse>>, ApiError> {
    let acting = require_admin(&state, &headers)?;

    let record = AdminRecord {
        principal: req.principal,
        display_name: req.display_name,
        added_by: acting,
        added_at: Utc::now(),
    };
    state
        .db
        .put_admin(&record)
        .map_err(|e| ApiError::internal(e.to_string()))?;

    tracing::info!(principal = req.principal, added_by = acting, "admin added");
    Ok(JSend::success(admin_to_response(&record)))
}

pub async fn remove_admin(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(principal): Path<i64>,
) -> Result<Json<JSend<()>>, ApiError> {
    let acting = require_admin(&state, &headers)?;

    let removed = state
        .db
        .remove_admin(principal)
        .map_err(|e| ApiError::internal(e.to_string()))?;
    if !removed {
        return Err(ApiError::not_found("No such administrator"));
    }

    tracing::info!(principal, removed_by = acting, "admin removed");
    Ok(JSend::success(()))
}

// ============================================================================
// Helpers
// ============================================================================

fn admin_to_response(admin: &AdminRecord) -> AdminResponse {
    AdminResponse {
        principal: admin.principal,
        display_name: admin.display_name.clone(),
        added_by: admin.added_by,
        added_at: admin.added_at.to_rfc3339(),
    }
}
