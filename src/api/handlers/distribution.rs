use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use serde::Deserialize;
use std::sync::Arc;

use super::require_admin;
use crate::api::response::{ApiError, AppJson, JSend};
use crate::distribution::{self, BatchOutcome, RecoveryOutcome};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct RecoverRequest {
    pub principal: i64,
}

/// Manually trigger a batch distribution run.
pub async fn distribute(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<JSend<BatchOutcome>>, ApiError> {
    let acting = require_admin(&state, &headers)?;
    tracing::info!(acting, "batch distribution triggered");

    let outcome = distribution::distribute_pending(&state)
        .await
        .map_err(|e| ApiError::internal(e.to_string()))?;
    Ok(JSend::success(outcome))
}

/// Re-deliver a subscriber's most recent file from its backup copy.
pub async fn recover(
    State(state): State<Arc<AppState>>,
    AppJson(req): AppJson<RecoverRequest>,
) -> Result<Json<JSend<RecoveryOutcome>>, ApiError> {
    match distribution::recover_latest(&state, req.principal).await {
        outcome @ RecoveryOutcome::Delivered { .. } => Ok(JSend::success(outcome)),
        RecoveryOutcome::NoSubscription => {
            Err(ApiError::forbidden("No active subscription for principal"))
        }
        RecoveryOutcome::NoPriorDelivery => {
            Err(ApiError::not_found("No delivered file to recover"))
        }
        RecoveryOutcome::PayloadMissing => Err(ApiError::not_found(
            "No payload available for recovery; contact the operator",
        )),
        RecoveryOutcome::TransmissionFailed { error } => Err(ApiError::internal(format!(
            "Recovery transmission failed: {error}"
        ))),
        RecoveryOutcome::StoreFailed { error } => Err(ApiError::internal(error)),
    }
}
