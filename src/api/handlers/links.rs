use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::require_admin;
use crate::api::response::{ApiError, AppJson, JSend};
use crate::storage::models::SubscriptionLink;
use crate::storage::RedeemOutcome;
use crate::{distribution, ident, AppState};

// ============================================================================
// Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct LinkResponse {
    pub token: String,
    pub url: String,
}

#[derive(Debug, Deserialize)]
pub struct RedeemRequest {
    pub principal: i64,
    #[serde(default)]
    pub display_name: String,
    pub token: String,
}

#[derive(Debug, Serialize)]
pub struct RedeemResponse {
    pub alias: String,
    pub newly_created: bool,
}

// ============================================================================
// Handlers
// ============================================================================

/// Mint a one-time subscription link. A store failure means no link was
/// produced, never a half-issued one.
pub async fn create_link(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<JSend<LinkResponse>>, ApiError> {
    let issuer = require_admin(&state, &headers)?;

    // Tokens are short, so rule out the (unlikely) collision before insert.
    let mut token = ident::subscription_token();
    for _ in 0..3 {
        let taken = state
            .db
            .get_link(&token)
            .map_err(|e| ApiError::internal(e.to_string()))?
            .is_some();
        if !taken {
            break;
        }
        token = ident::subscription_token();
    }

    let link = SubscriptionLink {
        token: token.clone(),
        issued_by: issuer,
        created_at: Utc::now(),
        consumed: false,
        consumed_by: None,
        consumed_at: None,
    };
    state
        .db
        .insert_link(&link)
        .map_err(|e| ApiError::internal(format!("No link produced: {e}")))?;

    tracing::info!(issuer, token = %token, "subscription link issued");
    Ok(JSend::success(LinkResponse {
        url: ident::redemption_url(&state.config.link_base, &token),
        token,
    }))
}

/// Redeem a token for a principal. On success the engine is immediately
/// given a chance to deliver to the newly pending queue; the result of
/// that opportunistic run is logged, not surfaced here.
pub async fn redeem(
    State(state): State<Arc<AppState>>,
    AppJson(req): AppJson<RedeemRequest>,
) -> Result<Json<JSend<RedeemResponse>>, ApiError> {
    let alias_candidate = ident::subscriber_alias();
    let outcome = state
        .db
        .redeem_link(
            &req.token,
            req.principal,
            &req.display_name,
            &alias_candidate,
            Utc::now(),
        )
        .map_err(|e| ApiError::internal(e.to_string()))?;

    match outcome {
        RedeemOutcome::Granted {
            alias,
            newly_created,
        } => {
            tracing::info!(principal = req.principal, %alias, "subscription activated");

            match distribution::distribute_pending(&state).await {
                Ok(batch) => {
                    tracing::info!(?batch, "post-redemption distribution attempted")
                }
                Err(e) => {
                    tracing::error!(error = %e, "post-redemption distribution failed")
                }
            }

            Ok(JSend::success(RedeemResponse {
                alias,
                newly_created,
            }))
        }
        RedeemOutcome::AlreadySubscribed => Err(ApiError::conflict(
            "Principal already holds an active subscription",
        )),
        RedeemOutcome::InvalidOrUsed => {
            Err(ApiError::not_found("Link is invalid or already used"))
        }
    }
}
