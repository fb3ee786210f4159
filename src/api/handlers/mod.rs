mod admin;
mod bundles;
mod distribution;
mod links;
mod subscribers;

use axum::http::HeaderMap;

use crate::access;
use crate::api::response::ApiError;
use crate::AppState;

pub use admin::{add_admin, health, list_admins, remove_admin, stats};
pub use bundles::upload_bundle;
pub use distribution::{distribute, recover};
pub use links::{create_link, redeem};
pub use subscribers::{delivery_history, get_subscriber, list_subscribers};

/// The acting principal, from the `X-Principal-Id` header.
fn acting_principal(headers: &HeaderMap) -> Result<i64, ApiError> {
    headers
        .get("x-principal-id")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse().ok())
        .ok_or_else(|| ApiError::bad_request("Missing or invalid X-Principal-Id header"))
}

/// Reject unless the acting principal is an administrator.
fn require_admin(state: &AppState, headers: &HeaderMap) -> Result<i64, ApiError> {
    let principal = acting_principal(headers)?;
    if access::is_admin(&state.config, &state.db, principal) {
        Ok(principal)
    } else {
        Err(ApiError::forbidden("Administrator privileges required"))
    }
}
