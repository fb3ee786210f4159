use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, get, post},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use super::handlers;
use crate::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    let bundle_limit = state.config.max_bundle_size as usize;

    Router::new()
        // Subscription links
        .route("/links", post(handlers::create_link))
        .route("/redeem", post(handlers::redeem))
        // Distribution
        .route("/distribute", post(handlers::distribute))
        .route("/recover", post(handlers::recover))
        .route(
            "/bundles",
            post(handlers::upload_bundle).layer(DefaultBodyLimit::max(bundle_limit)),
        )
        // Subscribers
        .route("/subscribers", get(handlers::list_subscribers))
        .route("/subscribers/:principal", get(handlers::get_subscriber))
        .route(
            "/subscribers/:principal/deliveries",
            get(handlers::delivery_history),
        )
        // Operator panel
        .route("/stats", get(handlers::stats))
        .route("/admins", get(handlers::list_admins).post(handlers::add_admin))
        .route("/admins/:principal", delete(handlers::remove_admin))
        // Internal
        .route("/_internal/health", get(handlers::health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
