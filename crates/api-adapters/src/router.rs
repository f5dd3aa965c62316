//! Route table for the HTTP API.

use axum::middleware::from_fn_with_state;
use axum::routing::{get, post};
use axum::Router;

use crate::handlers;
use crate::middleware::{apply_standard_layers, track_requests};
use crate::state::AppState;

/// Every route, with the standard layers applied.
pub fn build_router(state: AppState) -> Router {
    let api = Router::new()
        .route("/api/ideas", get(handlers::list_ideas).post(handlers::create_idea))
        .route(
            "/api/ideas/{id}",
            get(handlers::get_idea)
                .put(handlers::update_idea)
                .delete(handlers::delete_idea),
        )
        .route("/api/ideas/{id}/similar", get(handlers::similar_ideas))
        .route("/api/ideas/{id}/vote", post(handlers::toggle_vote))
        .route("/api/ideas/{id}/reports", post(handlers::report_idea))
        .route("/api/tags", get(handlers::list_tags))
        .route("/api/tech-stacks", get(handlers::list_tech_stacks))
        .route("/api/profiles/{id}", get(handlers::get_profile))
        .route(
            "/api/profile",
            get(handlers::get_own_profile).put(handlers::update_profile),
        )
        .route("/api/admin/reconcile", post(handlers::reconcile_upvotes))
        .route("/healthz", get(handlers::health))
        .route("/metrics", get(handlers::metrics))
        .route_layer(from_fn_with_state(state.clone(), track_requests))
        .with_state(state);

    apply_standard_layers(api)
}
