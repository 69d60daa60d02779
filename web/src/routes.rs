//! Router configuration.

use axum::{
    Router,
    routing::{get, post, put},
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::handlers::{claims, events, health, users};
use crate::state::AppState;

/// Build the complete router: health probes plus the `/api` surface.
pub fn build_router(state: AppState) -> Router {
    let api_routes = Router::new()
        // Event lifecycle
        .route("/events", post(events::create_event))
        .route("/events", get(events::list_events))
        .route("/events/:id", get(events::get_event))
        .route("/events/:id/attendees", get(events::attendees))
        .route("/events/:id/payment", post(events::confirm_payment))
        .route("/events/:id/mint", post(events::mint_event))
        .route("/events/:id/cancel", post(events::cancel_event))
        .route("/events/:id/close", post(events::close_event))
        .route("/events/:id/refund", post(events::refund_deposit))
        // Claims
        .route("/events/:id/join", post(claims::join_event))
        .route("/events/:id/claim", get(claims::get_claim))
        // Profiles
        .route("/users/me", get(users::get_me))
        .route("/users/me", put(users::put_me));

    Router::new()
        .route("/health", get(health::health_check))
        .route("/ready", get(health::readiness_check))
        .nest("/api", api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
