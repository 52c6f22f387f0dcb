//! Route definitions

use axum::{
    Router,
    routing::{get, post},
};

use crate::{handlers, state::AppState};

/// Create the main router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health and status endpoints
        .route("/health", get(handlers::health::health_check))
        .route("/ready", get(handlers::health::readiness_check))
        // Test API (v1)
        .route("/v1/tests", post(handlers::tests::create_test))
        .route("/v1/tests/{id}", get(handlers::tests::get_report))
        .route("/v1/tests/{id}/status", get(handlers::tests::get_status))
        .route("/v1/tests/{id}/export", post(handlers::tests::export_report))
        .route(
            "/v1/tests/history/{user_email}",
            get(handlers::tests::get_history),
        )
        // Check trigger
        .route("/v1/checks", post(handlers::checks::start_check))
        // Attach state
        .with_state(state)
}
