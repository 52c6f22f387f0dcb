//! HTTP presentation layer for InboxSight
//!
//! Exposes the axum API over the test lifecycle service and the check
//! engine: test creation, reports, history, export, the start-check
//! trigger, and health endpoints.

pub mod error;
pub mod handlers;
pub mod routes;
pub mod state;

pub use error::ApiError;
pub use routes::create_router;
pub use state::AppState;
