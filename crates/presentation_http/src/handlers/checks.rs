//! Check trigger handler

use application::services::StartCheckOutcome;
use axum::{Json, extract::State, http::StatusCode};
use domain::value_objects::TestId;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use crate::{error::ApiError, state::AppState};

/// Start-check request body
#[derive(Debug, Deserialize)]
pub struct StartCheckRequest {
    /// The test to check
    pub test_id: String,
}

/// Start-check response body
#[derive(Debug, Serialize)]
pub struct StartCheckResponse {
    pub success: bool,
    pub message: String,
    pub test_id: TestId,
    pub estimated_time: String,
}

/// Trigger a mailbox check for a test
///
/// Accepted checks run in the background; poll the status endpoint for the
/// outcome. Triggering an already-processing test changes nothing.
#[instrument(skip(state, request))]
pub async fn start_check(
    State(state): State<AppState>,
    Json(request): Json<StartCheckRequest>,
) -> Result<(StatusCode, Json<StartCheckResponse>), ApiError> {
    let id = TestId::parse(&request.test_id)
        .map_err(|_| ApiError::BadRequest(format!("invalid test id: {}", request.test_id)))?;

    info!(test_id = %id, "Manual check triggered");

    match state.check_service.start_check(&id).await? {
        StartCheckOutcome::Accepted => Ok((
            StatusCode::ACCEPTED,
            Json(StartCheckResponse {
                success: true,
                message: "Email checking started".to_string(),
                test_id: id,
                estimated_time: "2-5 minutes".to_string(),
            }),
        )),
        StartCheckOutcome::AlreadyProcessing => Ok((
            StatusCode::OK,
            Json(StartCheckResponse {
                success: true,
                message: "Test is already being checked".to_string(),
                test_id: id,
                estimated_time: "2-5 minutes".to_string(),
            }),
        )),
        StartCheckOutcome::NotFound => {
            Err(ApiError::NotFound(format!("test {id} not found")))
        },
    }
}
