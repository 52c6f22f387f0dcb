//! Test lifecycle handlers: create, report, status, history, export

use application::services::{TestExport, TestHistoryPage};
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use domain::entities::DeliveryTest;
use domain::value_objects::{EmailAddress, TestId};
use serde::{Deserialize, Serialize};
use tracing::instrument;
use validator::Validate;

use crate::{error::ApiError, state::AppState};

/// Create-test request body
#[derive(Debug, Deserialize, Validate)]
pub struct CreateTestRequest {
    /// Requester email (receives the completion summary)
    #[validate(email)]
    pub user_email: String,
    /// Optional display name
    #[serde(default)]
    pub user_name: Option<String>,
}

/// One monitored inbox, as shown to the requester
#[derive(Debug, Serialize)]
pub struct InboxInfo {
    pub provider: String,
    pub display_name: String,
    pub email: String,
}

/// Create-test response body
#[derive(Debug, Serialize)]
pub struct CreateTestResponse {
    pub success: bool,
    pub message: String,
    pub data: CreatedTest,
}

/// The created test, trimmed for the response
#[derive(Debug, Serialize)]
pub struct CreatedTest {
    pub test_id: TestId,
    pub test_code: String,
    pub user_email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_name: Option<String>,
    pub test_inboxes: Vec<InboxInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shareable_link: Option<String>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub status: String,
}

/// Create a new deliverability test
#[instrument(skip(state, request))]
pub async fn create_test(
    State(state): State<AppState>,
    Json(request): Json<CreateTestRequest>,
) -> Result<(StatusCode, Json<CreateTestResponse>), ApiError> {
    request
        .validate()
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let user_email = EmailAddress::new(&request.user_email)
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let test = state
        .test_service
        .create_test(user_email, request.user_name)
        .await?;

    let test_inboxes = test
        .results
        .iter()
        .map(|r| InboxInfo {
            provider: r.provider.to_string(),
            display_name: r.provider.display_name().to_string(),
            email: r.email_address.to_string(),
        })
        .collect();

    Ok((
        StatusCode::CREATED,
        Json(CreateTestResponse {
            success: true,
            message: "Test created successfully".to_string(),
            data: CreatedTest {
                test_id: test.id,
                test_code: test.code.to_string(),
                user_email: test.user_email.to_string(),
                user_name: test.user_name.clone(),
                test_inboxes,
                shareable_link: test.shareable_link.clone(),
                created_at: test.created_at,
                status: test.status.to_string(),
            },
        }),
    ))
}

/// Envelope for successful data responses
#[derive(Debug, Serialize)]
pub struct DataResponse<T> {
    pub success: bool,
    pub data: T,
}

impl<T> DataResponse<T> {
    fn new(data: T) -> Self {
        Self {
            success: true,
            data,
        }
    }
}

fn parse_test_id(raw: &str) -> Result<TestId, ApiError> {
    TestId::parse(raw).map_err(|_| ApiError::BadRequest(format!("invalid test id: {raw}")))
}

/// Fetch the full test report
#[instrument(skip(state))]
pub async fn get_report(
    State(state): State<AppState>,
    Path(test_id): Path<String>,
) -> Result<Json<DataResponse<DeliveryTest>>, ApiError> {
    let id = parse_test_id(&test_id)?;
    let test = state.test_service.get_test(&id).await?;
    Ok(Json(DataResponse::new(test)))
}

/// Trimmed status view for polling clients
#[derive(Debug, Serialize)]
pub struct StatusView {
    pub test_id: TestId,
    pub test_code: String,
    pub status: String,
    pub overall_score: u8,
    pub delivered_count: u32,
    pub spam_count: u32,
    pub inbox_count: u32,
    pub results: Vec<domain::entities::ProviderResult>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// Fetch the test's current status and results
#[instrument(skip(state))]
pub async fn get_status(
    State(state): State<AppState>,
    Path(test_id): Path<String>,
) -> Result<Json<DataResponse<StatusView>>, ApiError> {
    let id = parse_test_id(&test_id)?;
    let test = state.test_service.get_test(&id).await?;

    Ok(Json(DataResponse::new(StatusView {
        test_id: test.id,
        test_code: test.code.to_string(),
        status: test.status.to_string(),
        overall_score: test.overall_score,
        delivered_count: test.delivered_count,
        spam_count: test.spam_count,
        inbox_count: test.inbox_count,
        results: test.results,
        created_at: test.created_at,
        completed_at: test.completed_at,
    })))
}

/// History query parameters
#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_limit")]
    pub limit: u32,
}

const fn default_page() -> u32 {
    1
}

const fn default_limit() -> u32 {
    10
}

/// Page through one requester's test history
#[instrument(skip(state))]
pub async fn get_history(
    State(state): State<AppState>,
    Path(user_email): Path<String>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<DataResponse<TestHistoryPage>>, ApiError> {
    let email =
        EmailAddress::new(&user_email).map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let page = state
        .test_service
        .list_for_user(&email, query.page, query.limit)
        .await?;
    Ok(Json(DataResponse::new(page)))
}

/// Export response body
#[derive(Debug, Serialize)]
pub struct ExportResponse {
    pub success: bool,
    pub message: String,
    pub data: TestExport,
    pub download_url: String,
}

/// Build the report export payload
#[instrument(skip(state))]
pub async fn export_report(
    State(state): State<AppState>,
    Path(test_id): Path<String>,
) -> Result<Json<ExportResponse>, ApiError> {
    let id = parse_test_id(&test_id)?;
    let export = state.test_service.export(&id).await?;

    Ok(Json(ExportResponse {
        success: true,
        message: "Export generated successfully".to_string(),
        download_url: format!("/v1/tests/{}/download", export.test_id),
        data: export,
    }))
}
