//! Application state shared across handlers

use std::sync::Arc;

use application::services::{CheckService, TestService};
use infrastructure::{AppConfig, SqliteTestStore};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Test lifecycle service (create, report, history, export)
    pub test_service: Arc<TestService<SqliteTestStore>>,
    /// Check engine, for the start-check trigger
    pub check_service: Arc<CheckService<SqliteTestStore>>,
    /// Store handle, for readiness probing
    pub store: Arc<SqliteTestStore>,
    /// Application configuration
    pub config: Arc<AppConfig>,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState").finish_non_exhaustive()
    }
}
