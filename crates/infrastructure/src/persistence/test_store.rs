//! SQLite-based test record persistence

use std::sync::Arc;

use application::{error::ApplicationError, ports::TestStorePort};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use domain::entities::{DeliveryTest, HistoryEntry, ProviderResult, TestStatus};
use domain::value_objects::{EmailAddress, TestCode, TestId};
use rusqlite::{OptionalExtension, Row, params};
use tokio::task;
use tracing::{debug, instrument};

use super::connection::ConnectionPool;

/// SQLite-based test store
#[derive(Debug, Clone)]
pub struct SqliteTestStore {
    pool: Arc<ConnectionPool>,
}

impl SqliteTestStore {
    /// Create a new SQLite test store
    #[must_use]
    pub const fn new(pool: Arc<ConnectionPool>) -> Self {
        Self { pool }
    }
}

const SELECT_COLUMNS: &str = "id, code, user_email, user_name, status, overall_score,
    delivered_count, spam_count, inbox_count, created_at, started_at,
    completed_at, shareable_link, results, history";

fn status_to_str(status: TestStatus) -> &'static str {
    status.label()
}

fn internal(e: impl std::fmt::Display) -> ApplicationError {
    ApplicationError::Persistence(e.to_string())
}

fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, rusqlite::Error> {
    DateTime::parse_from_rfc3339(value)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(
                0,
                rusqlite::types::Type::Text,
                Box::new(e),
            )
        })
}

fn invalid_column<E>(e: E) -> rusqlite::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
}

fn row_to_test(row: &Row<'_>) -> Result<DeliveryTest, rusqlite::Error> {
    let id: String = row.get(0)?;
    let code: String = row.get(1)?;
    let user_email: String = row.get(2)?;
    let status: String = row.get(4)?;
    let created_at: String = row.get(9)?;
    let started_at: Option<String> = row.get(10)?;
    let completed_at: Option<String> = row.get(11)?;
    let results_json: String = row.get(13)?;
    let history_json: String = row.get(14)?;

    let results: Vec<ProviderResult> =
        serde_json::from_str(&results_json).map_err(invalid_column)?;
    let history: Vec<HistoryEntry> =
        serde_json::from_str(&history_json).map_err(invalid_column)?;
    let status: TestStatus =
        serde_json::from_value(serde_json::Value::String(status)).map_err(invalid_column)?;

    Ok(DeliveryTest {
        id: TestId::parse(&id).map_err(invalid_column)?,
        code: TestCode::parse(&code).map_err(invalid_column)?,
        user_email: EmailAddress::new(user_email).map_err(invalid_column)?,
        user_name: row.get(3)?,
        status,
        results,
        overall_score: row.get(5)?,
        delivered_count: row.get(6)?,
        spam_count: row.get(7)?,
        inbox_count: row.get(8)?,
        created_at: parse_timestamp(&created_at)?,
        started_at: started_at.as_deref().map(parse_timestamp).transpose()?,
        completed_at: completed_at.as_deref().map(parse_timestamp).transpose()?,
        shareable_link: row.get(12)?,
        history,
    })
}

#[async_trait]
impl TestStorePort for SqliteTestStore {
    #[instrument(skip(self), fields(test_id = %id))]
    async fn find_by_test_id(
        &self,
        id: &TestId,
    ) -> Result<Option<DeliveryTest>, ApplicationError> {
        let pool = Arc::clone(&self.pool);
        let id_str = id.to_string();

        task::spawn_blocking(move || {
            let conn = pool.get().map_err(internal)?;
            let result = conn
                .query_row(
                    &format!("SELECT {SELECT_COLUMNS} FROM delivery_tests WHERE id = ?1"),
                    [&id_str],
                    row_to_test,
                )
                .optional()
                .map_err(internal)?;
            Ok(result)
        })
        .await
        .map_err(internal)?
    }

    #[instrument(skip(self, code))]
    async fn find_by_code(
        &self,
        code: &TestCode,
    ) -> Result<Option<DeliveryTest>, ApplicationError> {
        let pool = Arc::clone(&self.pool);
        let code_str = code.to_string();

        task::spawn_blocking(move || {
            let conn = pool.get().map_err(internal)?;
            let result = conn
                .query_row(
                    &format!("SELECT {SELECT_COLUMNS} FROM delivery_tests WHERE code = ?1"),
                    [&code_str],
                    row_to_test,
                )
                .optional()
                .map_err(internal)?;
            Ok(result)
        })
        .await
        .map_err(internal)?
    }

    #[instrument(skip(self, test), fields(test_id = %test.id))]
    async fn save(&self, test: &DeliveryTest) -> Result<(), ApplicationError> {
        let pool = Arc::clone(&self.pool);
        let test = test.clone();

        task::spawn_blocking(move || {
            let conn = pool.get().map_err(internal)?;

            let results_json = serde_json::to_string(&test.results).map_err(internal)?;
            let history_json = serde_json::to_string(&test.history).map_err(internal)?;

            conn.execute(
                "INSERT OR REPLACE INTO delivery_tests (
                    id, code, user_email, user_name, status, overall_score,
                    delivered_count, spam_count, inbox_count, created_at,
                    started_at, completed_at, shareable_link, results, history
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)",
                params![
                    test.id.to_string(),
                    test.code.to_string(),
                    test.user_email.as_str(),
                    test.user_name,
                    status_to_str(test.status),
                    test.overall_score,
                    test.delivered_count,
                    test.spam_count,
                    test.inbox_count,
                    test.created_at.to_rfc3339(),
                    test.started_at.map(|t| t.to_rfc3339()),
                    test.completed_at.map(|t| t.to_rfc3339()),
                    test.shareable_link,
                    results_json,
                    history_json,
                ],
            )
            .map_err(internal)?;

            debug!("Saved test record");
            Ok(())
        })
        .await
        .map_err(internal)?
    }

    #[instrument(skip(self))]
    async fn find_stale(
        &self,
        older_than: DateTime<Utc>,
    ) -> Result<Vec<DeliveryTest>, ApplicationError> {
        let pool = Arc::clone(&self.pool);
        let cutoff = older_than.to_rfc3339();

        task::spawn_blocking(move || {
            let conn = pool.get().map_err(internal)?;
            let mut stmt = conn
                .prepare(&format!(
                    "SELECT {SELECT_COLUMNS} FROM delivery_tests
                     WHERE status = 'processing' AND started_at IS NOT NULL AND started_at < ?1"
                ))
                .map_err(internal)?;
            let tests = stmt
                .query_map([&cutoff], row_to_test)
                .map_err(internal)?
                .collect::<Result<Vec<_>, _>>()
                .map_err(internal)?;
            Ok(tests)
        })
        .await
        .map_err(internal)?
    }

    #[instrument(skip(self))]
    async fn find_waiting(
        &self,
        created_after: DateTime<Utc>,
        limit: u32,
    ) -> Result<Vec<DeliveryTest>, ApplicationError> {
        let pool = Arc::clone(&self.pool);
        let cutoff = created_after.to_rfc3339();

        task::spawn_blocking(move || {
            let conn = pool.get().map_err(internal)?;
            let mut stmt = conn
                .prepare(&format!(
                    "SELECT {SELECT_COLUMNS} FROM delivery_tests
                     WHERE status = 'waiting' AND created_at >= ?1
                     ORDER BY created_at ASC LIMIT ?2"
                ))
                .map_err(internal)?;
            let tests = stmt
                .query_map(params![cutoff, limit], row_to_test)
                .map_err(internal)?
                .collect::<Result<Vec<_>, _>>()
                .map_err(internal)?;
            Ok(tests)
        })
        .await
        .map_err(internal)?
    }

    #[instrument(skip(self), fields(user_email = %user_email))]
    async fn list_for_user(
        &self,
        user_email: &EmailAddress,
        offset: u32,
        limit: u32,
    ) -> Result<Vec<DeliveryTest>, ApplicationError> {
        let pool = Arc::clone(&self.pool);
        let email = user_email.as_str().to_string();

        task::spawn_blocking(move || {
            let conn = pool.get().map_err(internal)?;
            let mut stmt = conn
                .prepare(&format!(
                    "SELECT {SELECT_COLUMNS} FROM delivery_tests
                     WHERE user_email = ?1
                     ORDER BY created_at DESC LIMIT ?2 OFFSET ?3"
                ))
                .map_err(internal)?;
            let tests = stmt
                .query_map(params![email, limit, offset], row_to_test)
                .map_err(internal)?
                .collect::<Result<Vec<_>, _>>()
                .map_err(internal)?;
            Ok(tests)
        })
        .await
        .map_err(internal)?
    }

    #[instrument(skip(self), fields(user_email = %user_email))]
    async fn count_for_user(&self, user_email: &EmailAddress) -> Result<u64, ApplicationError> {
        let pool = Arc::clone(&self.pool);
        let email = user_email.as_str().to_string();

        task::spawn_blocking(move || {
            let conn = pool.get().map_err(internal)?;
            let count: i64 = conn
                .query_row(
                    "SELECT count(*) FROM delivery_tests WHERE user_email = ?1",
                    [&email],
                    |row| row.get(0),
                )
                .map_err(internal)?;
            Ok(u64::try_from(count).unwrap_or(0))
        })
        .await
        .map_err(internal)?
    }

    #[instrument(skip(self))]
    async fn purge_expired(&self, older_than: DateTime<Utc>) -> Result<u64, ApplicationError> {
        let pool = Arc::clone(&self.pool);
        let cutoff = older_than.to_rfc3339();

        task::spawn_blocking(move || {
            let conn = pool.get().map_err(internal)?;
            let purged = conn
                .execute("DELETE FROM delivery_tests WHERE created_at < ?1", [&cutoff])
                .map_err(internal)?;
            debug!(purged, "Purged expired test records");
            Ok(purged as u64)
        })
        .await
        .map_err(internal)?
    }
}
