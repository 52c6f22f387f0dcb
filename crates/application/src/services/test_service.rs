//! Test lifecycle service
//!
//! Creation, report retrieval, per-user history, and the export payload.
//! The check engine owns everything between `Waiting` and a terminal state;
//! this service owns the edges the HTTP surface talks to.

use std::{fmt, sync::Arc};

use domain::entities::{DeliveryTest, ProviderResult};
use domain::scoring::{ResultCounts, tally};
use domain::value_objects::{EmailAddress, TestId};
use serde::Serialize;
use tracing::{info, instrument};

use crate::error::ApplicationError;
use crate::ports::{AccountDirectory, TestStorePort};

/// Configuration for the test lifecycle service
#[derive(Debug, Clone)]
pub struct TestServiceConfig {
    /// Base URL for shareable report links (e.g. `https://app.example.com`)
    pub report_base_url: Option<String>,
    /// Hard cap on history page size
    pub max_page_size: u32,
}

impl Default for TestServiceConfig {
    fn default() -> Self {
        Self {
            report_base_url: None,
            max_page_size: 50,
        }
    }
}

/// One page of a requester's test history
#[derive(Debug, Clone, Serialize)]
pub struct TestHistoryPage {
    /// Tests on this page, newest first
    pub tests: Vec<DeliveryTest>,
    /// 1-based page number
    pub page: u32,
    /// Page size used
    pub limit: u32,
    /// Total tests for this requester
    pub total: u64,
    /// Total pages at this page size
    pub pages: u32,
}

/// Export payload for a finished report
#[derive(Debug, Clone, Serialize)]
pub struct TestExport {
    /// Test identifier
    pub test_id: TestId,
    /// Probe code
    pub test_code: String,
    /// When the test was created
    pub created_at: chrono::DateTime<chrono::Utc>,
    /// When processing finished, if it did
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<chrono::DateTime<chrono::Utc>>,
    /// Final score
    pub overall_score: u8,
    /// Per-account outcomes
    pub results: Vec<ProviderResult>,
    /// Derived counts
    pub summary: ResultCounts,
}

/// Service for creating and reading deliverability tests
pub struct TestService<S: TestStorePort> {
    store: Arc<S>,
    accounts: Arc<AccountDirectory>,
    config: TestServiceConfig,
}

impl<S: TestStorePort> fmt::Debug for TestService<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TestService")
            .field("accounts", &self.accounts.accounts().len())
            .finish_non_exhaustive()
    }
}

impl<S: TestStorePort> Clone for TestService<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            accounts: Arc::clone(&self.accounts),
            config: self.config.clone(),
        }
    }
}

impl<S: TestStorePort> TestService<S> {
    /// Create a new test service
    #[must_use]
    pub fn new(store: Arc<S>, accounts: Arc<AccountDirectory>, config: TestServiceConfig) -> Self {
        Self {
            store,
            accounts,
            config,
        }
    }

    /// Create a new deliverability test in the waiting queue
    ///
    /// The result set is fixed here: one pending record per monitored
    /// account, in check order.
    #[instrument(skip(self), fields(user_email = %user_email))]
    pub async fn create_test(
        &self,
        user_email: EmailAddress,
        user_name: Option<String>,
    ) -> Result<DeliveryTest, ApplicationError> {
        let results: Vec<ProviderResult> = self
            .accounts
            .accounts()
            .iter()
            .map(|a| ProviderResult::pending(a.provider, a.address.clone()))
            .collect();

        let mut test = DeliveryTest::new(user_email, user_name, results);
        if let Some(base) = &self.config.report_base_url {
            let link = format!("{}/report/{}", base.trim_end_matches('/'), test.id);
            test = test.with_shareable_link(link);
        }
        test.enqueue()?;

        self.store.save(&test).await?;
        info!(test_id = %test.id, code = %test.code, "Test created, waiting for background processing");
        Ok(test)
    }

    /// Fetch the full report record
    pub async fn get_test(&self, id: &TestId) -> Result<DeliveryTest, ApplicationError> {
        self.store
            .find_by_test_id(id)
            .await?
            .ok_or_else(|| ApplicationError::NotFound(format!("test {id}")))
    }

    /// Page through one requester's history, newest first
    #[instrument(skip(self), fields(user_email = %user_email))]
    pub async fn list_for_user(
        &self,
        user_email: &EmailAddress,
        page: u32,
        limit: u32,
    ) -> Result<TestHistoryPage, ApplicationError> {
        let page = page.max(1);
        let limit = limit.clamp(1, self.config.max_page_size);
        let offset = (page - 1) * limit;

        let tests = self.store.list_for_user(user_email, offset, limit).await?;
        let total = self.store.count_for_user(user_email).await?;
        let pages = u32::try_from(total.div_ceil(u64::from(limit))).unwrap_or(u32::MAX);

        Ok(TestHistoryPage {
            tests,
            page,
            limit,
            total,
            pages,
        })
    }

    /// Build the export payload for a test
    pub async fn export(&self, id: &TestId) -> Result<TestExport, ApplicationError> {
        let test = self.get_test(id).await?;
        Ok(TestExport {
            test_id: test.id,
            test_code: test.code.to_string(),
            created_at: test.created_at,
            completed_at: test.completed_at,
            overall_score: test.overall_score,
            summary: tally(&test.results),
            results: test.results,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{InMemoryTestStore, directory};
    use domain::entities::{DeliveryStatus, TestStatus};
    use domain::value_objects::{EmailProvider, FolderCategory};

    fn service(store: Arc<InMemoryTestStore>) -> TestService<InMemoryTestStore> {
        let accounts = Arc::new(directory(&[
            (EmailProvider::Gmail, "probe@gmail.com"),
            (EmailProvider::Outlook, "probe@outlook.com"),
            (EmailProvider::Yahoo, "probe@yahoo.com"),
        ]));
        TestService::new(
            store,
            accounts,
            TestServiceConfig {
                report_base_url: Some("https://inboxsight.dev".to_string()),
                ..TestServiceConfig::default()
            },
        )
    }

    #[tokio::test]
    async fn create_test_fixes_the_result_set() {
        let store = Arc::new(InMemoryTestStore::default());
        let service = service(Arc::clone(&store));

        let test = service
            .create_test(
                EmailAddress::new("requester@example.com").unwrap(),
                Some("Requester".to_string()),
            )
            .await
            .unwrap();

        assert_eq!(test.status, TestStatus::Waiting);
        assert_eq!(test.results.len(), 3);
        assert!(
            test.results
                .iter()
                .all(|r| r.status == DeliveryStatus::Pending)
        );
        assert_eq!(test.results[0].provider, EmailProvider::Gmail);
        assert_eq!(test.overall_score, 0);
        assert_eq!(
            test.shareable_link.as_deref(),
            Some(format!("https://inboxsight.dev/report/{}", test.id).as_str())
        );

        // Persisted as saved
        let stored = store.get(&test.id).unwrap();
        assert_eq!(stored.status, TestStatus::Waiting);
        assert_eq!(stored.history[0].action.name(), "test_created");
    }

    #[tokio::test]
    async fn get_test_reports_missing_records() {
        let store = Arc::new(InMemoryTestStore::default());
        let service = service(store);

        let err = service.get_test(&TestId::new()).await.unwrap_err();
        assert!(matches!(err, ApplicationError::NotFound(_)));
    }

    #[tokio::test]
    async fn history_paginates_newest_first() {
        let store = Arc::new(InMemoryTestStore::default());
        let service = service(Arc::clone(&store));
        let requester = EmailAddress::new("requester@example.com").unwrap();

        let mut created = Vec::new();
        for _ in 0..5 {
            let mut test = service
                .create_test(requester.clone(), None)
                .await
                .unwrap();
            // Spread creation times so ordering is deterministic
            test.created_at = chrono::Utc::now() - chrono::Duration::minutes(created.len() as i64);
            store.insert(test.clone());
            created.push(test);
        }

        let page = service.list_for_user(&requester, 1, 2).await.unwrap();
        assert_eq!(page.tests.len(), 2);
        assert_eq!(page.total, 5);
        assert_eq!(page.pages, 3);
        // Newest first: the most recently created_at test leads
        assert_eq!(page.tests[0].id, created[0].id);

        let last = service.list_for_user(&requester, 3, 2).await.unwrap();
        assert_eq!(last.tests.len(), 1);
    }

    #[tokio::test]
    async fn history_clamps_page_and_limit() {
        let store = Arc::new(InMemoryTestStore::default());
        let service = service(Arc::clone(&store));
        let requester = EmailAddress::new("requester@example.com").unwrap();

        let page = service.list_for_user(&requester, 0, 500).await.unwrap();
        assert_eq!(page.page, 1);
        assert_eq!(page.limit, 50);
        assert_eq!(page.total, 0);
    }

    #[tokio::test]
    async fn export_summarizes_results() {
        let store = Arc::new(InMemoryTestStore::default());
        let service = service(Arc::clone(&store));

        let mut test = service
            .create_test(EmailAddress::new("requester@example.com").unwrap(), None)
            .await
            .unwrap();
        test.results[0].mark_delivered(FolderCategory::Inbox, None, None);
        test.results[1].mark_delivered(FolderCategory::Spam, None, None);
        test.results[2].mark_error("timeout");
        test.rescore(&domain::ScoringWeights::default());
        store.insert(test.clone());

        let export = service.export(&test.id).await.unwrap();
        assert_eq!(export.summary.total, 3);
        assert_eq!(export.summary.inbox, 1);
        assert_eq!(export.summary.spam, 1);
        assert_eq!(export.summary.errors, 1);
        assert_eq!(export.overall_score, test.overall_score);
        assert_eq!(export.test_code, test.code.to_string());
    }
}
