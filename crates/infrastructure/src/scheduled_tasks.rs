//! Factory functions for the background tasks
//!
//! Provides pre-built task closures for the scheduler to run:
//! - Recovery sweep (stuck reset + waiting drain, every 2 minutes)
//! - Retention purge (deletes records past the TTL, hourly)

use std::sync::Arc;

use application::{
    ports::TestStorePort,
    services::SweepService,
};
use chrono::Utc;
use futures::future::BoxFuture;
use tracing::{debug, info};

/// Task name for the recovery sweep
pub const RECOVERY_SWEEP_TASK: &str = "recovery_sweep";
/// Task name for the retention purge
pub const RETENTION_PURGE_TASK: &str = "retention_purge";
/// Cron expression for the hourly retention purge
pub const RETENTION_PURGE_CRON: &str = "0 0 * * * *";

/// Create the recovery sweep task closure
///
/// Resets stuck tests and drains waiting ones into the engine. Designed to
/// run every couple of minutes.
pub fn create_sweep_task<S: TestStorePort + 'static>(
    sweep: Arc<SweepService<S>>,
) -> impl Fn() -> BoxFuture<'static, Result<(), String>> + Send + Sync + 'static {
    move || {
        let sweep = Arc::clone(&sweep);

        Box::pin(async move {
            debug!("Running recovery sweep");

            match sweep.run_sweep_once().await {
                Ok(report) => {
                    if report.stuck_reset + report.processed + report.failed > 0 {
                        info!(
                            stuck_reset = report.stuck_reset,
                            processed = report.processed,
                            failed = report.failed,
                            "Recovery sweep finished"
                        );
                    }
                    Ok(())
                },
                Err(e) => Err(format!("Recovery sweep failed: {e}")),
            }
        })
    }
}

/// Create the retention purge task closure
///
/// Deletes records older than the retention window; this is the store-side
/// TTL expiry. Designed to run hourly.
pub fn create_retention_purge_task<S: TestStorePort + 'static>(
    store: Arc<S>,
    retention_window: chrono::Duration,
) -> impl Fn() -> BoxFuture<'static, Result<(), String>> + Send + Sync + 'static {
    move || {
        let store = Arc::clone(&store);

        Box::pin(async move {
            let cutoff = Utc::now() - retention_window;
            debug!(%cutoff, "Running retention purge");

            match store.purge_expired(cutoff).await {
                Ok(0) => Ok(()),
                Ok(purged) => {
                    info!(purged, "Retention purge removed expired tests");
                    Ok(())
                },
                Err(e) => Err(format!("Retention purge failed: {e}")),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DatabaseConfig;
    use crate::persistence::{SqliteTestStore, create_pool};
    use application::ports::{
        AccountDirectory, MailboxConnection, MailboxError, MailboxPort, MessageMeta,
        MonitoredAccount,
    };
    use application::services::{CheckService, CheckServiceConfig, SweepConfig};
    use async_trait::async_trait;
    use domain::entities::{DeliveryTest, TestStatus};
    use domain::value_objects::EmailAddress;
    use std::time::Duration;

    /// Mailbox stub that finds nothing anywhere
    struct EmptyMailbox;

    struct EmptyConnection;

    #[async_trait]
    impl MailboxConnection for EmptyConnection {
        async fn open_folder(&mut self, _name: &str) -> Result<(), MailboxError> {
            Ok(())
        }

        async fn search_text(&mut self, _token: &str) -> Result<Vec<u32>, MailboxError> {
            Ok(vec![])
        }

        async fn fetch_metadata(&mut self, _id: u32) -> Result<MessageMeta, MailboxError> {
            Err(MailboxError::Fetch("empty mailbox".into()))
        }

        async fn close(&mut self) -> Result<(), MailboxError> {
            Ok(())
        }
    }

    #[async_trait]
    impl MailboxPort for EmptyMailbox {
        async fn connect(
            &self,
            _account: &MonitoredAccount,
            _timeout: Duration,
        ) -> Result<Box<dyn MailboxConnection>, MailboxError> {
            Ok(Box::new(EmptyConnection))
        }
    }

    fn memory_store() -> Arc<SqliteTestStore> {
        let pool = create_pool(&DatabaseConfig {
            path: ":memory:".to_string(),
            max_connections: 1,
            run_migrations: true,
        })
        .unwrap();
        Arc::new(SqliteTestStore::new(Arc::new(pool)))
    }

    fn sweep_over(store: &Arc<SqliteTestStore>) -> Arc<SweepService<SqliteTestStore>> {
        let engine = Arc::new(CheckService::new(
            Arc::clone(store),
            Arc::new(EmptyMailbox),
            Arc::new(AccountDirectory::default()),
            CheckServiceConfig::default(),
        ));
        Arc::new(SweepService::new(
            Arc::clone(store),
            engine,
            SweepConfig::default(),
        ))
    }

    fn waiting_test() -> DeliveryTest {
        let mut test = DeliveryTest::new(
            EmailAddress::new("requester@example.com").unwrap(),
            None,
            vec![],
        );
        test.enqueue().unwrap();
        test
    }

    #[tokio::test]
    async fn sweep_task_processes_waiting_tests() {
        let store = memory_store();
        let test = waiting_test();
        let id = test.id;
        store.save(&test).await.unwrap();

        let task = create_sweep_task(sweep_over(&store));
        task().await.unwrap();

        let done = store.find_by_test_id(&id).await.unwrap().unwrap();
        assert_eq!(done.status, TestStatus::Completed);
        // No accounts configured: N=0 scores 0, not a division fault
        assert_eq!(done.overall_score, 0);
    }

    #[tokio::test]
    async fn purge_task_deletes_expired_records() {
        let store = memory_store();

        let mut expired = waiting_test();
        expired.created_at = Utc::now() - chrono::Duration::hours(48);
        let expired_id = expired.id;
        store.save(&expired).await.unwrap();

        let kept = waiting_test();
        let kept_id = kept.id;
        store.save(&kept).await.unwrap();

        let task = create_retention_purge_task(Arc::clone(&store), chrono::Duration::hours(24));
        task().await.unwrap();

        assert!(
            store
                .find_by_test_id(&expired_id)
                .await
                .unwrap()
                .is_none()
        );
        assert!(store.find_by_test_id(&kept_id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn purge_task_is_quiet_when_nothing_expires() {
        let store = memory_store();
        let task = create_retention_purge_task(Arc::clone(&store), chrono::Duration::hours(24));
        assert!(task().await.is_ok());
    }
}
