//! Cron-based task scheduler for recurring background work
//!
//! Wraps `tokio-cron-scheduler` with a named-task registry and per-task
//! run/failure counters. Used for the recovery sweep and the retention
//! purge.

use std::{collections::HashMap, str::FromStr, sync::Arc};

use chrono::{DateTime, Utc};
use futures::future::BoxFuture;
use parking_lot::RwLock;
use thiserror::Error;
use tokio_cron_scheduler::{Job, JobScheduler, JobSchedulerError};
use tracing::{debug, error, info};

/// Scheduler errors
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// Invalid cron expression
    #[error("Invalid cron expression: {0}")]
    InvalidCronExpression(String),

    /// Scheduler failed to start
    #[error("Scheduler failed to start: {0}")]
    StartupFailed(String),

    /// Internal scheduler error
    #[error("Internal scheduler error: {0}")]
    Internal(String),
}

impl From<JobSchedulerError> for SchedulerError {
    fn from(err: JobSchedulerError) -> Self {
        Self::Internal(err.to_string())
    }
}

/// A schedulable task closure
pub type TaskFn = Arc<dyn Fn() -> BoxFuture<'static, Result<(), String>> + Send + Sync>;

/// Statistics for a scheduled task
#[derive(Debug, Clone, Default)]
pub struct TaskStats {
    /// Cron expression the task runs on
    pub cron_expression: String,
    /// Number of successful executions
    pub success_count: u64,
    /// Number of failed executions
    pub failure_count: u64,
    /// Last execution time
    pub last_run: Option<DateTime<Utc>>,
    /// Last error message
    pub last_error: Option<String>,
}

/// Named-task cron scheduler
pub struct Scheduler {
    inner: JobScheduler,
    stats: Arc<RwLock<HashMap<String, TaskStats>>>,
}

impl std::fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scheduler")
            .field("tasks", &self.stats.read().len())
            .finish_non_exhaustive()
    }
}

impl Scheduler {
    /// Create a new scheduler (not yet started)
    pub async fn new() -> Result<Self, SchedulerError> {
        let inner = JobScheduler::new().await?;
        Ok(Self {
            inner,
            stats: Arc::new(RwLock::new(HashMap::new())),
        })
    }

    /// Register a named task on a cron schedule (seconds-resolution syntax)
    pub async fn add_task(
        &self,
        name: &str,
        cron_expression: &str,
        task: TaskFn,
    ) -> Result<(), SchedulerError> {
        // Validate eagerly so a bad expression fails at startup, not silently
        cron::Schedule::from_str(cron_expression)
            .map_err(|e| SchedulerError::InvalidCronExpression(format!("{cron_expression}: {e}")))?;

        self.stats.write().insert(
            name.to_string(),
            TaskStats {
                cron_expression: cron_expression.to_string(),
                ..TaskStats::default()
            },
        );

        let task_name = name.to_string();
        let stats = Arc::clone(&self.stats);

        let job = Job::new_async(cron_expression, move |_uuid, _lock| {
            let task = Arc::clone(&task);
            let stats = Arc::clone(&stats);
            let task_name = task_name.clone();

            Box::pin(async move {
                debug!(task = %task_name, "Running scheduled task");
                let result = task().await;

                let mut stats = stats.write();
                if let Some(entry) = stats.get_mut(&task_name) {
                    entry.last_run = Some(Utc::now());
                    match result {
                        Ok(()) => entry.success_count += 1,
                        Err(e) => {
                            error!(task = %task_name, error = %e, "Scheduled task failed");
                            entry.failure_count += 1;
                            entry.last_error = Some(e);
                        },
                    }
                }
            })
        })?;

        self.inner.add(job).await?;
        info!(task = %name, cron = %cron_expression, "Scheduled task registered");
        Ok(())
    }

    /// Start executing registered tasks
    pub async fn start(&self) -> Result<(), SchedulerError> {
        self.inner
            .start()
            .await
            .map_err(|e| SchedulerError::StartupFailed(e.to_string()))?;
        info!("Scheduler started");
        Ok(())
    }

    /// Stop the scheduler, letting in-flight tasks finish
    pub async fn shutdown(&mut self) -> Result<(), SchedulerError> {
        self.inner.shutdown().await?;
        info!("Scheduler stopped");
        Ok(())
    }

    /// Snapshot of all task statistics
    #[must_use]
    pub fn stats(&self) -> HashMap<String, TaskStats> {
        self.stats.read().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counting_task(counter: Arc<AtomicUsize>) -> TaskFn {
        Arc::new(move || {
            let counter = Arc::clone(&counter);
            Box::pin(async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
        })
    }

    #[tokio::test]
    async fn invalid_cron_expression_is_rejected() {
        let scheduler = Scheduler::new().await.unwrap();
        let task: TaskFn = Arc::new(|| Box::pin(async { Ok(()) }));

        let result = scheduler.add_task("bad", "not a cron", task).await;
        assert!(matches!(
            result,
            Err(SchedulerError::InvalidCronExpression(_))
        ));
    }

    #[tokio::test]
    async fn registered_task_appears_in_stats() {
        let scheduler = Scheduler::new().await.unwrap();
        let counter = Arc::new(AtomicUsize::new(0));

        scheduler
            .add_task("sweep", "0 */2 * * * *", counting_task(counter))
            .await
            .unwrap();

        let stats = scheduler.stats();
        let entry = stats.get("sweep").unwrap();
        assert_eq!(entry.cron_expression, "0 */2 * * * *");
        assert_eq!(entry.success_count, 0);
        assert!(entry.last_run.is_none());
    }

    #[tokio::test]
    async fn every_second_task_actually_fires() {
        let mut scheduler = Scheduler::new().await.unwrap();
        let counter = Arc::new(AtomicUsize::new(0));

        scheduler
            .add_task("tick", "* * * * * *", counting_task(Arc::clone(&counter)))
            .await
            .unwrap();
        scheduler.start().await.unwrap();

        tokio::time::sleep(std::time::Duration::from_millis(2500)).await;
        scheduler.shutdown().await.unwrap();

        assert!(counter.load(Ordering::SeqCst) >= 1);
        let stats = scheduler.stats();
        assert!(stats.get("tick").unwrap().success_count >= 1);
    }
}
