//! Deliverability check engine
//!
//! Owns the test lifecycle: picks a waiting test up, walks its monitored
//! accounts strictly in order through the provider probe, persists every
//! per-account outcome (so intermediate scores are visible mid-run), then
//! completes the test and hands the summary to the notifier.
//!
//! The `Processing` status is the test's advisory lock: this engine assumes
//! it is the only writer for a test at a time, and a `start_check` on an
//! already-processing test is a benign no-op. Running several engine
//! instances against one store would need a real lease instead.

use std::{collections::HashMap, fmt, sync::Arc, time::Duration};

use domain::entities::{DeliveryTest, TestStatus};
use domain::scoring::ScoringWeights;
use domain::value_objects::{EmailAddress, EmailProvider, TestId};
use tracing::{error, info, instrument, warn};

use crate::error::ApplicationError;
use crate::ports::{AccountDirectory, CompletionSummary, MailboxPort, NotifierPort, TestStorePort};
use crate::services::provider_probe::{ProbeOutcome, ProviderProbe};

/// Configuration for the check engine
#[derive(Debug, Clone)]
pub struct CheckServiceConfig {
    /// Bound on each account's connection attempt (default: 30s)
    pub connect_timeout: Duration,
    /// Pacing delay after each account completes (default: 2s)
    pub inter_account_delay: Duration,
    /// Per-provider overrides for the pacing delay; high-volume providers
    /// get a longer one (default: gmail 3s)
    pub account_delays: HashMap<EmailProvider, Duration>,
    /// Scoring penalty weights
    pub weights: ScoringWeights,
}

impl Default for CheckServiceConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(30),
            inter_account_delay: Duration::from_secs(2),
            account_delays: HashMap::from([(EmailProvider::Gmail, Duration::from_secs(3))]),
            weights: ScoringWeights::default(),
        }
    }
}

impl CheckServiceConfig {
    /// The pacing delay to apply after checking `provider`
    #[must_use]
    pub fn account_delay(&self, provider: EmailProvider) -> Duration {
        self.account_delays
            .get(&provider)
            .copied()
            .unwrap_or(self.inter_account_delay)
    }
}

/// Result of asking the engine to start a check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartCheckOutcome {
    /// The check was queued onto the engine
    Accepted,
    /// No test with that id exists
    NotFound,
    /// A pass is already in flight; nothing was changed
    AlreadyProcessing,
}

/// The deliverability test orchestration engine
pub struct CheckService<S: TestStorePort> {
    store: Arc<S>,
    probe: ProviderProbe,
    accounts: Arc<AccountDirectory>,
    notifier: Option<Arc<dyn NotifierPort>>,
    config: CheckServiceConfig,
}

impl<S: TestStorePort> fmt::Debug for CheckService<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CheckService")
            .field("accounts", &self.accounts.accounts().len())
            .field("has_notifier", &self.notifier.is_some())
            .finish_non_exhaustive()
    }
}

impl<S: TestStorePort> Clone for CheckService<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            probe: self.probe.clone(),
            accounts: Arc::clone(&self.accounts),
            notifier: self.notifier.as_ref().map(Arc::clone),
            config: self.config.clone(),
        }
    }
}

impl<S: TestStorePort + 'static> CheckService<S> {
    /// Create a new check engine
    #[must_use]
    pub fn new(
        store: Arc<S>,
        mailbox: Arc<dyn MailboxPort>,
        accounts: Arc<AccountDirectory>,
        config: CheckServiceConfig,
    ) -> Self {
        let probe = ProviderProbe::new(mailbox, config.connect_timeout);
        Self {
            store,
            probe,
            accounts,
            notifier: None,
            config,
        }
    }

    /// Attach a completion notifier
    #[must_use]
    pub fn with_notifier(mut self, notifier: Arc<dyn NotifierPort>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    /// Trigger a check asynchronously
    ///
    /// Validates the test and spawns the pass in the background; the result
    /// becomes observable through the store. Calling this while a pass is
    /// in flight changes nothing.
    #[instrument(skip(self), fields(test_id = %test_id))]
    pub async fn start_check(
        &self,
        test_id: &TestId,
    ) -> Result<StartCheckOutcome, ApplicationError> {
        let Some(test) = self.store.find_by_test_id(test_id).await? else {
            return Ok(StartCheckOutcome::NotFound);
        };

        if test.status == TestStatus::Processing {
            info!("Test already processing, skipping duplicate trigger");
            return Ok(StartCheckOutcome::AlreadyProcessing);
        }

        let engine = self.clone();
        let id = *test_id;
        tokio::spawn(async move {
            if let Err(e) = engine.run_check(&id).await {
                warn!(test_id = %id, error = %e, "Background check failed");
            }
        });

        Ok(StartCheckOutcome::Accepted)
    }

    /// Run one full check pass to completion
    ///
    /// Per-account errors are contained as that account's result; only an
    /// error escaping the whole iteration (store failure, vanished record)
    /// marks the test failed.
    #[instrument(skip(self), fields(test_id = %test_id))]
    pub async fn run_check(&self, test_id: &TestId) -> Result<(), ApplicationError> {
        let Some(mut test) = self.store.find_by_test_id(test_id).await? else {
            return Err(ApplicationError::NotFound(format!("test {test_id}")));
        };

        if test.status == TestStatus::Processing {
            // Advisory lock: a second pass is a benign skip, not an error.
            info!("Test already processing, skipping");
            return Ok(());
        }

        test.begin_processing()?;
        self.store.save(&test).await?;

        info!(code = %test.code, accounts = test.results.len(), "Starting mailbox checks");

        match self.execute_pass(&mut test).await {
            Ok(()) => {
                self.notify_completion(&test).await;
                Ok(())
            },
            Err(err) => {
                error!(error = %err, "Engine pass failed");
                self.mark_failed(test_id, &err).await;
                Err(err)
            },
        }
    }

    async fn execute_pass(&self, test: &mut DeliveryTest) -> Result<(), ApplicationError> {
        let planned: Vec<(EmailProvider, EmailAddress)> = test
            .results
            .iter()
            .map(|r| (r.provider, r.email_address.clone()))
            .collect();

        for (provider, address) in planned {
            let outcome = self.check_account(test, provider, &address).await;

            if let Some(result) = test.result_for_mut(&address) {
                match outcome {
                    ProbeOutcome::Delivered {
                        folder,
                        subject,
                        received_at,
                    } => result.mark_delivered(folder, subject, received_at),
                    ProbeOutcome::NotDelivered => result.mark_not_delivered(),
                    ProbeOutcome::Failed { error } => result.mark_error(error),
                }
            }

            // Persist after every account so intermediate scores are visible.
            test.rescore(&self.config.weights);
            self.store.save(test).await?;

            // Provider-side throttling pacing; a constant, not a retry.
            tokio::time::sleep(self.config.account_delay(provider)).await;
        }

        let checked = test.accounts_checked();
        test.complete(checked)?;
        self.store.save(test).await?;

        info!(score = test.overall_score, checked, "Test completed");
        Ok(())
    }

    async fn check_account(
        &self,
        test: &DeliveryTest,
        provider: EmailProvider,
        address: &EmailAddress,
    ) -> ProbeOutcome {
        let Some(account) = self.accounts.find(address) else {
            warn!(%address, "No mailbox configuration for address");
            return ProbeOutcome::Failed {
                error: format!("no mailbox configuration for {address}"),
            };
        };

        if !account.credentials.is_complete() {
            warn!(%address, "Mailbox credentials not configured");
            return ProbeOutcome::Failed {
                error: "mailbox credentials not configured".to_string(),
            };
        }

        let folders = self.accounts.folders_for(provider);
        if folders.is_empty() {
            warn!(%provider, "No folder list configured for provider");
            return ProbeOutcome::Failed {
                error: format!("no folder list configured for {provider}"),
            };
        }

        self.probe.run(account, folders, &test.code).await
    }

    async fn notify_completion(&self, test: &DeliveryTest) {
        let Some(notifier) = &self.notifier else {
            return;
        };

        let summary = CompletionSummary::from_test(test);
        // Best-effort: a failed notification never reverts completion.
        if let Err(e) = notifier.send_completion_summary(&summary).await {
            warn!(error = %e, "Completion notification failed");
        }
    }

    async fn mark_failed(&self, test_id: &TestId, err: &ApplicationError) {
        match self.store.find_by_test_id(test_id).await {
            Ok(Some(mut fresh)) => {
                if fresh.fail(err.to_string()).is_ok()
                    && let Err(save_err) = self.store.save(&fresh).await
                {
                    error!(error = %save_err, "Could not persist failed status");
                }
            },
            Ok(None) => warn!("Test disappeared before failure could be recorded"),
            Err(load_err) => error!(error = %load_err, "Could not load test to record failure"),
        }
    }
}
