//! Completion notification port
//!
//! The engine decides when to notify and what to send; delivery mechanics
//! live behind this port. Sending is best-effort: a failure is logged and
//! never flips a completed test back to failed.

use async_trait::async_trait;
use domain::entities::{DeliveryStatus, DeliveryTest};
use domain::scoring::{ResultCounts, tally};
use domain::value_objects::{EmailAddress, EmailProvider, FolderCategory};
#[cfg(test)]
use mockall::automock;
use thiserror::Error;

/// Notification delivery errors
#[derive(Debug, Error)]
pub enum NotifierError {
    /// The notifier is not configured (missing transport settings)
    #[error("Notifier not configured: {0}")]
    NotConfigured(String),

    /// Sending failed
    #[error("Failed to send notification: {0}")]
    Send(String),
}

/// One account's outcome in a completion summary
#[derive(Debug, Clone)]
pub struct AccountOutcome {
    /// Provider of the monitored mailbox
    pub provider: EmailProvider,
    /// The monitored address
    pub email_address: EmailAddress,
    /// Final delivery status
    pub status: DeliveryStatus,
    /// Normalized folder the probe landed in
    pub folder: FolderCategory,
    /// Error message for unreachable accounts
    pub error: Option<String>,
}

/// Everything the notifier needs to describe a finished test
#[derive(Debug, Clone)]
pub struct CompletionSummary {
    /// Who receives the summary
    pub recipient: EmailAddress,
    /// Optional display name for the greeting
    pub user_name: Option<String>,
    /// Final deliverability score
    pub score: u8,
    /// Derived counts over the results
    pub counts: ResultCounts,
    /// Per-account outcomes, in check order
    pub outcomes: Vec<AccountOutcome>,
    /// Public report link, when configured
    pub report_link: Option<String>,
}

impl CompletionSummary {
    /// Build a summary from a completed test record
    #[must_use]
    pub fn from_test(test: &DeliveryTest) -> Self {
        Self {
            recipient: test.user_email.clone(),
            user_name: test.user_name.clone(),
            score: test.overall_score,
            counts: tally(&test.results),
            outcomes: test
                .results
                .iter()
                .map(|r| AccountOutcome {
                    provider: r.provider,
                    email_address: r.email_address.clone(),
                    status: r.status,
                    folder: r.folder,
                    error: r.error.clone(),
                })
                .collect(),
            report_link: test.shareable_link.clone(),
        }
    }
}

/// Port for delivering completion summaries
#[cfg_attr(test, automock)]
#[async_trait]
pub trait NotifierPort: Send + Sync {
    /// Send the completion summary to the requester
    async fn send_completion_summary(
        &self,
        summary: &CompletionSummary,
    ) -> Result<(), NotifierError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::entities::ProviderResult;
    use domain::scoring::ScoringWeights;

    #[test]
    fn summary_mirrors_test_record() {
        let mut test = DeliveryTest::new(
            EmailAddress::new("requester@example.com").unwrap(),
            None,
            vec![
                ProviderResult::pending(
                    EmailProvider::Gmail,
                    EmailAddress::new("probe@gmail.com").unwrap(),
                ),
                ProviderResult::pending(
                    EmailProvider::Outlook,
                    EmailAddress::new("probe@outlook.com").unwrap(),
                ),
            ],
        )
        .with_shareable_link("https://inboxsight.dev/report/abc");

        test.results[0].mark_delivered(FolderCategory::Inbox, None, None);
        test.results[1].mark_error("timeout");
        test.rescore(&ScoringWeights::default());

        let summary = CompletionSummary::from_test(&test);
        assert_eq!(summary.recipient.as_str(), "requester@example.com");
        assert_eq!(summary.score, test.overall_score);
        assert_eq!(summary.outcomes.len(), 2);
        assert_eq!(summary.counts.inbox, 1);
        assert_eq!(summary.counts.errors, 1);
        assert_eq!(
            summary.report_link.as_deref(),
            Some("https://inboxsight.dev/report/abc")
        );
        assert_eq!(summary.outcomes[1].error.as_deref(), Some("timeout"));
    }
}
