//! Provider check orchestration
//!
//! Resolves the delivery outcome for exactly one monitored account: open a
//! bounded connection, walk the provider's folders in priority order, and
//! stop at the first folder containing the probe code. Every failure mode
//! is contained here and reported as the account's outcome; nothing in this
//! module aborts the surrounding test pass.

use std::{fmt, sync::Arc, time::Duration};

use chrono::{DateTime, Utc};
use domain::value_objects::{EmailProvider, FolderCategory, TestCode};
use tracing::{debug, instrument, warn};

use crate::ports::{MailboxConnection, MailboxError, MailboxPort, MonitoredAccount};
use crate::services::folder_resolver::resolve_folder;

/// The resolved outcome for one account
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeOutcome {
    /// The probe was found; first matching folder wins
    Delivered {
        folder: FolderCategory,
        subject: Option<String>,
        received_at: Option<DateTime<Utc>>,
    },
    /// No folder in the priority list contained the probe
    NotDelivered,
    /// The account could not be checked
    Failed { error: String },
}

/// Runs the search-and-resolve sequence for single accounts
pub struct ProviderProbe {
    mailbox: Arc<dyn MailboxPort>,
    connect_timeout: Duration,
}

impl fmt::Debug for ProviderProbe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderProbe")
            .field("connect_timeout", &self.connect_timeout)
            .finish_non_exhaustive()
    }
}

impl Clone for ProviderProbe {
    fn clone(&self) -> Self {
        Self {
            mailbox: Arc::clone(&self.mailbox),
            connect_timeout: self.connect_timeout,
        }
    }
}

impl ProviderProbe {
    /// Create a probe over a mailbox adapter
    #[must_use]
    pub fn new(mailbox: Arc<dyn MailboxPort>, connect_timeout: Duration) -> Self {
        Self {
            mailbox,
            connect_timeout,
        }
    }

    /// Check one account for the probe code
    ///
    /// Never fails: connection, authentication, and timeout errors all
    /// collapse into [`ProbeOutcome::Failed`] for this account alone.
    #[instrument(skip(self, account, folders), fields(address = %account.address, provider = %account.provider))]
    pub async fn run(
        &self,
        account: &MonitoredAccount,
        folders: &[String],
        code: &TestCode,
    ) -> ProbeOutcome {
        match self.check(account, folders, code).await {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(error = %e, "Account check failed");
                ProbeOutcome::Failed {
                    error: e.to_string(),
                }
            },
        }
    }

    async fn check(
        &self,
        account: &MonitoredAccount,
        folders: &[String],
        code: &TestCode,
    ) -> Result<ProbeOutcome, MailboxError> {
        debug!("Connecting to mailbox");

        // The adapter gets the deadline for socket-level bounds; the outer
        // timeout is the authoritative one.
        let connect = self.mailbox.connect(account, self.connect_timeout);
        let mut conn = tokio::time::timeout(self.connect_timeout, connect)
            .await
            .map_err(|_| MailboxError::Timeout(self.connect_timeout.as_secs()))??;

        let outcome = Self::search_folders(conn.as_mut(), account.provider, folders, code).await;

        // The connection is closed on every path, including folder errors.
        if let Err(e) = conn.close().await {
            debug!(error = %e, "Error closing mailbox connection");
        }

        Ok(outcome)
    }

    async fn search_folders(
        conn: &mut dyn MailboxConnection,
        provider: EmailProvider,
        folders: &[String],
        code: &TestCode,
    ) -> ProbeOutcome {
        for folder in folders {
            debug!(folder = %folder, "Searching folder");

            // A single unreadable folder must not fail the account.
            if let Err(e) = conn.open_folder(folder).await {
                warn!(folder = %folder, error = %e, "Could not open folder, skipping");
                continue;
            }

            let matches = match conn.search_text(code.as_str()).await {
                Ok(ids) => ids,
                Err(e) => {
                    warn!(folder = %folder, error = %e, "Search failed, skipping folder");
                    continue;
                },
            };

            let Some(first) = matches.first().copied() else {
                continue;
            };

            // First match wins; remaining folders are never searched.
            let category = resolve_folder(provider, folder);
            debug!(folder = %folder, category = %category, matches = matches.len(), "Probe found");

            return match conn.fetch_metadata(first).await {
                Ok(meta) => ProbeOutcome::Delivered {
                    folder: category,
                    subject: meta.subject,
                    received_at: meta.received_at,
                },
                // Metadata is enrichment only; the placement stands.
                Err(e) => {
                    warn!(error = %e, "Metadata fetch failed, recording delivery without it");
                    ProbeOutcome::Delivered {
                        folder: category,
                        subject: None,
                        received_at: None,
                    }
                },
            };
        }

        ProbeOutcome::NotDelivered
    }
}
