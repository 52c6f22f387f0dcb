//! Per-account delivery outcome record

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::value_objects::{EmailAddress, EmailProvider, FolderCategory};

/// Delivery status of the probe for one monitored account
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryStatus {
    /// Not yet checked in this run
    Pending,
    /// Probe found in a folder
    Delivered,
    /// Probe not found in any searched folder
    NotDelivered,
    /// The account could not be checked
    Error,
}

impl DeliveryStatus {
    /// Whether this account has been resolved in the current check cycle
    #[must_use]
    pub const fn is_checked(&self) -> bool {
        !matches!(self, Self::Pending)
    }

    /// Get a human-readable label
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Delivered => "Delivered",
            Self::NotDelivered => "Not Delivered",
            Self::Error => "Error",
        }
    }
}

impl std::fmt::Display for DeliveryStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// The outcome of searching one monitored account for the probe message
///
/// One record per account, created `Pending` when the test is created and
/// mutated in place by the check engine. Records are never added or removed
/// after creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderResult {
    /// Which provider this mailbox belongs to
    pub provider: EmailProvider,
    /// The monitored mailbox address
    pub email_address: EmailAddress,
    /// Delivery status for this account
    pub status: DeliveryStatus,
    /// Normalized folder the probe landed in
    pub folder: FolderCategory,
    /// Subject of the matched message, when metadata was readable
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    /// When the matched message was received
    #[serde(skip_serializing_if = "Option::is_none")]
    pub received_at: Option<DateTime<Utc>>,
    /// When this account was last checked
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checked_at: Option<DateTime<Utc>>,
    /// Error message when the account could not be checked
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ProviderResult {
    /// Create a fresh pending record for one monitored account
    #[must_use]
    pub const fn pending(provider: EmailProvider, email_address: EmailAddress) -> Self {
        Self {
            provider,
            email_address,
            status: DeliveryStatus::Pending,
            folder: FolderCategory::NotFound,
            subject: None,
            received_at: None,
            checked_at: None,
            error: None,
        }
    }

    /// Record a successful delivery into `folder`
    ///
    /// Metadata is best-effort: a match with unreadable headers still
    /// counts as delivered, with `subject`/`received_at` left empty.
    pub fn mark_delivered(
        &mut self,
        folder: FolderCategory,
        subject: Option<String>,
        received_at: Option<DateTime<Utc>>,
    ) {
        self.status = DeliveryStatus::Delivered;
        self.folder = folder;
        self.subject = subject;
        self.received_at = received_at;
        self.error = None;
        self.checked_at = Some(Utc::now());
    }

    /// Record that the probe was not found in any folder
    pub fn mark_not_delivered(&mut self) {
        self.status = DeliveryStatus::NotDelivered;
        self.folder = FolderCategory::NotFound;
        self.error = None;
        self.checked_at = Some(Utc::now());
    }

    /// Record that this account could not be checked
    pub fn mark_error(&mut self, message: impl Into<String>) {
        self.status = DeliveryStatus::Error;
        self.folder = FolderCategory::NotFound;
        self.error = Some(message.into());
        self.checked_at = Some(Utc::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pending_result() -> ProviderResult {
        ProviderResult::pending(
            EmailProvider::Gmail,
            EmailAddress::new("probe@gmail.com").unwrap(),
        )
    }

    #[test]
    fn pending_record_starts_unchecked() {
        let result = pending_result();
        assert_eq!(result.status, DeliveryStatus::Pending);
        assert_eq!(result.folder, FolderCategory::NotFound);
        assert!(result.checked_at.is_none());
        assert!(!result.status.is_checked());
    }

    #[test]
    fn mark_delivered_records_folder_and_metadata() {
        let mut result = pending_result();
        let received = Utc::now();
        result.mark_delivered(
            FolderCategory::Inbox,
            Some("Deliverability probe".to_string()),
            Some(received),
        );

        assert_eq!(result.status, DeliveryStatus::Delivered);
        assert_eq!(result.folder, FolderCategory::Inbox);
        assert_eq!(result.subject.as_deref(), Some("Deliverability probe"));
        assert_eq!(result.received_at, Some(received));
        assert!(result.checked_at.is_some());
        assert!(result.error.is_none());
    }

    #[test]
    fn mark_delivered_without_metadata_still_counts() {
        let mut result = pending_result();
        result.mark_delivered(FolderCategory::Spam, None, None);

        assert_eq!(result.status, DeliveryStatus::Delivered);
        assert_eq!(result.folder, FolderCategory::Spam);
        assert!(result.subject.is_none());
        assert!(result.received_at.is_none());
    }

    #[test]
    fn mark_not_delivered_resets_folder() {
        let mut result = pending_result();
        result.mark_not_delivered();

        assert_eq!(result.status, DeliveryStatus::NotDelivered);
        assert_eq!(result.folder, FolderCategory::NotFound);
        assert!(result.checked_at.is_some());
    }

    #[test]
    fn mark_error_records_message() {
        let mut result = pending_result();
        result.mark_error("connection timeout after 30s");

        assert_eq!(result.status, DeliveryStatus::Error);
        assert_eq!(result.folder, FolderCategory::NotFound);
        assert_eq!(result.error.as_deref(), Some("connection timeout after 30s"));
    }

    #[test]
    fn error_clears_on_later_delivery() {
        let mut result = pending_result();
        result.mark_error("transient failure");
        result.mark_delivered(FolderCategory::Inbox, None, None);

        assert!(result.error.is_none());
        assert_eq!(result.status, DeliveryStatus::Delivered);
    }
}
