//! Append-only audit history for a deliverability test
//!
//! Every state transition appends exactly one entry. The payload is a
//! tagged variant per action type, so the log stays structurally typed
//! instead of carrying a free-form details blob.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::value_objects::{EmailAddress, TestCode};

/// What happened, with only the fields relevant to that action
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum HistoryAction {
    /// The test record was created
    TestCreated {
        user_email: EmailAddress,
        #[serde(skip_serializing_if = "Option::is_none")]
        user_name: Option<String>,
    },
    /// The engine began a processing pass
    ProcessingStarted {
        started_at: DateTime<Utc>,
        test_code: TestCode,
    },
    /// All accounts were attempted and the score computed
    ProcessingCompleted {
        completed_at: DateTime<Utc>,
        duration_ms: i64,
        accounts_checked: usize,
    },
    /// An engine-level error aborted the pass
    ProcessingFailed {
        error: String,
        failed_at: DateTime<Utc>,
    },
    /// The recovery sweep reset a test stranded in processing
    ResetStuckTest {
        reason: String,
        reset_at: DateTime<Utc>,
    },
    /// The recovery sweep picked this test up for processing
    SweepPickup { picked_at: DateTime<Utc> },
}

impl HistoryAction {
    /// Short action name, matching the serialized tag
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::TestCreated { .. } => "test_created",
            Self::ProcessingStarted { .. } => "processing_started",
            Self::ProcessingCompleted { .. } => "processing_completed",
            Self::ProcessingFailed { .. } => "processing_failed",
            Self::ResetStuckTest { .. } => "reset_stuck_test",
            Self::SweepPickup { .. } => "sweep_pickup",
        }
    }
}

/// One ordered entry in a test's audit history
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// The action and its payload
    #[serde(flatten)]
    pub action: HistoryAction,
    /// When the entry was appended
    pub timestamp: DateTime<Utc>,
}

impl HistoryEntry {
    /// Create an entry stamped with the current time
    #[must_use]
    pub fn now(action: HistoryAction) -> Self {
        Self {
            action,
            timestamp: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entry_serializes_with_action_tag() {
        let entry = HistoryEntry::now(HistoryAction::ResetStuckTest {
            reason: "processing timeout".to_string(),
            reset_at: Utc::now(),
        });

        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["action"], "reset_stuck_test");
        assert_eq!(json["reason"], "processing timeout");
        assert!(json["timestamp"].is_string());
    }

    #[test]
    fn created_entry_omits_missing_user_name() {
        let entry = HistoryEntry::now(HistoryAction::TestCreated {
            user_email: EmailAddress::new("user@example.com").unwrap(),
            user_name: None,
        });

        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["action"], "test_created");
        assert!(json.get("user_name").is_none());
    }

    #[test]
    fn action_names_match_tags() {
        let action = HistoryAction::ProcessingFailed {
            error: "store unreachable".to_string(),
            failed_at: Utc::now(),
        };
        assert_eq!(action.name(), "processing_failed");

        let json = serde_json::to_value(&action).unwrap();
        assert_eq!(json["action"], action.name());
    }

    #[test]
    fn entry_roundtrips_through_json() {
        let entry = HistoryEntry::now(HistoryAction::ProcessingCompleted {
            completed_at: Utc::now(),
            duration_ms: 4200,
            accounts_checked: 3,
        });

        let json = serde_json::to_string(&entry).unwrap();
        let back: HistoryEntry = serde_json::from_str(&json).unwrap();
        match back.action {
            HistoryAction::ProcessingCompleted {
                duration_ms,
                accounts_checked,
                ..
            } => {
                assert_eq!(duration_ms, 4200);
                assert_eq!(accounts_checked, 3);
            },
            _ => unreachable!("Expected ProcessingCompleted"),
        }
    }
}
