//! Deliverability scoring
//!
//! A pure function over the per-account results. The score rewards inbox
//! placement and penalizes spam placement and unreachable accounts:
//!
//! ```text
//! score = round((inbox/n)*100 - (spam/n)*spam_penalty - (errors/n)*error_penalty)
//! ```
//!
//! clamped to `[0, 100]`, with an empty result set scoring 0.

use serde::{Deserialize, Serialize};

use crate::entities::{DeliveryStatus, ProviderResult};
use crate::value_objects::FolderCategory;

/// Penalty weights applied by the scoring formula
///
/// Spam placement is weighted heavier than a check error: a message in the
/// spam folder is a worse deliverability signal than an account the engine
/// could not reach.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoringWeights {
    /// Penalty per full spam-placement ratio
    pub spam_penalty: f64,
    /// Penalty per full error ratio
    pub error_penalty: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            spam_penalty: 30.0,
            error_penalty: 15.0,
        }
    }
}

impl ScoringWeights {
    /// The stricter weighting variant (50/25)
    #[must_use]
    pub const fn strict() -> Self {
        Self {
            spam_penalty: 50.0,
            error_penalty: 25.0,
        }
    }
}

/// Derived counts over a result set
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultCounts {
    /// Total monitored accounts
    pub total: u32,
    /// Accounts where the probe was found in any folder
    pub delivered: u32,
    /// Delivered into the inbox
    pub inbox: u32,
    /// Delivered into spam
    pub spam: u32,
    /// Accounts that could not be checked
    pub errors: u32,
    /// Accounts where the probe was not found
    pub not_delivered: u32,
}

/// Count delivery outcomes over a result set
#[must_use]
pub fn tally(results: &[ProviderResult]) -> ResultCounts {
    let mut counts = ResultCounts {
        total: u32::try_from(results.len()).unwrap_or(u32::MAX),
        ..ResultCounts::default()
    };

    for result in results {
        match result.status {
            DeliveryStatus::Delivered => {
                counts.delivered += 1;
                match result.folder {
                    FolderCategory::Inbox => counts.inbox += 1,
                    FolderCategory::Spam => counts.spam += 1,
                    _ => {},
                }
            },
            DeliveryStatus::Error => counts.errors += 1,
            DeliveryStatus::NotDelivered => counts.not_delivered += 1,
            DeliveryStatus::Pending => {},
        }
    }

    counts
}

/// Compute the bounded deliverability score for a result set
#[must_use]
pub fn deliverability_score(results: &[ProviderResult], weights: &ScoringWeights) -> u8 {
    let counts = tally(results);
    if counts.total == 0 {
        return 0;
    }

    let n = f64::from(counts.total);
    let base = f64::from(counts.inbox) / n * 100.0;
    let spam_penalty = f64::from(counts.spam) / n * weights.spam_penalty;
    let error_penalty = f64::from(counts.errors) / n * weights.error_penalty;

    let score = (base - spam_penalty - error_penalty).round();
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let bounded = score.clamp(0.0, 100.0) as u8;
    bounded
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value_objects::{EmailAddress, EmailProvider};

    fn result(status: DeliveryStatus, folder: FolderCategory) -> ProviderResult {
        let mut r = ProviderResult::pending(
            EmailProvider::Gmail,
            EmailAddress::new("probe@gmail.com").unwrap(),
        );
        match status {
            DeliveryStatus::Delivered => r.mark_delivered(folder, None, None),
            DeliveryStatus::NotDelivered => r.mark_not_delivered(),
            DeliveryStatus::Error => r.mark_error("unreachable"),
            DeliveryStatus::Pending => {},
        }
        r
    }

    #[test]
    fn empty_result_set_scores_zero() {
        assert_eq!(deliverability_score(&[], &ScoringWeights::default()), 0);
    }

    #[test]
    fn all_inbox_scores_hundred() {
        let results = vec![
            result(DeliveryStatus::Delivered, FolderCategory::Inbox),
            result(DeliveryStatus::Delivered, FolderCategory::Inbox),
        ];
        assert_eq!(
            deliverability_score(&results, &ScoringWeights::default()),
            100
        );
    }

    #[test]
    fn two_inbox_one_spam_of_three_scores_57() {
        // round((2/3)*100 - (1/3)*30) = round(66.7 - 10) = 57
        let results = vec![
            result(DeliveryStatus::Delivered, FolderCategory::Inbox),
            result(DeliveryStatus::Delivered, FolderCategory::Inbox),
            result(DeliveryStatus::Delivered, FolderCategory::Spam),
        ];
        assert_eq!(
            deliverability_score(&results, &ScoringWeights::default()),
            57
        );
    }

    #[test]
    fn one_inbox_one_spam_of_two_scores_35() {
        // round(50 - 15) = 35
        let results = vec![
            result(DeliveryStatus::Delivered, FolderCategory::Inbox),
            result(DeliveryStatus::Delivered, FolderCategory::Spam),
        ];
        assert_eq!(
            deliverability_score(&results, &ScoringWeights::default()),
            35
        );
    }

    #[test]
    fn all_spam_clamps_to_zero() {
        let results = vec![
            result(DeliveryStatus::Delivered, FolderCategory::Spam),
            result(DeliveryStatus::Delivered, FolderCategory::Spam),
        ];
        assert_eq!(deliverability_score(&results, &ScoringWeights::default()), 0);
    }

    #[test]
    fn errors_apply_lighter_penalty_than_spam() {
        let spam = vec![
            result(DeliveryStatus::Delivered, FolderCategory::Inbox),
            result(DeliveryStatus::Delivered, FolderCategory::Spam),
        ];
        let error = vec![
            result(DeliveryStatus::Delivered, FolderCategory::Inbox),
            result(DeliveryStatus::Error, FolderCategory::NotFound),
        ];
        let weights = ScoringWeights::default();
        assert!(deliverability_score(&error, &weights) > deliverability_score(&spam, &weights));
    }

    #[test]
    fn strict_weights_penalize_harder() {
        let results = vec![
            result(DeliveryStatus::Delivered, FolderCategory::Inbox),
            result(DeliveryStatus::Delivered, FolderCategory::Spam),
        ];
        let default = deliverability_score(&results, &ScoringWeights::default());
        let strict = deliverability_score(&results, &ScoringWeights::strict());
        assert!(strict < default);
        // round(50 - 25) = 25
        assert_eq!(strict, 25);
    }

    #[test]
    fn tally_counts_each_outcome() {
        let results = vec![
            result(DeliveryStatus::Delivered, FolderCategory::Inbox),
            result(DeliveryStatus::Delivered, FolderCategory::Spam),
            result(DeliveryStatus::NotDelivered, FolderCategory::NotFound),
            result(DeliveryStatus::Error, FolderCategory::NotFound),
            result(DeliveryStatus::Pending, FolderCategory::NotFound),
        ];
        let counts = tally(&results);
        assert_eq!(counts.total, 5);
        assert_eq!(counts.delivered, 2);
        assert_eq!(counts.inbox, 1);
        assert_eq!(counts.spam, 1);
        assert_eq!(counts.not_delivered, 1);
        assert_eq!(counts.errors, 1);
    }

    #[test]
    fn delivered_elsewhere_earns_no_inbox_credit() {
        let results = vec![result(DeliveryStatus::Delivered, FolderCategory::AllMail)];
        assert_eq!(deliverability_score(&results, &ScoringWeights::default()), 0);
        let counts = tally(&results);
        assert_eq!(counts.delivered, 1);
        assert_eq!(counts.inbox, 0);
        assert_eq!(counts.spam, 0);
    }
}
