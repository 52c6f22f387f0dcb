//! Property-based tests for scoring and domain value objects
//!
//! These tests use proptest to verify invariants across many random inputs.

use domain::entities::{DeliveryStatus, ProviderResult};
use domain::scoring::{ScoringWeights, deliverability_score, tally};
use domain::value_objects::{EmailAddress, EmailProvider, FolderCategory, TestCode, TestId};
use proptest::prelude::*;

// ============================================================================
// Scoring Property Tests
// ============================================================================

fn arb_folder() -> impl Strategy<Value = FolderCategory> {
    prop_oneof![
        Just(FolderCategory::Inbox),
        Just(FolderCategory::Spam),
        Just(FolderCategory::Promotions),
        Just(FolderCategory::AllMail),
        Just(FolderCategory::Other),
    ]
}

fn arb_result() -> impl Strategy<Value = ProviderResult> {
    let status = prop_oneof![
        Just(DeliveryStatus::Pending),
        Just(DeliveryStatus::Delivered),
        Just(DeliveryStatus::NotDelivered),
        Just(DeliveryStatus::Error),
    ];
    (status, arb_folder()).prop_map(|(status, folder)| {
        let mut result = ProviderResult::pending(
            EmailProvider::Gmail,
            EmailAddress::new("probe@gmail.com").unwrap(),
        );
        match status {
            DeliveryStatus::Pending => {},
            DeliveryStatus::Delivered => result.mark_delivered(folder, None, None),
            DeliveryStatus::NotDelivered => result.mark_not_delivered(),
            DeliveryStatus::Error => result.mark_error("unreachable"),
        }
        result
    })
}

fn arb_weights() -> impl Strategy<Value = ScoringWeights> {
    (0.0f64..=100.0, 0.0f64..=100.0).prop_map(|(spam_penalty, error_penalty)| ScoringWeights {
        spam_penalty,
        error_penalty,
    })
}

mod scoring_tests {
    use super::*;

    proptest! {
        #[test]
        fn score_is_always_bounded(
            results in proptest::collection::vec(arb_result(), 0..12),
            weights in arb_weights()
        ) {
            let score = deliverability_score(&results, &weights);
            prop_assert!(score <= 100);
        }

        #[test]
        fn empty_result_set_scores_zero(weights in arb_weights()) {
            prop_assert_eq!(deliverability_score(&[], &weights), 0);
        }

        #[test]
        fn all_inbox_always_scores_hundred(
            n in 1usize..10,
            weights in arb_weights()
        ) {
            let results: Vec<_> = (0..n)
                .map(|_| {
                    let mut r = ProviderResult::pending(
                        EmailProvider::Gmail,
                        EmailAddress::new("probe@gmail.com").unwrap(),
                    );
                    r.mark_delivered(FolderCategory::Inbox, None, None);
                    r
                })
                .collect();
            prop_assert_eq!(deliverability_score(&results, &weights), 100);
        }

        #[test]
        fn tally_counts_sum_to_total(
            results in proptest::collection::vec(arb_result(), 0..12)
        ) {
            let counts = tally(&results);
            let pending = results
                .iter()
                .filter(|r| r.status == DeliveryStatus::Pending)
                .count() as u32;
            prop_assert_eq!(
                counts.delivered + counts.not_delivered + counts.errors + pending,
                counts.total
            );
            prop_assert!(counts.inbox + counts.spam <= counts.delivered);
        }

        #[test]
        fn heavier_spam_penalty_never_raises_score(
            results in proptest::collection::vec(arb_result(), 1..10),
            base in 0.0f64..=50.0,
            extra in 0.0f64..=50.0
        ) {
            let light = ScoringWeights { spam_penalty: base, error_penalty: 15.0 };
            let heavy = ScoringWeights { spam_penalty: base + extra, error_penalty: 15.0 };
            prop_assert!(
                deliverability_score(&results, &heavy)
                    <= deliverability_score(&results, &light)
            );
        }
    }
}

// ============================================================================
// Value Object Property Tests
// ============================================================================

mod test_code_tests {
    use super::*;

    proptest! {
        #[test]
        fn generated_codes_always_parse(_seed in 0u8..255) {
            let code = TestCode::generate();
            let parsed = TestCode::parse(code.as_str());
            prop_assert!(parsed.is_ok());
            prop_assert_eq!(parsed.unwrap(), code);
        }

        #[test]
        fn parse_never_accepts_wrong_length(s in "[0-9A-F]{1,11}") {
            prop_assert!(TestCode::parse(&s).is_err());
        }

        #[test]
        fn parse_is_case_insensitive(s in "[0-9a-f]{12}") {
            let lower = TestCode::parse(&s);
            let upper = TestCode::parse(&s.to_uppercase());
            prop_assert!(lower.is_ok());
            prop_assert_eq!(lower.unwrap(), upper.unwrap());
        }
    }
}

mod test_id_tests {
    use super::*;

    proptest! {
        #[test]
        fn display_roundtrips(_seed in 0u8..255) {
            let id = TestId::new();
            let parsed = TestId::parse(&id.to_string());
            prop_assert!(parsed.is_ok());
            prop_assert_eq!(parsed.unwrap(), id);
        }
    }
}
