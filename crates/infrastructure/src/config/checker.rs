//! Check engine and recovery sweep configuration.

use std::{collections::HashMap, time::Duration};

use application::services::{CheckServiceConfig, SweepConfig};
use domain::scoring::ScoringWeights;
use domain::value_objects::EmailProvider;
use serde::{Deserialize, Serialize};

/// Check engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckerConfig {
    /// Bound on each account's connection attempt, in seconds
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,

    /// Pacing delay after each account, in milliseconds
    #[serde(default = "default_inter_account_delay_ms")]
    pub inter_account_delay_ms: u64,

    /// Longer pacing delay for Gmail, in milliseconds
    #[serde(default = "default_gmail_delay_ms")]
    pub gmail_delay_ms: u64,

    /// Scoring penalty per full spam-placement ratio
    #[serde(default = "default_spam_penalty")]
    pub spam_penalty: f64,

    /// Scoring penalty per full error ratio
    #[serde(default = "default_error_penalty")]
    pub error_penalty: f64,
}

const fn default_connect_timeout_secs() -> u64 {
    30
}

const fn default_inter_account_delay_ms() -> u64 {
    2000
}

const fn default_gmail_delay_ms() -> u64 {
    3000
}

const fn default_spam_penalty() -> f64 {
    30.0
}

const fn default_error_penalty() -> f64 {
    15.0
}

impl Default for CheckerConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: default_connect_timeout_secs(),
            inter_account_delay_ms: default_inter_account_delay_ms(),
            gmail_delay_ms: default_gmail_delay_ms(),
            spam_penalty: default_spam_penalty(),
            error_penalty: default_error_penalty(),
        }
    }
}

impl CheckerConfig {
    /// Convert into the engine's service configuration
    #[must_use]
    pub fn service_config(&self) -> CheckServiceConfig {
        CheckServiceConfig {
            connect_timeout: Duration::from_secs(self.connect_timeout_secs),
            inter_account_delay: Duration::from_millis(self.inter_account_delay_ms),
            account_delays: HashMap::from([(
                EmailProvider::Gmail,
                Duration::from_millis(self.gmail_delay_ms),
            )]),
            weights: ScoringWeights {
                spam_penalty: self.spam_penalty,
                error_penalty: self.error_penalty,
            },
        }
    }
}

/// Recovery sweep configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweepAppConfig {
    /// Minutes between sweep passes
    #[serde(default = "default_interval_minutes")]
    pub interval_minutes: u32,

    /// Minutes before a processing test counts as stuck
    #[serde(default = "default_staleness_minutes")]
    pub staleness_minutes: i64,

    /// Maximum waiting tests drained per pass
    #[serde(default = "default_batch_size")]
    pub batch_size: u32,

    /// Seconds between drained tests
    #[serde(default = "default_inter_test_delay_secs")]
    pub inter_test_delay_secs: u64,

    /// Retention window in hours; older records are purged
    #[serde(default = "default_retention_hours")]
    pub retention_hours: i64,
}

const fn default_interval_minutes() -> u32 {
    2
}

const fn default_staleness_minutes() -> i64 {
    10
}

const fn default_batch_size() -> u32 {
    2
}

const fn default_inter_test_delay_secs() -> u64 {
    45
}

const fn default_retention_hours() -> i64 {
    24
}

impl Default for SweepAppConfig {
    fn default() -> Self {
        Self {
            interval_minutes: default_interval_minutes(),
            staleness_minutes: default_staleness_minutes(),
            batch_size: default_batch_size(),
            inter_test_delay_secs: default_inter_test_delay_secs(),
            retention_hours: default_retention_hours(),
        }
    }
}

impl SweepAppConfig {
    /// Convert into the sweep's service configuration
    #[must_use]
    pub fn sweep_config(&self) -> SweepConfig {
        SweepConfig {
            staleness: chrono::Duration::minutes(self.staleness_minutes),
            batch_size: self.batch_size,
            inter_test_delay: Duration::from_secs(self.inter_test_delay_secs),
            retention_window: chrono::Duration::hours(self.retention_hours),
        }
    }

    /// Cron expression for the sweep schedule (seconds-resolution syntax)
    #[must_use]
    pub fn cron_expression(&self) -> String {
        format!("0 */{} * * * *", self.interval_minutes.max(1))
    }

    /// The retention window as a chrono duration
    #[must_use]
    pub fn retention_window(&self) -> chrono::Duration {
        chrono::Duration::hours(self.retention_hours)
    }
}
