//! Application configuration
//!
//! Split into focused sub-modules by concern:
//! - `server`: HTTP server settings
//! - `database`: SQLite database settings
//! - `checker`: check engine and recovery sweep tuning
//! - `accounts`: monitored mailboxes and folder priority lists
//! - `notifier`: SMTP settings for completion summaries

mod accounts;
mod checker;
mod database;
mod notifier;
mod server;

use serde::{Deserialize, Serialize};

pub use accounts::{AccountCredentialsConfig, AccountsConfig, ProviderAccountsConfig};
pub use checker::{CheckerConfig, SweepAppConfig};
pub use database::DatabaseConfig;
pub use notifier::NotifierConfig;
pub use server::ServerConfig;

/// Shared default for boolean `true` fields across config structs
pub(crate) const fn default_true() -> bool {
    true
}

/// Top-level application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// HTTP server settings
    #[serde(default)]
    pub server: ServerConfig,
    /// SQLite database settings
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Check engine tuning
    #[serde(default)]
    pub checker: CheckerConfig,
    /// Recovery sweep tuning
    #[serde(default)]
    pub sweep: SweepAppConfig,
    /// Monitored mailboxes per provider
    #[serde(default)]
    pub accounts: AccountsConfig,
    /// Completion notifier settings
    #[serde(default)]
    pub notifier: NotifierConfig,
}

impl AppConfig {
    /// Load configuration from defaults, `config.toml`, and environment
    ///
    /// Environment variables use the `INBOXSIGHT_` prefix with `_` as the
    /// level separator, e.g. `INBOXSIGHT_SERVER_PORT=8080`.
    pub fn load() -> Result<Self, config::ConfigError> {
        let builder = config::Config::builder()
            // Load from file if exists
            .add_source(config::File::with_name("config").required(false))
            // Override with environment variables (e.g., INBOXSIGHT_SERVER_PORT)
            .add_source(
                config::Environment::with_prefix("INBOXSIGHT")
                    .separator("_")
                    .try_parsing(true),
            );

        let config = builder.build()?;
        config.try_deserialize()
    }
}
