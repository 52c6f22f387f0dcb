//! Monitored account configuration.
//!
//! One section per provider: the priority-ordered folder list and the
//! credential sets for its monitored mailboxes. Passwords stay wrapped in
//! `SecretString` until the directory is built.

use application::ports::{AccountDirectory, MailboxCredentials, MonitoredAccount};
use domain::value_objects::{EmailAddress, EmailProvider};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{info, warn};

/// Credentials for one monitored mailbox
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountCredentialsConfig {
    /// Mailbox address, also the IMAP login user
    pub user: String,
    /// App password (sensitive - uses `SecretString`)
    #[serde(skip_serializing)]
    pub password: SecretString,
}

/// One provider's monitored mailboxes and folder priority list
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProviderAccountsConfig {
    /// Folders to search, highest priority first
    #[serde(default)]
    pub folders: Vec<String>,
    /// Credential sets for this provider's monitored mailboxes
    #[serde(default)]
    pub accounts: Vec<AccountCredentialsConfig>,
}

/// Monitored accounts across all providers
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountsConfig {
    /// Gmail mailboxes
    #[serde(default = "default_gmail")]
    pub gmail: ProviderAccountsConfig,
    /// Outlook mailboxes
    #[serde(default = "default_outlook")]
    pub outlook: ProviderAccountsConfig,
    /// Yahoo mailboxes
    #[serde(default = "default_yahoo")]
    pub yahoo: ProviderAccountsConfig,
}

fn default_gmail() -> ProviderAccountsConfig {
    ProviderAccountsConfig {
        folders: vec![
            "INBOX".to_string(),
            "[Gmail]/Spam".to_string(),
            "[Gmail]/All Mail".to_string(),
        ],
        accounts: Vec::new(),
    }
}

fn default_outlook() -> ProviderAccountsConfig {
    ProviderAccountsConfig {
        folders: vec!["INBOX".to_string(), "Junk Email".to_string()],
        accounts: Vec::new(),
    }
}

fn default_yahoo() -> ProviderAccountsConfig {
    ProviderAccountsConfig {
        folders: vec!["INBOX".to_string(), "Bulk".to_string()],
        accounts: Vec::new(),
    }
}

impl Default for AccountsConfig {
    fn default() -> Self {
        Self {
            gmail: default_gmail(),
            outlook: default_outlook(),
            yahoo: default_yahoo(),
        }
    }
}

impl AccountsConfig {
    fn providers(&self) -> [(EmailProvider, &ProviderAccountsConfig); 3] {
        [
            (EmailProvider::Gmail, &self.gmail),
            (EmailProvider::Outlook, &self.outlook),
            (EmailProvider::Yahoo, &self.yahoo),
        ]
    }

    /// Build the immutable account directory the engine runs against
    ///
    /// Credential sets with an unparseable address or an empty password are
    /// skipped with a warning rather than failing startup; a misconfigured
    /// mailbox should not take the service down.
    #[must_use]
    pub fn to_directory(&self) -> AccountDirectory {
        let mut accounts = Vec::new();
        let mut folders = HashMap::new();

        for (provider, section) in self.providers() {
            folders.insert(provider, section.folders.clone());

            for credentials in &section.accounts {
                let address = match EmailAddress::new(&credentials.user) {
                    Ok(address) => address,
                    Err(e) => {
                        warn!(provider = %provider, error = %e, "Skipping account with invalid address");
                        continue;
                    },
                };

                let password = credentials.password.expose_secret();
                if password.is_empty() {
                    warn!(provider = %provider, user = %credentials.user, "Skipping account with empty password");
                    continue;
                }

                accounts.push(MonitoredAccount {
                    provider,
                    address,
                    credentials: MailboxCredentials::new(&credentials.user, password),
                });
            }
        }

        AccountDirectory::new(accounts, folders)
    }

    /// Log a startup summary of the configured mailboxes
    pub fn log_summary(&self) {
        for (provider, section) in self.providers() {
            info!(
                provider = %provider,
                accounts = section.accounts.len(),
                folders = section.folders.len(),
                "Monitored accounts configured"
            );
            for credentials in &section.accounts {
                if credentials.password.expose_secret().len() < 10 {
                    warn!(
                        provider = %provider,
                        user = %credentials.user,
                        "Password looks too short - app passwords are usually 16 chars"
                    );
                }
            }
        }
    }
}
