//! Mailbox access port
//!
//! Defines how the check engine reaches one remote mail account: open a
//! bounded connection, open folders in priority order, search for the probe
//! token, and fetch a match's header metadata. Implemented by the IMAP
//! adapter in `integration_mail`.

use std::{collections::HashMap, fmt, time::Duration};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use domain::value_objects::{EmailAddress, EmailProvider};
use thiserror::Error;

/// Mailbox access errors
///
/// Everything here is account-scoped: the check engine contains these and
/// records them as that account's result, never aborting the test pass.
#[derive(Debug, Error)]
pub enum MailboxError {
    /// Transport-level connection failure
    #[error("Connection failed: {0}")]
    Connection(String),

    /// The server rejected the credentials
    #[error("Authentication failed for {0}")]
    Authentication(String),

    /// The bounded connection wait elapsed
    #[error("Connection timeout after {0}s")]
    Timeout(u64),

    /// The requested folder does not exist on the server
    #[error("Folder not found: {0}")]
    FolderNotFound(String),

    /// A text search failed inside an open folder
    #[error("Search failed: {0}")]
    Search(String),

    /// The matched message's metadata could not be read (non-fatal)
    #[error("Metadata fetch failed: {0}")]
    Fetch(String),
}

/// Credentials for one monitored mailbox
#[derive(Clone)]
pub struct MailboxCredentials {
    /// Login user, usually the mailbox address itself
    pub user: String,
    /// App password or equivalent
    pub password: String,
}

impl MailboxCredentials {
    /// Create a credential pair
    pub fn new(user: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            password: password.into(),
        }
    }

    /// Whether both fields are populated
    #[must_use]
    pub fn is_complete(&self) -> bool {
        !self.user.is_empty() && !self.password.is_empty()
    }
}

impl fmt::Debug for MailboxCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MailboxCredentials")
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// One monitored mailbox: provider, address, and how to log in
#[derive(Debug, Clone)]
pub struct MonitoredAccount {
    /// Which provider hosts this mailbox
    pub provider: EmailProvider,
    /// The mailbox address
    pub address: EmailAddress,
    /// Login credentials
    pub credentials: MailboxCredentials,
}

/// Immutable directory of monitored accounts and per-provider folder lists
///
/// Constructed once at process start from configuration and shared by
/// handle; the folder order per provider is the search priority order.
#[derive(Debug, Clone, Default)]
pub struct AccountDirectory {
    accounts: Vec<MonitoredAccount>,
    folders: HashMap<EmailProvider, Vec<String>>,
}

impl AccountDirectory {
    /// Build a directory from accounts and per-provider folder lists
    #[must_use]
    pub fn new(
        accounts: Vec<MonitoredAccount>,
        folders: HashMap<EmailProvider, Vec<String>>,
    ) -> Self {
        Self { accounts, folders }
    }

    /// All monitored accounts, in check order
    #[must_use]
    pub fn accounts(&self) -> &[MonitoredAccount] {
        &self.accounts
    }

    /// The priority-ordered folder list for one provider
    #[must_use]
    pub fn folders_for(&self, provider: EmailProvider) -> &[String] {
        self.folders.get(&provider).map_or(&[], Vec::as_slice)
    }

    /// Look up the account for a mailbox address
    #[must_use]
    pub fn find(&self, address: &EmailAddress) -> Option<&MonitoredAccount> {
        self.accounts.iter().find(|a| &a.address == address)
    }

    /// Whether no accounts are configured
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }
}

/// Header metadata of a matched message
#[derive(Debug, Clone, Default)]
pub struct MessageMeta {
    /// Subject line, when readable
    pub subject: Option<String>,
    /// When the message was received
    pub received_at: Option<DateTime<Utc>>,
}

/// An open connection to one mailbox
///
/// Folder state is held server-side: `search_text` and `fetch_metadata`
/// operate on the most recently opened folder.
#[async_trait]
pub trait MailboxConnection: Send {
    /// Open a folder by its raw provider-side name
    async fn open_folder(&mut self, name: &str) -> Result<(), MailboxError>;

    /// Search the open folder's full text for a token, returning message ids
    async fn search_text(&mut self, token: &str) -> Result<Vec<u32>, MailboxError>;

    /// Fetch subject/date metadata for one message in the open folder
    async fn fetch_metadata(&mut self, id: u32) -> Result<MessageMeta, MailboxError>;

    /// Close the connection; safe to call once regardless of prior errors
    async fn close(&mut self) -> Result<(), MailboxError>;
}

/// Factory for mailbox connections
#[async_trait]
pub trait MailboxPort: Send + Sync {
    /// Open a connection to one account, bounded by `timeout`
    ///
    /// The adapter must not block past the deadline; the engine additionally
    /// enforces the same bound around the call.
    async fn connect(
        &self,
        account: &MonitoredAccount,
        timeout: Duration,
    ) -> Result<Box<dyn MailboxConnection>, MailboxError>;
}
