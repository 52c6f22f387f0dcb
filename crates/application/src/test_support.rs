//! Shared fakes for service tests
//!
//! A hand-rolled in-memory store (with save-failure injection for engine
//! error paths) and a scripted mailbox adapter keyed by account address.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use domain::entities::{DeliveryTest, TestStatus};
use domain::value_objects::{EmailAddress, EmailProvider, TestCode, TestId};
use parking_lot::Mutex;

use crate::error::ApplicationError;
use crate::ports::{
    AccountDirectory, MailboxConnection, MailboxCredentials, MailboxError, MailboxPort,
    MessageMeta, MonitoredAccount, TestStorePort,
};

/// Build a directory with standard folder lists for the given accounts
pub(crate) fn directory(accounts: &[(EmailProvider, &str)]) -> AccountDirectory {
    let accounts: Vec<_> = accounts
        .iter()
        .map(|(provider, address)| MonitoredAccount {
            provider: *provider,
            address: EmailAddress::new(*address).unwrap(),
            credentials: MailboxCredentials::new(*address, "app-password"),
        })
        .collect();

    let folders = HashMap::from([
        (
            EmailProvider::Gmail,
            vec![
                "INBOX".to_string(),
                "[Gmail]/Spam".to_string(),
                "[Gmail]/All Mail".to_string(),
            ],
        ),
        (
            EmailProvider::Outlook,
            vec!["INBOX".to_string(), "Junk Email".to_string()],
        ),
        (
            EmailProvider::Yahoo,
            vec!["INBOX".to_string(), "Bulk".to_string()],
        ),
    ]);

    AccountDirectory::new(accounts, folders)
}

/// In-memory test store with optional save-failure injection
#[derive(Default)]
pub(crate) struct InMemoryTestStore {
    tests: Mutex<HashMap<TestId, DeliveryTest>>,
    saves_seen: Mutex<u32>,
    fail_saves: Mutex<Option<(u32, u32)>>,
}

impl InMemoryTestStore {
    /// Insert a record directly, bypassing save accounting
    pub(crate) fn insert(&self, test: DeliveryTest) {
        self.tests.lock().insert(test.id, test);
    }

    /// Read a record directly
    pub(crate) fn get(&self, id: &TestId) -> Option<DeliveryTest> {
        self.tests.lock().get(id).cloned()
    }

    /// Fail every `save` call whose 1-based sequence number falls in
    /// `[from, to]`
    pub(crate) fn fail_saves_between(&self, from: u32, to: u32) {
        *self.fail_saves.lock() = Some((from, to));
    }
}

#[async_trait]
impl TestStorePort for InMemoryTestStore {
    async fn find_by_test_id(
        &self,
        id: &TestId,
    ) -> Result<Option<DeliveryTest>, ApplicationError> {
        Ok(self.tests.lock().get(id).cloned())
    }

    async fn find_by_code(
        &self,
        code: &TestCode,
    ) -> Result<Option<DeliveryTest>, ApplicationError> {
        Ok(self
            .tests
            .lock()
            .values()
            .find(|t| &t.code == code)
            .cloned())
    }

    async fn save(&self, test: &DeliveryTest) -> Result<(), ApplicationError> {
        let seen = {
            let mut counter = self.saves_seen.lock();
            *counter += 1;
            *counter
        };
        if let Some((from, to)) = *self.fail_saves.lock()
            && (from..=to).contains(&seen)
        {
            return Err(ApplicationError::Persistence("store unavailable".into()));
        }
        self.tests.lock().insert(test.id, test.clone());
        Ok(())
    }

    async fn find_stale(
        &self,
        older_than: DateTime<Utc>,
    ) -> Result<Vec<DeliveryTest>, ApplicationError> {
        Ok(self
            .tests
            .lock()
            .values()
            .filter(|t| {
                t.status == TestStatus::Processing
                    && t.started_at.is_some_and(|s| s < older_than)
            })
            .cloned()
            .collect())
    }

    async fn find_waiting(
        &self,
        created_after: DateTime<Utc>,
        limit: u32,
    ) -> Result<Vec<DeliveryTest>, ApplicationError> {
        let mut waiting: Vec<_> = self
            .tests
            .lock()
            .values()
            .filter(|t| t.status == TestStatus::Waiting && t.created_at >= created_after)
            .cloned()
            .collect();
        waiting.sort_by_key(|t| t.created_at);
        waiting.truncate(limit as usize);
        Ok(waiting)
    }

    async fn list_for_user(
        &self,
        user_email: &EmailAddress,
        offset: u32,
        limit: u32,
    ) -> Result<Vec<DeliveryTest>, ApplicationError> {
        let mut tests: Vec<_> = self
            .tests
            .lock()
            .values()
            .filter(|t| &t.user_email == user_email)
            .cloned()
            .collect();
        tests.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(tests
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .collect())
    }

    async fn count_for_user(&self, user_email: &EmailAddress) -> Result<u64, ApplicationError> {
        Ok(self
            .tests
            .lock()
            .values()
            .filter(|t| &t.user_email == user_email)
            .count() as u64)
    }

    async fn purge_expired(&self, older_than: DateTime<Utc>) -> Result<u64, ApplicationError> {
        let mut tests = self.tests.lock();
        let before = tests.len();
        tests.retain(|_, t| t.created_at >= older_than);
        Ok((before - tests.len()) as u64)
    }
}

/// What a scripted account does when probed
#[derive(Clone)]
pub(crate) enum ScriptedBehavior {
    /// The probe matches in this raw folder name
    MatchIn(String),
    /// No folder contains the probe
    NoMatch,
    /// The connection attempt fails outright
    ConnectError(String),
    /// The connection attempt never returns (forces the deadline)
    Hang,
}

impl ScriptedBehavior {
    pub(crate) fn match_in(folder: &str) -> Self {
        Self::MatchIn(folder.to_string())
    }
}

/// Scripted mailbox adapter keyed by account address
#[derive(Default)]
pub(crate) struct ScriptedMailbox {
    behaviors: HashMap<String, ScriptedBehavior>,
}

impl ScriptedMailbox {
    pub(crate) fn with(mut self, address: &str, behavior: ScriptedBehavior) -> Self {
        self.behaviors.insert(address.to_string(), behavior);
        self
    }
}

struct ScriptedConnection {
    match_folder: Option<String>,
    current: Option<String>,
}

#[async_trait]
impl MailboxConnection for ScriptedConnection {
    async fn open_folder(&mut self, name: &str) -> Result<(), MailboxError> {
        self.current = Some(name.to_string());
        Ok(())
    }

    async fn search_text(&mut self, _token: &str) -> Result<Vec<u32>, MailboxError> {
        let matched = self
            .match_folder
            .as_deref()
            .is_some_and(|f| self.current.as_deref() == Some(f));
        Ok(if matched { vec![1] } else { vec![] })
    }

    async fn fetch_metadata(&mut self, _id: u32) -> Result<MessageMeta, MailboxError> {
        Ok(MessageMeta {
            subject: Some("Deliverability probe".to_string()),
            received_at: Some(Utc::now()),
        })
    }

    async fn close(&mut self) -> Result<(), MailboxError> {
        Ok(())
    }
}

#[async_trait]
impl MailboxPort for ScriptedMailbox {
    async fn connect(
        &self,
        account: &MonitoredAccount,
        _timeout: Duration,
    ) -> Result<Box<dyn MailboxConnection>, MailboxError> {
        let behavior = self
            .behaviors
            .get(account.address.as_str())
            .cloned()
            .unwrap_or(ScriptedBehavior::NoMatch);

        match behavior {
            ScriptedBehavior::MatchIn(folder) => Ok(Box::new(ScriptedConnection {
                match_folder: Some(folder),
                current: None,
            })),
            ScriptedBehavior::NoMatch => Ok(Box::new(ScriptedConnection {
                match_folder: None,
                current: None,
            })),
            ScriptedBehavior::ConnectError(message) => Err(MailboxError::Connection(message)),
            ScriptedBehavior::Hang => {
                tokio::time::sleep(Duration::from_secs(24 * 3600)).await;
                Err(MailboxError::Connection("unreachable".into()))
            },
        }
    }
}
