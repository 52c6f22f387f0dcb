//! Port definitions for application layer
//!
//! Ports are interfaces that define how the application interacts with
//! external systems. Adapters in the infrastructure layer implement these ports.

mod mailbox;
mod notifier;
mod test_store;

pub use mailbox::{
    AccountDirectory, MailboxConnection, MailboxCredentials, MailboxError, MailboxPort,
    MessageMeta, MonitoredAccount,
};
pub use notifier::{AccountOutcome, CompletionSummary, NotifierError, NotifierPort};
#[cfg(test)]
pub use notifier::MockNotifierPort;
pub use test_store::TestStorePort;
#[cfg(test)]
pub use test_store::MockTestStorePort;
