//! Test record storage port
//!
//! Defines the interface for persisting and querying deliverability tests.
//! Adapters in the infrastructure layer implement this port using SQLite.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use domain::entities::DeliveryTest;
use domain::value_objects::{EmailAddress, TestCode, TestId};
#[cfg(test)]
use mockall::automock;

use crate::error::ApplicationError;

/// Port for test record persistence operations
#[cfg_attr(test, automock)]
#[async_trait]
pub trait TestStorePort: Send + Sync {
    /// Find a test by its identifier
    async fn find_by_test_id(&self, id: &TestId) -> Result<Option<DeliveryTest>, ApplicationError>;

    /// Find a test by its probe code
    async fn find_by_code(&self, code: &TestCode)
    -> Result<Option<DeliveryTest>, ApplicationError>;

    /// Persist the full record (insert or replace)
    async fn save(&self, test: &DeliveryTest) -> Result<(), ApplicationError>;

    /// Find processing tests whose pass started before `older_than`
    async fn find_stale(
        &self,
        older_than: DateTime<Utc>,
    ) -> Result<Vec<DeliveryTest>, ApplicationError>;

    /// Find up to `limit` waiting tests created after `created_after`,
    /// oldest first
    async fn find_waiting(
        &self,
        created_after: DateTime<Utc>,
        limit: u32,
    ) -> Result<Vec<DeliveryTest>, ApplicationError>;

    /// Page through one requester's tests, newest first
    async fn list_for_user(
        &self,
        user_email: &EmailAddress,
        offset: u32,
        limit: u32,
    ) -> Result<Vec<DeliveryTest>, ApplicationError>;

    /// Count one requester's tests
    async fn count_for_user(&self, user_email: &EmailAddress) -> Result<u64, ApplicationError>;

    /// Delete records created before `older_than`, returning how many
    async fn purge_expired(&self, older_than: DateTime<Utc>) -> Result<u64, ApplicationError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn _assert_object_safe(_: &dyn TestStorePort) {}

    #[test]
    fn trait_is_send_sync() {
        fn assert_send_sync<T: Send + Sync + ?Sized>() {}
        assert_send_sync::<dyn TestStorePort>();
    }
}
