//! Domain entities

mod history;
mod provider_result;

pub use delivery_test::{DeliveryTest, TestStatus};
pub use history::{HistoryAction, HistoryEntry};
pub use provider_result::{DeliveryStatus, ProviderResult};
