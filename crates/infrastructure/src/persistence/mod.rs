//! Persistence adapters

mod connection;
mod migrations;
mod test_store;

pub use connection::{ConnectionPool, DatabaseError, PooledConn, create_pool};
pub use migrations::run_migrations;
pub use test_store::SqliteTestStore;
