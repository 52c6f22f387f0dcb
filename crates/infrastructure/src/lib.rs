//! Infrastructure layer for InboxSight
//!
//! Adapters that implement the application's ports: SQLite persistence,
//! configuration loading, the cron scheduler with its task factories, the
//! template engine, and the SMTP completion notifier.

pub mod adapters;
pub mod config;
pub mod persistence;
pub mod scheduled_tasks;
pub mod scheduler;
pub mod templates;

pub use adapters::SmtpNotifier;
pub use config::AppConfig;
pub use persistence::{ConnectionPool, DatabaseError, SqliteTestStore, create_pool};
pub use scheduler::{Scheduler, SchedulerError, TaskStats};
pub use templates::{TemplateEngine, TemplateError};
