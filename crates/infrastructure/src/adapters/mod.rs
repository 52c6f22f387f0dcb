//! Port adapters

mod smtp_notifier;

pub use smtp_notifier::SmtpNotifier;
