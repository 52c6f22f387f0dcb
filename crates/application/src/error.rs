//! Application-level errors

use domain::DomainError;
use thiserror::Error;

/// Errors that can occur in the application layer
#[derive(Debug, Error)]
pub enum ApplicationError {
    /// Domain-level error
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// Missing or invalid account/provider configuration
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The record store is unavailable or rejected the operation
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// Requested entity does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Unexpected failure during an engine pass
    #[error("Engine error: {0}")]
    Engine(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApplicationError {
    /// Check if this error is retryable on a later pass
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Persistence(_) | Self::Engine(_))
    }
}
