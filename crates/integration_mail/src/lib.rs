//! Hosted mail provider integration
//!
//! Connects to the monitored providers' IMAP servers to search for probe
//! messages, and to an SMTP relay to send completion summaries.
//!
//! - [`ImapMailbox`] implements the application's mailbox port
//! - [`SmtpClient`] sends RFC 5322 messages for the notifier adapter

mod imap_client;
mod smtp_client;

use std::collections::HashMap;

use domain::value_objects::EmailProvider;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use imap_client::ImapMailbox;
pub use smtp_client::{MailMessage, SmtpClient, SmtpConfig};

/// Mail transport errors
#[derive(Debug, Error)]
pub enum MailError {
    /// Transport-level connection failure
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// The server rejected the credentials
    #[error("Authentication failed")]
    AuthenticationFailed,

    /// SMTP-specific protocol error
    #[error("SMTP error: {0}")]
    SmtpError(String),

    /// Invalid transport configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// TLS configuration for IMAP and SMTP connections
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MailTlsConfig {
    /// Verify server certificates (disable only against local test servers)
    pub verify_certificates: bool,
    /// Minimum TLS version ("1.2" or "1.3")
    pub min_tls_version: String,
}

impl Default for MailTlsConfig {
    fn default() -> Self {
        Self {
            verify_certificates: true,
            min_tls_version: "1.2".to_string(),
        }
    }
}

impl MailTlsConfig {
    /// Insecure variant for local test servers
    #[must_use]
    pub fn insecure() -> Self {
        Self {
            verify_certificates: false,
            ..Self::default()
        }
    }
}

/// Builds a TLS connector from the shared TLS configuration
pub(crate) fn build_tls_connector(
    tls_config: &MailTlsConfig,
) -> Result<native_tls::TlsConnector, MailError> {
    let mut builder = native_tls::TlsConnector::builder();

    if !tls_config.verify_certificates {
        tracing::warn!(
            "TLS certificate verification disabled - only recommended against local test servers"
        );
        builder.danger_accept_invalid_certs(true);
    }

    let min_protocol = match tls_config.min_tls_version.as_str() {
        "1.0" => native_tls::Protocol::Tlsv10,
        "1.1" => native_tls::Protocol::Tlsv11,
        _ => native_tls::Protocol::Tlsv12,
    };
    builder.min_protocol_version(Some(min_protocol));

    builder
        .build()
        .map_err(|e| MailError::ConnectionFailed(format!("TLS builder failed: {e}")))
}

/// IMAP endpoint of one hosted provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImapEndpoint {
    /// IMAP server host
    pub host: String,
    /// IMAPS port (usually 993)
    pub port: u16,
}

impl ImapEndpoint {
    /// Create an endpoint
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }
}

/// Per-provider IMAP endpoints
#[derive(Debug, Clone, Default)]
pub struct ProviderEndpoints {
    endpoints: HashMap<EmailProvider, ImapEndpoint>,
}

impl ProviderEndpoints {
    /// The well-known hosted endpoints for all supported providers
    #[must_use]
    pub fn hosted() -> Self {
        let mut endpoints = HashMap::new();
        endpoints.insert(
            EmailProvider::Gmail,
            ImapEndpoint::new("imap.gmail.com", 993),
        );
        endpoints.insert(
            EmailProvider::Outlook,
            ImapEndpoint::new("outlook.office365.com", 993),
        );
        endpoints.insert(
            EmailProvider::Yahoo,
            ImapEndpoint::new("imap.mail.yahoo.com", 993),
        );
        Self { endpoints }
    }

    /// Override or add one provider's endpoint
    #[must_use]
    pub fn with_endpoint(mut self, provider: EmailProvider, endpoint: ImapEndpoint) -> Self {
        self.endpoints.insert(provider, endpoint);
        self
    }

    /// Look up a provider's endpoint
    #[must_use]
    pub fn get(&self, provider: EmailProvider) -> Option<&ImapEndpoint> {
        self.endpoints.get(&provider)
    }
}
