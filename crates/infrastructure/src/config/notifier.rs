//! Completion notifier (SMTP) configuration.

use integration_mail::{MailTlsConfig, SmtpConfig};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

/// SMTP settings for the completion summary email
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotifierConfig {
    /// Whether completion emails are sent at all
    #[serde(default)]
    pub enabled: bool,

    /// SMTP server host
    #[serde(default = "default_smtp_host")]
    pub host: String,

    /// SMTP port (465 implicit TLS, 587 STARTTLS)
    #[serde(default = "default_smtp_port")]
    pub port: u16,

    /// Login user and From address
    #[serde(default)]
    pub user: String,

    /// Password (sensitive - uses `SecretString`)
    #[serde(default = "default_password", skip_serializing)]
    pub password: SecretString,

    /// Display name on the From header
    #[serde(default = "default_from_name")]
    pub from_name: String,
}

fn default_smtp_host() -> String {
    "smtp.gmail.com".to_string()
}

const fn default_smtp_port() -> u16 {
    587
}

fn default_from_name() -> String {
    "InboxSight Reports".to_string()
}

fn default_password() -> SecretString {
    SecretString::from(String::new())
}

impl Default for NotifierConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            host: default_smtp_host(),
            port: default_smtp_port(),
            user: String::new(),
            password: default_password(),
            from_name: default_from_name(),
        }
    }
}

impl NotifierConfig {
    /// Whether the transport is usable
    #[must_use]
    pub fn is_configured(&self) -> bool {
        self.enabled && !self.user.is_empty() && !self.password.expose_secret().is_empty()
    }

    /// Convert into the SMTP client configuration
    #[must_use]
    pub fn smtp_config(&self) -> SmtpConfig {
        SmtpConfig {
            host: self.host.clone(),
            port: self.port,
            user: self.user.clone(),
            password: self.password.expose_secret().to_string(),
            from_name: Some(self.from_name.clone()),
            tls: MailTlsConfig::default(),
        }
    }
}
