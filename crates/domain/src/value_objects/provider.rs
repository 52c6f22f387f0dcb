//! Monitored mail provider identity

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::errors::DomainError;

/// A mail provider whose mailbox is monitored for the probe message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmailProvider {
    /// Google Mail
    Gmail,
    /// Microsoft Outlook / Office 365
    Outlook,
    /// Yahoo Mail
    Yahoo,
}

impl EmailProvider {
    /// Get the wire name used in configuration and API payloads
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Gmail => "gmail",
            Self::Outlook => "outlook",
            Self::Yahoo => "yahoo",
        }
    }

    /// Get a human-readable display name
    #[must_use]
    pub const fn display_name(&self) -> &'static str {
        match self {
            Self::Gmail => "Gmail",
            Self::Outlook => "Outlook",
            Self::Yahoo => "Yahoo",
        }
    }

    /// All known providers, in the order accounts are checked
    #[must_use]
    pub const fn all() -> [Self; 3] {
        [Self::Gmail, Self::Outlook, Self::Yahoo]
    }
}

impl fmt::Display for EmailProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for EmailProvider {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "gmail" => Ok(Self::Gmail),
            "outlook" => Ok(Self::Outlook),
            "yahoo" => Ok(Self::Yahoo),
            other => Err(DomainError::UnknownProvider(other.to_string())),
        }
    }
}
