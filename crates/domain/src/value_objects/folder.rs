//! Normalized mailbox folder categories
//!
//! Providers use wildly different raw folder names (`[Gmail]/Spam`,
//! `Junk Email`, `Bulk Mail`). Results are recorded against this
//! normalized category set so reports compare placements across providers.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Normalized category a probe message was found in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FolderCategory {
    /// Primary inbox
    Inbox,
    /// Spam / junk folder
    Spam,
    /// Promotions / clutter tab
    Promotions,
    /// Provider-wide archive (e.g. Gmail's All Mail)
    AllMail,
    /// A folder outside the known mapping
    Other,
    /// The probe was not found in any folder
    NotFound,
}

impl FolderCategory {
    /// Get a human-readable label
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Inbox => "Inbox",
            Self::Spam => "Spam",
            Self::Promotions => "Promotions",
            Self::AllMail => "All Mail",
            Self::Other => "Other",
            Self::NotFound => "Not Found",
        }
    }

    /// Whether this category represents an actual placement
    #[must_use]
    pub const fn is_placement(&self) -> bool {
        !matches!(self, Self::NotFound)
    }
}

impl fmt::Display for FolderCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}
