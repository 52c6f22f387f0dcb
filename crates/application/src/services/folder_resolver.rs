//! Folder name resolution
//!
//! Maps a provider's raw folder name to a normalized [`FolderCategory`].
//! Unknown names resolve to `Other` rather than erroring, so an unfamiliar
//! folder layout degrades gracefully instead of aborting the check.

use domain::value_objects::{EmailProvider, FolderCategory};

/// Resolve a raw provider-side folder name to its normalized category
#[must_use]
pub fn resolve_folder(provider: EmailProvider, raw: &str) -> FolderCategory {
    // INBOX is case-insensitive on the wire (RFC 3501); everything else is
    // matched the way the provider spells it.
    if raw.eq_ignore_ascii_case("INBOX") {
        return FolderCategory::Inbox;
    }

    match (provider, raw) {
        (EmailProvider::Gmail, "[Gmail]/Spam") => FolderCategory::Spam,
        (EmailProvider::Gmail, "[Gmail]/All Mail") => FolderCategory::AllMail,
        (EmailProvider::Gmail, "[Gmail]/Promotions" | "CATEGORY_PROMOTIONS") => {
            FolderCategory::Promotions
        },
        (EmailProvider::Outlook, "Junk Email" | "Junk") => FolderCategory::Spam,
        (EmailProvider::Outlook, "Clutter") => FolderCategory::Promotions,
        (EmailProvider::Yahoo, "Bulk" | "Bulk Mail") => FolderCategory::Spam,
        _ => FolderCategory::Other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inbox_is_case_insensitive_for_all_providers() {
        for provider in EmailProvider::all() {
            assert_eq!(resolve_folder(provider, "INBOX"), FolderCategory::Inbox);
            assert_eq!(resolve_folder(provider, "Inbox"), FolderCategory::Inbox);
            assert_eq!(resolve_folder(provider, "inbox"), FolderCategory::Inbox);
        }
    }

    #[test]
    fn gmail_folders_resolve() {
        assert_eq!(
            resolve_folder(EmailProvider::Gmail, "[Gmail]/Spam"),
            FolderCategory::Spam
        );
        assert_eq!(
            resolve_folder(EmailProvider::Gmail, "[Gmail]/All Mail"),
            FolderCategory::AllMail
        );
    }

    #[test]
    fn outlook_junk_variants_resolve_to_spam() {
        assert_eq!(
            resolve_folder(EmailProvider::Outlook, "Junk Email"),
            FolderCategory::Spam
        );
        assert_eq!(
            resolve_folder(EmailProvider::Outlook, "Junk"),
            FolderCategory::Spam
        );
        assert_eq!(
            resolve_folder(EmailProvider::Outlook, "Clutter"),
            FolderCategory::Promotions
        );
    }

    #[test]
    fn yahoo_bulk_resolves_to_spam() {
        assert_eq!(
            resolve_folder(EmailProvider::Yahoo, "Bulk"),
            FolderCategory::Spam
        );
        assert_eq!(
            resolve_folder(EmailProvider::Yahoo, "Bulk Mail"),
            FolderCategory::Spam
        );
    }

    #[test]
    fn unknown_folders_degrade_to_other() {
        assert_eq!(
            resolve_folder(EmailProvider::Gmail, "Receipts/2026"),
            FolderCategory::Other
        );
        // A Gmail-style name on the wrong provider is still just Other
        assert_eq!(
            resolve_folder(EmailProvider::Outlook, "[Gmail]/Spam"),
            FolderCategory::Other
        );
    }
}
