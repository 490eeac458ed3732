//! `osrs-hiscores`: typed client for the Old School RuneScape hiscores
//! "lite" JSON endpoint.
//!
//! # Architecture
//!
//! ```text
//! normalize_account_key("Zezima The Great")  →  "zezima_the_great"
//!     │
//!     ▼
//! HiscoresClient::lookup   ← GET {base}/index_lite.json?player=<key>
//!     │
//!     ▼
//! Snapshot                 ← skills + activities, each with an official rank
//! ```
//!
//! Every account lookup in the workspace goes through
//! [`normalize_account_key`], so enrollment, lookup and removal agree
//! byte-for-byte on the key.

pub mod client;
pub mod error;
pub mod types;

pub use client::HiscoresClient;
pub use error::HiscoresError;
pub use types::{AccountType, ActivityEntry, SkillEntry, Snapshot, UNRANKED};

/// Convenience `Result` alias for this crate.
pub type Result<T> = std::result::Result<T, HiscoresError>;

/// Normalize a display name into the key the hiscores API (and our store)
/// uses: trimmed, lower-cased, spaces replaced by underscores.
pub fn normalize_account_key(name: &str) -> String {
    name.trim().to_lowercase().replace(' ', "_")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_case_and_spaces() {
        assert_eq!(normalize_account_key("Zezima The Great"), "zezima_the_great");
    }

    #[test]
    fn trims_surrounding_whitespace() {
        assert_eq!(normalize_account_key("  Lynx Titan "), "lynx_titan");
    }

    #[test]
    fn is_idempotent() {
        let once = normalize_account_key("Iron Man BTW");
        assert_eq!(normalize_account_key(&once), once);
    }

    #[test]
    fn different_casing_collapses_to_same_key() {
        assert_eq!(
            normalize_account_key("B0aty"),
            normalize_account_key("b0ATY")
        );
    }
}
