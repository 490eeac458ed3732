//! Persistent and per-run data types.
//!
//! `TrackedGroup`, `Member` and `PostedMessage` are stored; `Standing` only
//! lives for the duration of a single pipeline run.

use chrono::{DateTime, Utc};
use osrs_hiscores::{normalize_account_key, AccountType};
use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// TrackedGroup
// ---------------------------------------------------------------------------

/// A chat community enrolled for scheduled leaderboards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackedGroup {
    pub id: String,
    pub name: String,
    /// Destination channel identifier on the chat platform.
    pub channel_id: String,
    /// Cron expression, evaluated in the scheduler's reference time zone.
    pub schedule: String,
    /// Publish order. Index in this list is the activity's position.
    pub activities: Vec<String>,
    /// Replace the previous message for an activity instead of leaving it
    /// in the channel history.
    pub edit_in_place: bool,
    pub enabled: bool,
    pub updated_at: DateTime<Utc>,
}

impl TrackedGroup {
    /// Position of `activity` in the publish order, matched the same way the
    /// hiscores API matches names (case-insensitive, trimmed).
    pub fn position_of(&self, activity: &str) -> Option<usize> {
        let wanted = activity.trim();
        self.activities
            .iter()
            .position(|a| a.trim().eq_ignore_ascii_case(wanted))
    }

    pub fn tracks(&self, activity: &str) -> bool {
        self.position_of(activity).is_some()
    }
}

// ---------------------------------------------------------------------------
// Member
// ---------------------------------------------------------------------------

/// One tracked game account within a group.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Member {
    pub group_id: String,
    /// Normalized lookup key; see [`osrs_hiscores::normalize_account_key`].
    pub account_key: String,
    /// Name as the administrator typed it.
    pub display_name: String,
    #[serde(default)]
    pub account_type: AccountType,
    #[serde(default)]
    pub chat_user_id: Option<String>,
    #[serde(default)]
    pub chat_username: Option<String>,
}

impl Member {
    pub fn new(
        group_id: impl Into<String>,
        display_name: impl Into<String>,
        account_type: AccountType,
    ) -> Self {
        let display_name = display_name.into().trim().to_string();
        Self {
            group_id: group_id.into(),
            account_key: normalize_account_key(&display_name),
            display_name,
            account_type,
            chat_user_id: None,
            chat_username: None,
        }
    }

    pub fn with_chat_user(mut self, id: Option<String>, username: Option<String>) -> Self {
        self.chat_user_id = id.filter(|s| !s.trim().is_empty());
        self.chat_username = username.filter(|s| !s.trim().is_empty());
        self
    }
}

// ---------------------------------------------------------------------------
// PostedMessage
// ---------------------------------------------------------------------------

/// Ledger row: the live chat message for one (group, activity).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostedMessage {
    pub group_id: String,
    pub activity: String,
    pub message_id: String,
    pub position: u32,
    pub posted_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Standing
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityKind {
    Skill,
    Activity,
}

impl fmt::Display for ActivityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActivityKind::Skill => f.write_str("skill"),
            ActivityKind::Activity => f.write_str("activity"),
        }
    }
}

/// What a standing row measures, depending on the activity kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Measure {
    Skill { level: i64, experience: i64 },
    Score { score: i64 },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandingRow {
    pub member: Member,
    pub official_rank: i64,
    /// 1-based rank within the group's roster.
    pub local_rank: u32,
    pub measure: Measure,
}

impl StandingRow {
    pub fn is_ranked(&self) -> bool {
        self.official_rank > 0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Standing {
    pub activity: String,
    pub kind: ActivityKind,
    pub rows: Vec<StandingRow>,
}

impl Standing {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
