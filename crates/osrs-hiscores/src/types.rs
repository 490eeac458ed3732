use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Official rank reported by the hiscores for accounts that are not ranked
/// in a skill or activity.
pub const UNRANKED: i64 = -1;

// ─── Snapshot ─────────────────────────────────────────────────────────────

/// One account's hiscores as of a single lookup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub name: String,
    #[serde(default)]
    pub skills: Vec<SkillEntry>,
    #[serde(default)]
    pub activities: Vec<ActivityEntry>,
}

/// A skill row, e.g. Woodcutting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkillEntry {
    #[serde(default)]
    pub id: i64,
    pub name: String,
    pub rank: i64,
    pub level: i64,
    pub xp: i64,
}

/// A non-skill row: clue scrolls, boss kill counts, minigames.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityEntry {
    #[serde(default)]
    pub id: i64,
    pub name: String,
    pub rank: i64,
    pub score: i64,
}

impl Snapshot {
    /// Find a skill by name, ignoring case and surrounding whitespace.
    pub fn skill(&self, name: &str) -> Option<&SkillEntry> {
        let name = name.trim();
        self.skills.iter().find(|s| s.name.eq_ignore_ascii_case(name))
    }

    /// Find an activity by name, ignoring case and surrounding whitespace.
    pub fn activity(&self, name: &str) -> Option<&ActivityEntry> {
        let name = name.trim();
        self.activities
            .iter()
            .find(|a| a.name.eq_ignore_ascii_case(name))
    }

    pub fn skill_names(&self) -> Vec<String> {
        self.skills.iter().map(|s| s.name.clone()).collect()
    }

    pub fn activity_names(&self) -> Vec<String> {
        self.activities.iter().map(|a| a.name.clone()).collect()
    }
}

// ─── AccountType ──────────────────────────────────────────────────────────

/// The "kind" of account. Only used to decorate standings; every lookup
/// goes against the main hiscores board.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountType {
    #[default]
    Main,
    Ironman,
    HardcoreIronman,
    UltimateIronman,
    GroupIronman,
    HardcoreGroupIronman,
    UnrankedGroupIronman,
}

impl AccountType {
    pub const ALL: [AccountType; 7] = [
        AccountType::Main,
        AccountType::Ironman,
        AccountType::HardcoreIronman,
        AccountType::UltimateIronman,
        AccountType::GroupIronman,
        AccountType::HardcoreGroupIronman,
        AccountType::UnrankedGroupIronman,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AccountType::Main => "main",
            AccountType::Ironman => "ironman",
            AccountType::HardcoreIronman => "hardcore_ironman",
            AccountType::UltimateIronman => "ultimate_ironman",
            AccountType::GroupIronman => "group_ironman",
            AccountType::HardcoreGroupIronman => "hardcore_group_ironman",
            AccountType::UnrankedGroupIronman => "unranked_group_ironman",
        }
    }
}

impl fmt::Display for AccountType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AccountType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase().replace([' ', '-'], "_");
        AccountType::ALL
            .into_iter()
            .find(|t| t.as_str() == wanted)
            .ok_or_else(|| {
                let valid: Vec<&str> = AccountType::ALL.iter().map(|t| t.as_str()).collect();
                format!("unknown account type '{s}' (expected one of: {})", valid.join(", "))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Snapshot {
        serde_json::from_str(
            r#"{
                "name": "Zezima",
                "skills": [
                    {"id": 0, "name": "Overall", "rank": 1200, "level": 2100, "xp": 300000000},
                    {"id": 9, "name": "Woodcutting", "rank": 500, "level": 99, "xp": 13034431}
                ],
                "activities": [
                    {"id": 6, "name": "Clue Scrolls (all)", "rank": -1, "score": -1}
                ]
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn skill_lookup_ignores_case() {
        let s = sample();
        assert_eq!(s.skill("woodcutting").map(|e| e.level), Some(99));
        assert_eq!(s.skill(" WOODCUTTING ").map(|e| e.rank), Some(500));
    }

    #[test]
    fn activity_lookup_finds_unranked_entry() {
        let s = sample();
        let clues = s.activity("clue scrolls (all)").unwrap();
        assert_eq!(clues.rank, UNRANKED);
    }

    #[test]
    fn missing_sections_default_to_empty() {
        let s: Snapshot = serde_json::from_str(r#"{"name": "new_account"}"#).unwrap();
        assert!(s.skills.is_empty());
        assert!(s.activities.is_empty());
    }

    #[test]
    fn account_type_parses_loose_spelling() {
        assert_eq!(
            "Hardcore Ironman".parse::<AccountType>().unwrap(),
            AccountType::HardcoreIronman
        );
        assert_eq!(
            "group-ironman".parse::<AccountType>().unwrap(),
            AccountType::GroupIronman
        );
    }

    #[test]
    fn account_type_rejects_unknown() {
        let err = "pure".parse::<AccountType>().unwrap_err();
        assert!(err.contains("unknown account type"), "{err}");
    }
}
