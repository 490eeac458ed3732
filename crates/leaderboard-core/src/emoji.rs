//! Application emoji lookup used to decorate leaderboard messages.

use std::collections::HashMap;

/// Emoji shown when an activity has no dedicated emoji.
pub const FALLBACK_EMOJI: &str = "osrstrophy";

/// Activities whose variants all share one emoji, checked in order by
/// substring before the generic normalization.
const SHARED_EMOJIS: &[(&str, &str)] = &[
    ("Bounty Hunter ", "skulled"),
    ("Clue Scrolls ", "clue_scroll"),
    ("Chambers of Xeric", "cox"),
    ("Theatre of Blood", "tob"),
    ("Tombs of Amascut", "toa"),
    ("Nightmare", "nightmare"),
    ("PvP", "skulled"),
    ("LMS", "skulled"),
    ("Rifts closed", "gotr"),
];

/// Map a skill or activity name to the emoji name it is uploaded under.
///
/// `Kree'Arra` → `kreearra`, `Commander Zilyana` → `commander_zilyana`,
/// `Clue Scrolls (beginner)` → `clue_scroll`.
pub fn emoji_name(activity: &str) -> String {
    let name = activity.trim();
    if let Some((_, shared)) = SHARED_EMOJIS.iter().find(|(p, _)| name.contains(p)) {
        return (*shared).to_string();
    }
    name.replace(['\'', '-', ':'], "")
        .replace(' ', "_")
        .to_lowercase()
}

/// Emoji name → chat markup (e.g. `<:woodcutting:123>`).
#[derive(Debug, Clone, Default)]
pub struct EmojiSet {
    tags: HashMap<String, String>,
}

impl EmojiSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, tag: impl Into<String>) {
        self.tags.insert(name.into(), tag.into());
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.tags.get(name).map(String::as_str)
    }

    /// Tag for an activity title, falling back to the trophy emoji.
    pub fn for_activity(&self, activity: &str) -> Option<&str> {
        self.get(&emoji_name(activity))
            .or_else(|| self.get(FALLBACK_EMOJI))
    }
}

impl FromIterator<(String, String)> for EmojiSet {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self {
            tags: iter.into_iter().collect(),
        }
    }
}
