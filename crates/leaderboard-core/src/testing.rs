//! Test doubles for the provider and chat seams.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use osrs_hiscores::{normalize_account_key, ActivityEntry, HiscoresError, SkillEntry, Snapshot};

use crate::catalog::ActivityCatalog;
use crate::chat::{ChatPlatform, Post};
use crate::error::ChatError;
use crate::provider::StatsProvider;

pub const WOODCUTTING: &str = "Woodcutting";
pub const CLUES: &str = "Clue Scrolls (all)";

/// Snapshot with one skill and one activity at the given official ranks.
pub fn snapshot(name: &str, woodcutting_rank: i64, clue_rank: i64) -> Snapshot {
    let level = if woodcutting_rank > 0 { 99 - woodcutting_rank.min(98) / 20 } else { 1 };
    Snapshot {
        name: name.to_string(),
        skills: vec![SkillEntry {
            id: 9,
            name: WOODCUTTING.into(),
            rank: woodcutting_rank,
            level,
            xp: level * 1000,
        }],
        activities: vec![ActivityEntry {
            id: 6,
            name: CLUES.into(),
            rank: clue_rank,
            score: if clue_rank > 0 { 10_000 / clue_rank } else { -1 },
        }],
    }
}

pub const SKILLS: &[&str] = &["Attack", "Defence", "Strength", "Hitpoints", WOODCUTTING, "Fishing"];
pub const ACTIVITIES: &[&str] = &[CLUES, "Zulrah", "Vorkath"];

/// Snapshot ranked at `rank` in every skill and activity of [`catalog`].
pub fn ranked_everywhere(name: &str, rank: i64) -> Snapshot {
    Snapshot {
        name: name.to_string(),
        skills: SKILLS
            .iter()
            .enumerate()
            .map(|(i, s)| SkillEntry {
                id: i as i64,
                name: s.to_string(),
                rank,
                level: 90,
                xp: 5_000_000,
            })
            .collect(),
        activities: ACTIVITIES
            .iter()
            .enumerate()
            .map(|(i, a)| ActivityEntry {
                id: i as i64,
                name: a.to_string(),
                rank,
                score: 250,
            })
            .collect(),
    }
}

pub fn catalog() -> ActivityCatalog {
    ActivityCatalog::from_names(
        SKILLS.iter().map(|s| s.to_string()).collect(),
        ACTIVITIES.iter().map(|a| a.to_string()).collect(),
    )
}

// ─── FakeProvider ─────────────────────────────────────────────────────────

#[derive(Default)]
pub struct FakeProvider {
    accounts: HashMap<String, Snapshot>,
    latency: HashMap<String, Duration>,
    failing: HashSet<String>,
    calls: Mutex<HashMap<String, usize>>,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

/// Decrements the in-flight count even when a lookup is dropped mid-sleep.
struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl FakeProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_account(self, name: &str, woodcutting_rank: i64, clue_rank: i64) -> Self {
        self.with_snapshot(snapshot(name, woodcutting_rank, clue_rank))
    }

    pub fn with_snapshot(mut self, snapshot: Snapshot) -> Self {
        self.accounts
            .insert(normalize_account_key(&snapshot.name), snapshot);
        self
    }

    pub fn with_latency(mut self, name: &str, latency: Duration) -> Self {
        self.latency.insert(normalize_account_key(name), latency);
        self
    }

    /// Lookups for `name` fail with a transient 503.
    pub fn failing(mut self, name: &str) -> Self {
        self.failing.insert(normalize_account_key(name));
        self
    }

    /// Highest number of lookups that were running at the same time.
    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    pub fn lookups(&self, name: &str) -> usize {
        let calls = self.calls.lock().unwrap();
        calls.get(&normalize_account_key(name)).copied().unwrap_or(0)
    }
}

#[async_trait]
impl StatsProvider for FakeProvider {
    async fn lookup(&self, account_key: &str) -> Result<Snapshot, HiscoresError> {
        *self
            .calls
            .lock()
            .unwrap()
            .entry(account_key.to_string())
            .or_default() += 1;
        let running = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        let _in_flight = InFlight(&self.in_flight);
        self.peak_in_flight.fetch_max(running, Ordering::SeqCst);
        if let Some(latency) = self.latency.get(account_key) {
            tokio::time::sleep(*latency).await;
        }
        if self.failing.contains(account_key) {
            return Err(HiscoresError::Status {
                account: account_key.to_string(),
                status: 503,
            });
        }
        self.accounts
            .get(account_key)
            .cloned()
            .ok_or_else(|| HiscoresError::NotFound(account_key.to_string()))
    }
}

// ─── FakeChat ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct LiveMessage {
    pub channel_id: String,
    pub message_id: String,
    pub title: String,
    /// Field values joined by newlines.
    pub body: String,
}

#[derive(Default)]
struct ChatState {
    next_id: u64,
    /// Channel contents in append order.
    live: Vec<LiveMessage>,
    deleted: Vec<String>,
    fail_delete: HashSet<String>,
}

/// In-memory channel. Create latency and failures are keyed by the post's
/// activity title (the title with any emoji prefix removed).
#[derive(Default)]
pub struct FakeChat {
    create_latency: HashMap<String, Duration>,
    fail_create: HashSet<String>,
    state: Mutex<ChatState>,
}

fn title_key(title: &str) -> String {
    let bare = match title.split_once("> ") {
        Some((_, rest)) => rest,
        None => title,
    };
    bare.trim().to_lowercase()
}

impl FakeChat {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_create_latency(mut self, activity: &str, latency: Duration) -> Self {
        self.create_latency.insert(title_key(activity), latency);
        self
    }

    /// Creates for `activity` fail with `Forbidden`.
    pub fn failing_create(mut self, activity: &str) -> Self {
        self.fail_create.insert(title_key(activity));
        self
    }

    /// Deleting `message_id` fails with `Forbidden`.
    pub fn fail_delete_of(&self, message_id: &str) {
        self.state
            .lock()
            .unwrap()
            .fail_delete
            .insert(message_id.to_string());
    }

    /// Drop a message without going through the trait, as if a moderator
    /// removed it by hand.
    pub fn vanish(&self, message_id: &str) {
        self.state
            .lock()
            .unwrap()
            .live
            .retain(|m| m.message_id != message_id);
    }

    pub fn titles(&self, channel_id: &str) -> Vec<String> {
        self.live(channel_id).into_iter().map(|m| m.title).collect()
    }

    pub fn live(&self, channel_id: &str) -> Vec<LiveMessage> {
        self.state
            .lock()
            .unwrap()
            .live
            .iter()
            .filter(|m| m.channel_id == channel_id)
            .cloned()
            .collect()
    }

    pub fn deleted(&self) -> Vec<String> {
        self.state.lock().unwrap().deleted.clone()
    }
}

#[async_trait]
impl ChatPlatform for FakeChat {
    async fn create_message(&self, channel_id: &str, post: &Post) -> Result<String, ChatError> {
        let key = title_key(&post.title);
        if let Some(latency) = self.create_latency.get(&key) {
            tokio::time::sleep(*latency).await;
        }
        if self.fail_create.contains(&key) {
            return Err(ChatError::Forbidden);
        }
        let mut state = self.state.lock().unwrap();
        state.next_id += 1;
        let message_id = format!("msg-{}", state.next_id);
        state.live.push(LiveMessage {
            channel_id: channel_id.to_string(),
            message_id: message_id.clone(),
            title: post.title.clone(),
            body: post
                .fields
                .iter()
                .map(|f| f.value.as_str())
                .collect::<Vec<_>>()
                .join("\n"),
        });
        Ok(message_id)
    }

    async fn delete_message(&self, channel_id: &str, message_id: &str) -> Result<(), ChatError> {
        let mut state = self.state.lock().unwrap();
        if state.fail_delete.contains(message_id) {
            return Err(ChatError::Forbidden);
        }
        let before = state.live.len();
        state
            .live
            .retain(|m| !(m.channel_id == channel_id && m.message_id == message_id));
        if state.live.len() == before {
            return Err(ChatError::NotFound);
        }
        state.deleted.push(message_id.to_string());
        Ok(())
    }
}
