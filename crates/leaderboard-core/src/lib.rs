//! Scheduled, order-preserving leaderboard publishing.
//!
//! ```text
//! Scheduler ──▶ Pipeline::run(group)
//!                 │
//!                 ├─ Ledger::reconcile        drop messages for untracked activities
//!                 ├─ StatFetcher::fetch       one lookup per member, failures excluded
//!                 └─ OrderedPublisher         one worker per activity, gated by position
//!                       ├─ ranking::rank
//!                       ├─ format::render
//!                       └─ ChatPlatform       delete old / create new, Ledger::record
//! ```

pub mod catalog;
pub mod chat;
pub mod config;
pub mod discord;
pub mod emoji;
pub mod error;
pub mod fetcher;
pub mod format;
pub mod gate;
pub mod groups;
pub mod ledger;
pub mod model;
pub mod pipeline;
pub mod provider;
pub mod publisher;
pub mod ranking;
pub mod roster;
pub mod scheduler;
pub mod store;

#[cfg(test)]
mod testing;

pub use catalog::ActivityCatalog;
pub use chat::{ChatPlatform, Post, PostField};
pub use config::Settings;
pub use discord::DiscordChat;
pub use emoji::EmojiSet;
pub use error::{ChatError, LeaderboardError, Result};
pub use model::{ActivityKind, Member, PostedMessage, Standing, TrackedGroup};
pub use pipeline::{Pipeline, PipelineOptions, RunReport};
pub use provider::StatsProvider;
pub use publisher::{ActivityOutcome, PublishStatus};
pub use scheduler::Scheduler;
pub use store::{RedbStore, Store};
