//! Concurrent per-activity publishing with a strict channel order.
//!
//! Every tracked activity gets its own worker. Workers classify, rank and
//! render immediately, then queue on the [`gate`](crate::gate) chain so
//! that the chat create calls happen in configured order:
//!
//! ```text
//! worker 0: prepare ─────────────── publish ─┐
//! worker 1: prepare ──────── wait ──────────-└▶ publish ─┐
//! worker 2: prepare ─ wait ──────────────────────────────└▶ publish
//! ```

use std::sync::Arc;

use osrs_hiscores::Snapshot;
use serde::Serialize;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::catalog::ActivityCatalog;
use crate::chat::{ChatPlatform, Post};
use crate::emoji::EmojiSet;
use crate::error::{ChatError, LeaderboardError, Result};
use crate::format::render;
use crate::gate::{self, TurnError};
use crate::ledger::Ledger;
use crate::model::{Member, TrackedGroup};
use crate::ranking::rank;

/// How one activity fared in a run.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PublishStatus {
    Published {
        message_id: String,
        /// Previous message removed to make room (edit-in-place only).
        replaced: Option<String>,
    },
    /// Nobody qualified for this activity.
    Skipped { removed: Option<String> },
    Failed { reason: String },
    TimedOut,
    Cancelled,
}

impl PublishStatus {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Published { .. } | Self::Skipped { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActivityOutcome {
    pub activity: String,
    pub position: usize,
    #[serde(flatten)]
    pub status: PublishStatus,
}

#[derive(Clone)]
pub struct OrderedPublisher {
    chat: Arc<dyn ChatPlatform>,
    ledger: Ledger,
    catalog: Arc<ActivityCatalog>,
    emojis: Arc<EmojiSet>,
    exclude_unranked: bool,
}

impl OrderedPublisher {
    pub fn new(
        chat: Arc<dyn ChatPlatform>,
        ledger: Ledger,
        catalog: Arc<ActivityCatalog>,
        emojis: Arc<EmojiSet>,
        exclude_unranked: bool,
    ) -> Self {
        Self {
            chat,
            ledger,
            catalog,
            emojis,
            exclude_unranked,
        }
    }

    /// Publish every tracked activity of `group`. Outcomes are returned in
    /// position order; a failure in one activity never affects another.
    pub async fn publish(
        &self,
        group: &TrackedGroup,
        snapshots: Arc<Vec<(Member, Snapshot)>>,
        deadline: Instant,
        cancel: &CancellationToken,
    ) -> Vec<ActivityOutcome> {
        let group = Arc::new(group.clone());
        let turns = gate::chain(group.activities.len());
        let mut handles = Vec::with_capacity(turns.len());

        for (activity, mut turn) in group.activities.clone().into_iter().zip(turns) {
            let this = self.clone();
            let group = group.clone();
            let snapshots = snapshots.clone();
            let cancel = cancel.clone();
            handles.push(tokio::spawn(async move {
                let position = turn.position();
                let prepared = tokio::select! {
                    r = tokio::time::timeout_at(deadline, this.prepare(&activity, &snapshots)) => {
                        r.unwrap_or_else(|_| Err("timed out preparing standing".to_string()))
                    }
                    _ = cancel.cancelled() => Err("cancelled".to_string()),
                };

                let waited = turn.wait(deadline, &cancel).await;
                let status = match waited {
                    _ if cancel.is_cancelled() => PublishStatus::Cancelled,
                    Ok(()) if Instant::now() >= deadline => PublishStatus::TimedOut,
                    Err(TurnError::TimedOut) => PublishStatus::TimedOut,
                    Err(TurnError::Cancelled) => PublishStatus::Cancelled,
                    Err(e @ TurnError::Abandoned) => PublishStatus::Failed {
                        reason: e.to_string(),
                    },
                    Ok(()) => match prepared {
                        Err(reason) => PublishStatus::Failed { reason },
                        Ok(post) => {
                            let step = this.publish_one(&group, &activity, position as u32, post);
                            match tokio::time::timeout_at(deadline, step).await {
                                Ok(Ok(status)) => status,
                                Ok(Err(e)) => PublishStatus::Failed {
                                    reason: e.to_string(),
                                },
                                Err(_) => PublishStatus::TimedOut,
                            }
                        }
                    },
                };
                drop(turn);

                match &status {
                    PublishStatus::Published { message_id, .. } => tracing::info!(
                        group_id = %group.id,
                        %activity,
                        position,
                        %message_id,
                        "published leaderboard"
                    ),
                    PublishStatus::Skipped { .. } => tracing::info!(
                        group_id = %group.id,
                        %activity,
                        position,
                        "no ranked members, skipped"
                    ),
                    other => tracing::warn!(
                        group_id = %group.id,
                        %activity,
                        position,
                        status = ?other,
                        "activity not published"
                    ),
                }
                ActivityOutcome {
                    activity,
                    position,
                    status,
                }
            }));
        }

        let mut outcomes = Vec::with_capacity(handles.len());
        for (position, handle) in handles.into_iter().enumerate() {
            match handle.await {
                Ok(outcome) => outcomes.push(outcome),
                Err(e) => outcomes.push(ActivityOutcome {
                    activity: group.activities[position].clone(),
                    position,
                    status: PublishStatus::Failed {
                        reason: format!("publish worker failed: {e}"),
                    },
                }),
            }
        }
        outcomes
    }

    /// Classify, rank and render. `Ok(None)` means nothing to show.
    async fn prepare(
        &self,
        activity: &str,
        snapshots: &[(Member, Snapshot)],
    ) -> std::result::Result<Option<Post>, String> {
        let kind = self
            .catalog
            .classify(activity)
            .await
            .map_err(|e| e.to_string())?;
        let standing = rank(activity, kind, snapshots, self.exclude_unranked);
        Ok(render(&standing, &self.emojis))
    }

    async fn publish_one(
        &self,
        group: &TrackedGroup,
        activity: &str,
        position: u32,
        post: Option<Post>,
    ) -> Result<PublishStatus> {
        let prior = self.ledger.lookup(&group.id, activity)?;
        let replaced = match prior {
            Some(row) if group.edit_in_place => {
                self.remove_message(&group.channel_id, &row.message_id)
                    .await?;
                self.ledger.forget(&group.id, activity)?;
                Some(row.message_id)
            }
            _ => None,
        };

        let Some(post) = post else {
            return Ok(PublishStatus::Skipped { removed: replaced });
        };

        let message_id = self.chat.create_message(&group.channel_id, &post).await?;
        self.ledger
            .record(&group.id, activity, &message_id, position)?;
        Ok(PublishStatus::Published {
            message_id,
            replaced,
        })
    }

    /// Delete a chat message, treating "already gone" as success.
    async fn remove_message(&self, channel_id: &str, message_id: &str) -> Result<()> {
        match self.chat.delete_message(channel_id, message_id).await {
            Ok(()) | Err(ChatError::NotFound) => Ok(()),
            Err(e) => Err(LeaderboardError::Chat(e)),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
