//! Durable record of the live chat message per (group, activity).

use std::sync::Arc;

use chrono::Utc;

use crate::chat::ChatPlatform;
use crate::error::{ChatError, Result};
use crate::model::{PostedMessage, TrackedGroup};
use crate::store::Store;

#[derive(Clone)]
pub struct Ledger {
    store: Arc<dyn Store>,
}

impl Ledger {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    pub fn lookup(&self, group_id: &str, activity: &str) -> Result<Option<PostedMessage>> {
        self.store.posted_message(group_id, activity)
    }

    /// Upsert the row for `(group_id, activity)`.
    pub fn record(
        &self,
        group_id: &str,
        activity: &str,
        message_id: &str,
        position: u32,
    ) -> Result<PostedMessage> {
        let row = PostedMessage {
            group_id: group_id.to_string(),
            activity: activity.trim().to_string(),
            message_id: message_id.to_string(),
            position,
            posted_at: Utc::now(),
        };
        self.store.put_posted_message(&row)?;
        Ok(row)
    }

    pub fn forget(&self, group_id: &str, activity: &str) -> Result<bool> {
        self.store.remove_posted_message(group_id, activity)
    }

    pub fn entries(&self, group_id: &str) -> Result<Vec<PostedMessage>> {
        self.store.posted_messages(group_id)
    }

    /// Bring the ledger in line with the group's tracked activities.
    ///
    /// Rows for activities no longer tracked are deleted together with their
    /// channel message (a message that is already gone counts as deleted).
    /// If the chat delete fails for another reason the row is kept so the
    /// next reconcile retries. Rows whose position drifted from the tracked
    /// order are rewritten. Returns the activities that were pruned.
    pub async fn reconcile(&self, group: &TrackedGroup, chat: &dyn ChatPlatform) -> Result<Vec<String>> {
        let mut pruned = Vec::new();
        for row in self.entries(&group.id)? {
            match group.position_of(&row.activity) {
                Some(position) => {
                    let position = position as u32;
                    if row.position != position {
                        tracing::debug!(
                            group_id = %group.id,
                            activity = %row.activity,
                            from = row.position,
                            to = position,
                            "rewriting ledger position"
                        );
                        self.store
                            .put_posted_message(&PostedMessage { position, ..row })?;
                    }
                }
                None => match chat.delete_message(&group.channel_id, &row.message_id).await {
                    Ok(()) | Err(ChatError::NotFound) => {
                        self.forget(&group.id, &row.activity)?;
                        tracing::info!(
                            group_id = %group.id,
                            activity = %row.activity,
                            "removed message for untracked activity"
                        );
                        pruned.push(row.activity);
                    }
                    Err(e) => {
                        tracing::warn!(
                            group_id = %group.id,
                            activity = %row.activity,
                            message_id = %row.message_id,
                            "could not delete message for untracked activity: {e}"
                        );
                    }
                },
            }
        }
        Ok(pruned)
    }
}
