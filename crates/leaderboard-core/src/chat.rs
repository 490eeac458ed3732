//! Chat platform seam.
//!
//! Only create and delete are exposed. A recreated message always lands at
//! the bottom of the channel, so channel order follows publish order.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ChatError;

/// Platform-neutral rendered leaderboard message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub title: String,
    pub fields: Vec<PostField>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostField {
    pub name: String,
    pub value: String,
    pub inline: bool,
}

#[async_trait]
pub trait ChatPlatform: Send + Sync {
    /// Append `post` to `channel_id`, returning the new message id.
    async fn create_message(&self, channel_id: &str, post: &Post) -> Result<String, ChatError>;

    /// Delete a message. Returns [`ChatError::NotFound`] if it is already gone.
    async fn delete_message(&self, channel_id: &str, message_id: &str) -> Result<(), ChatError>;
}
