//! Gateway seam between the moderation core and the chat platform.
//!
//! The core never talks to serenity directly. Inbound callbacks are turned into
//! [`GatewayEvent`] values and every outbound call goes through the [`Gateway`]
//! trait, which keeps the dispatcher and the command surface testable with an
//! in-memory double.

use anyhow::Result;
use serenity::async_trait;
use std::time::Duration;

/// Author of an inbound message, as seen by the dispatcher
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Author {
    pub user_id: u64,
    pub is_bot: bool,
    pub is_admin: bool,
}

impl Author {
    /// Platform mention markup for this author
    pub fn mention(&self) -> String {
        mention(self.user_id)
    }
}

/// Mention markup for a user id
pub fn mention(user_id: u64) -> String {
    format!("<@{user_id}>")
}

/// Inbound events the core reacts to
#[derive(Debug, Clone)]
pub enum GatewayEvent {
    /// Session established (fires again after a reconnect)
    Ready {
        bot_name: String,
        guild_count: usize,
    },
    MessageReceived {
        message_id: u64,
        channel_id: u64,
        author: Author,
        content: String,
    },
    MemberJoined {
        user_id: u64,
        community_id: u64,
    },
}

/// Outbound operations the core needs from the chat platform
#[async_trait]
pub trait Gateway: Send + Sync {
    /// Delete a message from a channel
    async fn delete_message(&self, channel_id: u64, message_id: u64) -> Result<()>;

    /// Send plain text to a channel, returning the new message id
    async fn send_message(&self, channel_id: u64, content: &str) -> Result<u64>;

    /// Replace the bot's presence/activity text
    async fn set_presence(&self, text: &str) -> Result<()>;

    /// Register and sync slash-command definitions, returning how many were registered
    async fn register_commands(&self) -> Result<usize>;

    /// Whether a channel id refers to a channel the bot can post to
    async fn resolve_channel(&self, channel_id: u64) -> bool;

    /// Member count for every joined community
    async fn community_member_counts(&self) -> Vec<(u64, u64)>;

    /// Most recent heartbeat round trip, if one has been measured
    async fn latency(&self) -> Option<Duration>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mention_format() {
        let author = Author {
            user_id: 42,
            is_bot: false,
            is_admin: false,
        };
        assert_eq!(author.mention(), "<@42>");
        assert_eq!(mention(7), "<@7>");
    }
}
