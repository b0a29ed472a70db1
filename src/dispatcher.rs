//! # Feature: Event Dispatcher
//!
//! Routes inbound gateway events to the content policy, the welcome composer
//! and the status scheduler. Every failure is logged here; nothing propagates
//! back to the gateway event loop.

use crate::gateway::{mention, Author, Gateway, GatewayEvent};
use crate::policy::Verdict;
use crate::state::BotState;
use crate::status::StatusScheduler;
use anyhow::Result;
use log::{debug, error, info, warn};
use std::sync::Arc;
use std::time::Duration;

/// Default lifetime of a moderation warning before it is removed
pub const DEFAULT_WARNING_TTL: Duration = Duration::from_secs(5);

pub struct EventDispatcher {
    state: Arc<BotState>,
    scheduler: Arc<StatusScheduler>,
    warning_ttl: Duration,
}

impl EventDispatcher {
    pub fn new(state: Arc<BotState>, status_interval: Duration, warning_ttl: Duration) -> Self {
        EventDispatcher {
            state,
            scheduler: Arc::new(StatusScheduler::new(status_interval)),
            warning_ttl,
        }
    }

    pub fn state(&self) -> &Arc<BotState> {
        &self.state
    }

    pub fn scheduler(&self) -> &Arc<StatusScheduler> {
        &self.scheduler
    }

    /// Handle one inbound event to completion
    pub async fn dispatch(&self, gateway: Arc<dyn Gateway>, event: GatewayEvent) {
        match event {
            GatewayEvent::Ready {
                bot_name,
                guild_count,
            } => self.on_ready(gateway, &bot_name, guild_count).await,
            GatewayEvent::MessageReceived {
                message_id,
                channel_id,
                author,
                content,
            } => {
                self.on_message(gateway, message_id, channel_id, &author, &content)
                    .await;
            }
            GatewayEvent::MemberJoined {
                user_id,
                community_id,
            } => {
                if let Err(e) = self.welcome_member(gateway.as_ref(), community_id, user_id).await {
                    warn!("Failed to welcome member {user_id} in community {community_id}: {e}");
                }
            }
        }
    }

    async fn on_ready(&self, gateway: Arc<dyn Gateway>, bot_name: &str, guild_count: usize) {
        info!("{bot_name} is connected to {guild_count} communities");

        match gateway.register_commands().await {
            Ok(count) => info!("Synced {count} slash commands"),
            Err(e) => error!("Failed to register slash commands: {e}"),
        }

        let initial = format!("Watching over {}", self.state.community_name());
        if let Err(e) = gateway.set_presence(&initial).await {
            warn!("Failed to set initial presence: {e}");
        }

        if !self
            .scheduler
            .start(Arc::clone(&gateway), Arc::clone(&self.state))
            .await
        {
            info!("Reconnected, status rotation already running");
        }

        info!(
            "System ready! Loaded {} banned words",
            self.state.banned_word_count().await
        );
    }

    /// Evaluate a message and carry out the moderation side effects.
    ///
    /// Returns the verdict, or `None` when the message was skipped before evaluation.
    pub async fn on_message(
        &self,
        gateway: Arc<dyn Gateway>,
        message_id: u64,
        channel_id: u64,
        author: &Author,
        content: &str,
    ) -> Option<Verdict> {
        if author.is_bot || author.is_admin {
            return None;
        }

        let verdict = self.state.evaluate(content, author.is_admin).await;
        let Verdict::Reject {
            reason,
            ref matched_term,
        } = verdict
        else {
            return Some(verdict);
        };

        info!(
            "Removing message {message_id} from {} in channel {channel_id} ({}{})",
            author.user_id,
            reason.as_str(),
            matched_term
                .as_deref()
                .map(|t| format!(": {t}"))
                .unwrap_or_default()
        );

        let warning = reason.warning(&author.mention());
        let (deleted, sent) = futures::join!(
            gateway.delete_message(channel_id, message_id),
            gateway.send_message(channel_id, &warning),
        );

        if let Err(e) = deleted {
            warn!("Failed to delete message {message_id}: {e}");
        }

        match sent {
            Ok(warning_id) => self.expire_warning(gateway, channel_id, warning_id),
            Err(e) => warn!("Failed to send moderation warning in {channel_id}: {e}"),
        }

        Some(verdict)
    }

    /// Remove a warning after the configured delay, without blocking the caller
    fn expire_warning(&self, gateway: Arc<dyn Gateway>, channel_id: u64, warning_id: u64) {
        let ttl = self.warning_ttl;
        tokio::spawn(async move {
            tokio::time::sleep(ttl).await;
            if let Err(e) = gateway.delete_message(channel_id, warning_id).await {
                debug!("Failed to expire warning {warning_id}: {e}");
            }
        });
    }

    /// Send the welcome message for a member, if the community has a usable channel.
    ///
    /// Returns whether a message was sent. The channel map is read from disk on
    /// every call.
    pub async fn welcome_member(
        &self,
        gateway: &dyn Gateway,
        community_id: u64,
        user_id: u64,
    ) -> Result<bool> {
        let Some(channel_id) = self.state.store().welcome_channel(community_id).await? else {
            debug!("No welcome channel configured for community {community_id}");
            return Ok(false);
        };

        if !gateway.resolve_channel(channel_id).await {
            debug!("Welcome channel {channel_id} for community {community_id} not found");
            return Ok(false);
        }

        let message = welcome_message(self.state.community_name(), &mention(user_id));
        gateway.send_message(channel_id, &message).await?;
        info!("Welcomed {user_id} in channel {channel_id}");
        Ok(true)
    }
}

/// Framed welcome template for a new member
pub fn welcome_message(community: &str, mention: &str) -> String {
    const RULE: &str = "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━";
    format!(
        "{RULE}\n\
         🎉 **Welcome to {community}** 🎉\n\
         {RULE}\n\n\
         👋 Hello {mention}!\n\
         > You are now officially part of our community.\n\n\
         💡 **What you can do here:**\n\
         • Chat with other members and share ideas\n\
         • Reach out to the team any time you need help\n\n\
         Enjoy your stay 💖\n\
         {RULE}"
    )
}
