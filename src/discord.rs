//! Serenity adapter: turns gateway callbacks into [`GatewayEvent`]s and slash
//! interactions into [`Command`]s, and implements [`Gateway`] on top of the
//! serenity HTTP client, cache and shard messenger.

use crate::commands::slash;
use crate::commands::{Command, CommandArg, CommandHandler, CommandReply, Invoker, ReplyEmbed};
use crate::dispatcher::EventDispatcher;
use crate::gateway::{Author, Gateway, GatewayEvent};
use anyhow::Result;
use log::{error, info, warn};
use serenity::async_trait;
use serenity::builder::CreateEmbed;
use serenity::cache::Cache;
use serenity::client::bridge::gateway::{ShardId, ShardManager, ShardMessenger};
use serenity::http::Http;
use serenity::model::application::interaction::application_command::{
    ApplicationCommandInteraction, CommandDataOptionValue,
};
use serenity::model::application::interaction::{Interaction, InteractionResponseType};
use serenity::model::channel::Message;
use serenity::model::gateway::{Activity, Ready};
use serenity::model::guild::Member;
use serenity::model::id::{ChannelId, GuildId, MessageId};
use serenity::prelude::*;
use serenity::utils::Color;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// TypeMap key for the shard manager, used to read heartbeat latency
pub struct ShardManagerContainer;

impl TypeMapKey for ShardManagerContainer {
    type Value = Arc<Mutex<ShardManager>>;
}

/// [`Gateway`] backed by a live serenity client
pub struct SerenityGateway {
    http: Arc<Http>,
    cache: Arc<Cache>,
    shard: ShardMessenger,
    shard_id: u64,
    shard_manager: Option<Arc<Mutex<ShardManager>>>,
    guild_id: Option<GuildId>,
}

impl SerenityGateway {
    pub async fn from_context(ctx: &Context, guild_id: Option<GuildId>) -> Self {
        let shard_manager = ctx.data.read().await.get::<ShardManagerContainer>().cloned();
        SerenityGateway {
            http: ctx.http.clone(),
            cache: ctx.cache.clone(),
            shard: ctx.shard.clone(),
            shard_id: ctx.shard_id,
            shard_manager,
            guild_id,
        }
    }
}

#[async_trait]
impl Gateway for SerenityGateway {
    async fn delete_message(&self, channel_id: u64, message_id: u64) -> Result<()> {
        ChannelId(channel_id)
            .delete_message(&self.http, MessageId(message_id))
            .await?;
        Ok(())
    }

    async fn send_message(&self, channel_id: u64, content: &str) -> Result<u64> {
        let message = ChannelId(channel_id).say(&self.http, content).await?;
        Ok(message.id.0)
    }

    async fn set_presence(&self, text: &str) -> Result<()> {
        self.shard.set_activity(Some(Activity::playing(text)));
        Ok(())
    }

    async fn register_commands(&self) -> Result<usize> {
        match self.guild_id {
            Some(guild_id) => {
                info!("Development mode: registering commands for guild {guild_id}");
                slash::register_guild_commands(&self.http, guild_id).await
            }
            None => slash::register_global_commands(&self.http).await,
        }
    }

    async fn resolve_channel(&self, channel_id: u64) -> bool {
        if self.cache.guild_channel(ChannelId(channel_id)).is_some() {
            return true;
        }
        self.http.get_channel(channel_id).await.is_ok()
    }

    async fn community_member_counts(&self) -> Vec<(u64, u64)> {
        self.cache
            .guilds()
            .into_iter()
            .filter_map(|guild_id| {
                self.cache
                    .guild(guild_id)
                    .map(|guild| (guild_id.0, guild.member_count))
            })
            .collect()
    }

    async fn latency(&self) -> Option<Duration> {
        let manager = self.shard_manager.as_ref()?;
        let manager = manager.lock().await;
        let runners = manager.runners.lock().await;
        runners.get(&ShardId(self.shard_id)).and_then(|runner| runner.latency)
    }
}

/// Event handler wiring serenity callbacks to the dispatcher and command surface
pub struct Handler {
    bot_name: String,
    dispatcher: Arc<EventDispatcher>,
    commands: CommandHandler,
    guild_id: Option<GuildId>,
}

impl Handler {
    pub fn new(bot_name: String, dispatcher: Arc<EventDispatcher>, guild_id: Option<u64>) -> Self {
        Handler {
            bot_name,
            commands: CommandHandler::new(Arc::clone(&dispatcher)),
            dispatcher,
            guild_id: guild_id.map(GuildId),
        }
    }

    async fn gateway(&self, ctx: &Context) -> Arc<dyn Gateway> {
        Arc::new(SerenityGateway::from_context(ctx, self.guild_id).await)
    }

    async fn handle_slash_command(
        &self,
        ctx: &Context,
        command: &ApplicationCommandInteraction,
    ) -> Result<(), serenity::Error> {
        let args = command_args(command);
        let reply = match Command::parse(&command.data.name, &args) {
            Some(parsed) => {
                let invoker = Invoker {
                    user_id: command.user.id.0,
                    community_id: command.guild_id.map(|id| id.0),
                    is_admin: command
                        .member
                        .as_ref()
                        .and_then(|member| member.permissions)
                        .map(|permissions| permissions.administrator())
                        .unwrap_or(false),
                };
                let gateway = SerenityGateway::from_context(ctx, self.guild_id).await;
                self.commands.execute(&gateway, &invoker, parsed).await
            }
            None => {
                warn!(
                    "[{}] Unknown or malformed command '{}'",
                    self.bot_name, command.data.name
                );
                CommandReply::notice("❓ Unknown command.")
            }
        };

        command
            .create_interaction_response(&ctx.http, |response| {
                response
                    .kind(InteractionResponseType::ChannelMessageWithSource)
                    .interaction_response_data(|message| {
                        if let Some(content) = &reply.content {
                            message.content(content);
                        }
                        if let Some(embed) = &reply.embed {
                            message.add_embed(create_embed(embed));
                        }
                        message.ephemeral(reply.ephemeral)
                    })
            })
            .await
    }
}

#[async_trait]
impl EventHandler for Handler {
    async fn message(&self, ctx: Context, msg: Message) {
        if msg.author.bot {
            return;
        }
        // Only community channels are moderated
        if msg.guild_id.is_none() {
            return;
        }

        let author = Author {
            user_id: msg.author.id.0,
            is_bot: msg.author.bot,
            is_admin: author_is_admin(&ctx, &msg).await,
        };
        let event = GatewayEvent::MessageReceived {
            message_id: msg.id.0,
            channel_id: msg.channel_id.0,
            author,
            content: msg.content,
        };

        let gateway = self.gateway(&ctx).await;
        self.dispatcher.dispatch(gateway, event).await;
    }

    async fn guild_member_addition(&self, ctx: Context, new_member: Member) {
        let event = GatewayEvent::MemberJoined {
            user_id: new_member.user.id.0,
            community_id: new_member.guild_id.0,
        };

        let gateway = self.gateway(&ctx).await;
        self.dispatcher.dispatch(gateway, event).await;
    }

    async fn ready(&self, ctx: Context, ready: Ready) {
        info!(
            "[{}] {} is connected and ready!",
            self.bot_name, ready.user.name
        );
        info!("[{}] Bot ID: {}", self.bot_name, ready.user.id);

        if let Some(shard) = ready.shard {
            info!("[{}] Shard: {}/{}", self.bot_name, shard[0] + 1, shard[1]);
        }

        let event = GatewayEvent::Ready {
            bot_name: ready.user.name.clone(),
            guild_count: ready.guilds.len(),
        };

        let gateway = self.gateway(&ctx).await;
        self.dispatcher.dispatch(gateway, event).await;
    }

    async fn interaction_create(&self, ctx: Context, interaction: Interaction) {
        match interaction {
            Interaction::ApplicationCommand(command) => {
                if let Err(e) = self.handle_slash_command(&ctx, &command).await {
                    error!(
                        "[{}] Error responding to slash command '{}': {}",
                        self.bot_name, command.data.name, e
                    );
                }
            }
            Interaction::Ping(_) => {
                info!("[{}] Ping interaction received", self.bot_name);
            }
            _ => {}
        }
    }
}

/// Administrator check for a message author. Any lookup failure counts as not privileged.
async fn author_is_admin(ctx: &Context, msg: &Message) -> bool {
    let Some(guild_id) = msg.guild_id else {
        return false;
    };

    let member = match guild_id.member(ctx, msg.author.id).await {
        Ok(member) => member,
        Err(e) => {
            warn!("Could not fetch member {} for permission check: {e}", msg.author.id);
            return false;
        }
    };

    match member.permissions(&ctx.cache) {
        Ok(permissions) => permissions.administrator(),
        Err(e) => {
            warn!("Could not compute permissions for {}: {e}", msg.author.id);
            false
        }
    }
}

/// Resolved option values of a slash command, keyed by option name
fn command_args(command: &ApplicationCommandInteraction) -> HashMap<String, CommandArg> {
    command
        .data
        .options
        .iter()
        .filter_map(|option| {
            let value = match option.resolved.as_ref()? {
                CommandDataOptionValue::String(text) => CommandArg::Text(text.clone()),
                CommandDataOptionValue::Channel(channel) => CommandArg::Channel(channel.id.0),
                _ => return None,
            };
            Some((option.name.clone(), value))
        })
        .collect()
}

fn create_embed(embed: &ReplyEmbed) -> CreateEmbed {
    let mut created = CreateEmbed::default();
    created.title(&embed.title).color(Color::new(embed.color));

    if let Some(description) = &embed.description {
        created.description(description);
    }
    for field in &embed.fields {
        created.field(&field.name, &field.value, field.inline);
    }
    if let Some(footer) = &embed.footer {
        created.footer(|f| f.text(footer));
    }

    created
}
