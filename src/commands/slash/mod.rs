//! Slash-command definitions and registration

pub mod admin;
pub mod utility;

use anyhow::Result;
use log::info;
use serenity::builder::CreateApplicationCommand;
use serenity::http::Http;
use serenity::model::application::command::Command;
use serenity::model::id::GuildId;

/// Every command definition, admin commands first
pub fn create_all_commands() -> Vec<CreateApplicationCommand> {
    let mut commands = admin::create_commands();
    commands.extend(utility::create_commands());
    commands
}

/// Replace the global command set (can take up to an hour to propagate)
pub async fn register_global_commands(http: &Http) -> Result<usize> {
    let commands = create_all_commands();
    let registered = Command::set_global_application_commands(http, |c| {
        c.set_application_commands(commands)
    })
    .await?;
    info!("Registered {} global slash commands", registered.len());
    Ok(registered.len())
}

/// Replace the command set of a single guild (propagates immediately, for development)
pub async fn register_guild_commands(http: &Http, guild_id: GuildId) -> Result<usize> {
    let commands = create_all_commands();
    let registered = guild_id
        .set_application_commands(http, |c| c.set_application_commands(commands))
        .await?;
    info!(
        "Registered {} slash commands for guild {guild_id}",
        registered.len()
    );
    Ok(registered.len())
}
