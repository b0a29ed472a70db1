//! Utility slash commands: /ping, /status, /help

use crate::commands::names;
use serenity::builder::CreateApplicationCommand;

/// Creates utility commands
pub fn create_commands() -> Vec<CreateApplicationCommand> {
    vec![
        create_ping_command(),
        create_status_command(),
        create_help_command(),
    ]
}

/// Creates the ping command
fn create_ping_command() -> CreateApplicationCommand {
    CreateApplicationCommand::default()
        .name(names::PING)
        .description("Check system health and protection status")
        .to_owned()
}

/// Creates the status command
fn create_status_command() -> CreateApplicationCommand {
    CreateApplicationCommand::default()
        .name(names::STATUS)
        .description("Show latency, memory, CPU, uptime and protection status")
        .to_owned()
}

/// Creates the help command
fn create_help_command() -> CreateApplicationCommand {
    CreateApplicationCommand::default()
        .name(names::HELP)
        .description("List every available command")
        .to_owned()
}
