//! Admin slash commands: /add_word, /remove_word, /list_words, /set_welcome, /test_welcome

use crate::commands::names;
use serenity::builder::CreateApplicationCommand;
use serenity::model::application::command::CommandOptionType;
use serenity::model::channel::ChannelType;
use serenity::model::permissions::Permissions;

/// Creates admin commands
pub fn create_commands() -> Vec<CreateApplicationCommand> {
    vec![
        create_add_word_command(),
        create_remove_word_command(),
        create_list_words_command(),
        create_set_welcome_command(),
        create_test_welcome_command(),
    ]
}

/// Creates the add_word command (admin)
fn create_add_word_command() -> CreateApplicationCommand {
    CreateApplicationCommand::default()
        .name(names::ADD_WORD)
        .description("Add a word to the banned list (Admin)")
        .default_member_permissions(Permissions::ADMINISTRATOR)
        .dm_permission(false)
        .create_option(|option| {
            option
                .name("word")
                .description("The word to ban")
                .kind(CommandOptionType::String)
                .required(true)
        })
        .to_owned()
}

/// Creates the remove_word command (admin)
fn create_remove_word_command() -> CreateApplicationCommand {
    CreateApplicationCommand::default()
        .name(names::REMOVE_WORD)
        .description("Remove a word from the banned list (Admin)")
        .default_member_permissions(Permissions::ADMINISTRATOR)
        .dm_permission(false)
        .create_option(|option| {
            option
                .name("word")
                .description("The word to unban")
                .kind(CommandOptionType::String)
                .required(true)
        })
        .to_owned()
}

/// Creates the list_words command (admin)
fn create_list_words_command() -> CreateApplicationCommand {
    CreateApplicationCommand::default()
        .name(names::LIST_WORDS)
        .description("Show every banned word (Admin)")
        .default_member_permissions(Permissions::ADMINISTRATOR)
        .dm_permission(false)
        .to_owned()
}

/// Creates the set_welcome command (admin)
fn create_set_welcome_command() -> CreateApplicationCommand {
    CreateApplicationCommand::default()
        .name(names::SET_WELCOME)
        .description("Choose the channel where new members are welcomed (Admin)")
        .default_member_permissions(Permissions::ADMINISTRATOR)
        .dm_permission(false)
        .create_option(|option| {
            option
                .name("channel")
                .description("Welcome channel")
                .kind(CommandOptionType::Channel)
                .channel_types(&[ChannelType::Text])
                .required(true)
        })
        .to_owned()
}

/// Creates the test_welcome command (admin) - welcomes the invoker as if they just joined
fn create_test_welcome_command() -> CreateApplicationCommand {
    CreateApplicationCommand::default()
        .name(names::TEST_WELCOME)
        .description("Send a test welcome message for yourself (Admin)")
        .default_member_permissions(Permissions::ADMINISTRATOR)
        .dm_permission(false)
        .to_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_admin_commands_are_admin_only() {
        let commands = create_commands();
        assert_eq!(commands.len(), 5);
        for command in &commands {
            assert!(command.0.contains_key("name"));
            assert_eq!(
                command.0.get("default_member_permissions"),
                Some(&serde_json::Value::String(
                    Permissions::ADMINISTRATOR.bits().to_string()
                ))
            );
        }
    }
}
