//! # Feature: Command Surface
//!
//! Request/response handlers behind the slash commands. Admin commands check
//! the invoker's privilege before anything else; a rejected invocation gets an
//! invoker-only notice and has no other effect.
//!
//! Handlers return a platform-neutral [`CommandReply`]; the serenity adapter
//! turns it into an interaction response.

pub mod slash;

use crate::dispatcher::EventDispatcher;
use crate::gateway::Gateway;
use crate::status::format_uptime;
use log::{error, info};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

/// Registered command names
pub mod names {
    pub const ADD_WORD: &str = "add_word";
    pub const REMOVE_WORD: &str = "remove_word";
    pub const LIST_WORDS: &str = "list_words";
    pub const SET_WELCOME: &str = "set_welcome";
    pub const TEST_WELCOME: &str = "test_welcome";
    pub const PING: &str = "ping";
    pub const STATUS: &str = "status";
    pub const HELP: &str = "help";

    pub const ALL: [&str; 8] = [
        ADD_WORD,
        REMOVE_WORD,
        LIST_WORDS,
        SET_WELCOME,
        TEST_WELCOME,
        PING,
        STATUS,
        HELP,
    ];
}

const COLOR_ALERT: u32 = 0xE7_4C_3C;
const COLOR_GOLD: u32 = 0xF1_C4_0F;

/// A parsed slash-command invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    AddWord { word: String },
    RemoveWord { word: String },
    ListWords,
    SetWelcome { channel_id: u64 },
    TestWelcome,
    Ping,
    Status,
    Help,
}

/// Option value supplied with a command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandArg {
    Text(String),
    Channel(u64),
}

impl Command {
    /// Build a command from its registered name and resolved options.
    ///
    /// Returns `None` for unknown names or missing/mistyped options. Words are
    /// kept exactly as typed; blank words are refused when the command runs.
    pub fn parse(name: &str, args: &HashMap<String, CommandArg>) -> Option<Command> {
        let word = || match args.get("word") {
            Some(CommandArg::Text(word)) => Some(word.clone()),
            _ => None,
        };

        match name {
            names::ADD_WORD => word().map(|word| Command::AddWord { word }),
            names::REMOVE_WORD => word().map(|word| Command::RemoveWord { word }),
            names::LIST_WORDS => Some(Command::ListWords),
            names::SET_WELCOME => match args.get("channel") {
                Some(CommandArg::Channel(channel_id)) => Some(Command::SetWelcome {
                    channel_id: *channel_id,
                }),
                _ => None,
            },
            names::TEST_WELCOME => Some(Command::TestWelcome),
            names::PING => Some(Command::Ping),
            names::STATUS => Some(Command::Status),
            names::HELP => Some(Command::Help),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Command::AddWord { .. } => names::ADD_WORD,
            Command::RemoveWord { .. } => names::REMOVE_WORD,
            Command::ListWords => names::LIST_WORDS,
            Command::SetWelcome { .. } => names::SET_WELCOME,
            Command::TestWelcome => names::TEST_WELCOME,
            Command::Ping => names::PING,
            Command::Status => names::STATUS,
            Command::Help => names::HELP,
        }
    }

    pub fn requires_admin(&self) -> bool {
        !matches!(self, Command::Ping | Command::Status | Command::Help)
    }
}

/// Who invoked a command, and where
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invoker {
    pub user_id: u64,
    pub community_id: Option<u64>,
    pub is_admin: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbedField {
    pub name: String,
    pub value: String,
    pub inline: bool,
}

/// Platform-neutral rich reply
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ReplyEmbed {
    pub title: String,
    pub description: Option<String>,
    pub color: u32,
    pub fields: Vec<EmbedField>,
    pub footer: Option<String>,
}

impl ReplyEmbed {
    fn field(mut self, name: impl Into<String>, value: impl Into<String>, inline: bool) -> Self {
        self.fields.push(EmbedField {
            name: name.into(),
            value: value.into(),
            inline,
        });
        self
    }
}

/// Single response to a command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandReply {
    pub content: Option<String>,
    pub embed: Option<ReplyEmbed>,
    /// Visible only to the invoker
    pub ephemeral: bool,
}

impl CommandReply {
    pub fn notice(content: impl Into<String>) -> Self {
        CommandReply {
            content: Some(content.into()),
            embed: None,
            ephemeral: true,
        }
    }

    pub fn embed(embed: ReplyEmbed) -> Self {
        CommandReply {
            content: None,
            embed: Some(embed),
            ephemeral: true,
        }
    }
}

/// User-facing command failures; `Display` is the notice sent to the invoker
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("❌ You don't have permission to use this command.")]
    PermissionDenied,
    #[error("⚠️ `{0}` is already on the banned list.")]
    AlreadyExists(String),
    #[error("⚠️ `{0}` is not on the banned list.")]
    NotFound(String),
    #[error("❌ This command can only be used inside a server.")]
    NotInCommunity,
    #[error("⚠️ The word must not be empty.")]
    EmptyWord,
    #[error("❌ Something went wrong, please try again later.")]
    Internal(#[from] anyhow::Error),
}

/// Executes parsed commands against the shared bot state
#[derive(Clone)]
pub struct CommandHandler {
    dispatcher: Arc<EventDispatcher>,
}

impl CommandHandler {
    pub fn new(dispatcher: Arc<EventDispatcher>) -> Self {
        CommandHandler { dispatcher }
    }

    /// Run a command to completion. Failures become invoker-only notices.
    pub async fn execute(&self, gateway: &dyn Gateway, invoker: &Invoker, command: Command) -> CommandReply {
        let name = command.name();
        match self.run(gateway, invoker, command).await {
            Ok(reply) => reply,
            Err(CommandError::Internal(e)) => {
                error!("Command /{name} from {} failed: {e:#}", invoker.user_id);
                CommandReply::notice(CommandError::Internal(e).to_string())
            }
            Err(e) => CommandReply::notice(e.to_string()),
        }
    }

    async fn run(
        &self,
        gateway: &dyn Gateway,
        invoker: &Invoker,
        command: Command,
    ) -> Result<CommandReply, CommandError> {
        if command.requires_admin() && !invoker.is_admin {
            info!(
                "Rejected /{} from {} (not an administrator)",
                command.name(),
                invoker.user_id
            );
            return Err(CommandError::PermissionDenied);
        }

        let state = self.dispatcher.state();

        match command {
            Command::AddWord { word } => {
                if word.trim().is_empty() {
                    return Err(CommandError::EmptyWord);
                }
                if !state.add_banned_word(&word).await? {
                    return Err(CommandError::AlreadyExists(word));
                }
                info!("{} added banned word '{word}'", invoker.user_id);
                Ok(CommandReply::notice(format!(
                    "✅ Added `{word}` to the banned list."
                )))
            }
            Command::RemoveWord { word } => {
                if word.trim().is_empty() {
                    return Err(CommandError::EmptyWord);
                }
                if !state.remove_banned_word(&word).await? {
                    return Err(CommandError::NotFound(word));
                }
                info!("{} removed banned word '{word}'", invoker.user_id);
                Ok(CommandReply::notice(format!(
                    "✅ Removed `{word}` from the banned list."
                )))
            }
            Command::ListWords => Ok(list_words_reply(&state.banned_words().await)),
            Command::SetWelcome { channel_id } => {
                let community_id = invoker.community_id.ok_or(CommandError::NotInCommunity)?;
                state
                    .store()
                    .set_welcome_channel(community_id, channel_id)
                    .await?;
                info!("Welcome channel for community {community_id} set to {channel_id}");
                Ok(CommandReply::notice(format!(
                    "✅ Welcome channel set to <#{channel_id}>."
                )))
            }
            Command::TestWelcome => {
                let community_id = invoker.community_id.ok_or(CommandError::NotInCommunity)?;
                let sent = self
                    .dispatcher
                    .welcome_member(gateway, community_id, invoker.user_id)
                    .await?;
                Ok(CommandReply::notice(if sent {
                    "✅ Test welcome message sent."
                } else {
                    "⚠️ No usable welcome channel is configured. Use `/set_welcome` first."
                }))
            }
            Command::Ping | Command::Status => {
                let sample = state.sample(gateway).await;
                let banned = state.banned_word_count().await;
                let community = state.community_name();

                Ok(CommandReply::embed(
                    ReplyEmbed {
                        title: format!("🛡️ {community} Security Status"),
                        color: COLOR_GOLD,
                        footer: Some(format!("{community} System")),
                        ..Default::default()
                    }
                    .field("📡 Ping", format!("`{}ms`", sample.latency_ms), true)
                    .field("💾 RAM", format!("`{:.2} MB`", sample.memory_mb), true)
                    .field("💻 CPU", format!("`{:.1}%`", sample.cpu_percent), true)
                    .field("⏱️ Uptime", format!("`{}`", format_uptime(sample.uptime)), false)
                    .field(
                        "🔒 Protection",
                        format!("`Active (Banned: {banned} words)`"),
                        false,
                    ),
                ))
            }
            Command::Help => Ok(help_reply(state.community_name())),
        }
    }
}

fn list_words_reply(words: &[String]) -> CommandReply {
    if words.is_empty() {
        return CommandReply::notice("📭 The banned list is empty.");
    }

    CommandReply::embed(ReplyEmbed {
        title: "🚫 Banned Words".to_string(),
        description: Some(format!("```{}```", words.join(", "))),
        color: COLOR_ALERT,
        footer: Some(format!("{} words total", words.len())),
        ..Default::default()
    })
}

fn help_reply(community: &str) -> CommandReply {
    CommandReply::embed(
        ReplyEmbed {
            title: format!("📚 {community} Bot Commands"),
            description: Some("Every available command".to_string()),
            color: COLOR_GOLD,
            footer: Some(format!("{community} System")),
            ..Default::default()
        }
        .field("🛠️ `/set_welcome`", "Set the welcome channel (Admin)", false)
        .field("🧪 `/test_welcome`", "Preview the welcome message (Admin)", false)
        .field("➕ `/add_word`", "Ban a word (Admin)", false)
        .field("➖ `/remove_word`", "Unban a word (Admin)", false)
        .field("📜 `/list_words`", "Show banned words (Admin)", false)
        .field("🛡️ `/ping` `/status`", "Show system status", false)
        .field("📚 `/help`", "Show this list", false),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(pairs: &[(&str, CommandArg)]) -> HashMap<String, CommandArg> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_parse_commands() {
        let word = args(&[("word", CommandArg::Text("spam".to_string()))]);
        assert_eq!(
            Command::parse("add_word", &word),
            Some(Command::AddWord {
                word: "spam".to_string()
            })
        );
        assert_eq!(
            Command::parse("remove_word", &word),
            Some(Command::RemoveWord {
                word: "spam".to_string()
            })
        );

        // Exact-string membership: surrounding spaces are part of the word
        let padded = args(&[("word", CommandArg::Text(" spam".to_string()))]);
        assert_eq!(
            Command::parse("add_word", &padded),
            Some(Command::AddWord {
                word: " spam".to_string()
            })
        );

        let channel = args(&[("channel", CommandArg::Channel(55))]);
        assert_eq!(
            Command::parse("set_welcome", &channel),
            Some(Command::SetWelcome { channel_id: 55 })
        );

        let none = HashMap::new();
        assert_eq!(Command::parse("help", &none), Some(Command::Help));
        assert_eq!(Command::parse("status", &none), Some(Command::Status));
    }

    #[test]
    fn test_parse_rejects_missing_options() {
        let none = HashMap::new();
        assert_eq!(Command::parse("add_word", &none), None);
        assert_eq!(Command::parse("set_welcome", &none), None);
        assert_eq!(Command::parse("unknown", &none), None);

        let blank = args(&[("word", CommandArg::Text("   ".to_string()))]);
        assert_eq!(
            Command::parse("add_word", &blank),
            Some(Command::AddWord {
                word: "   ".to_string()
            })
        );

        let wrong_type = args(&[("channel", CommandArg::Text("general".to_string()))]);
        assert_eq!(Command::parse("set_welcome", &wrong_type), None);
    }

    #[test]
    fn test_name_round_trip() {
        let none = HashMap::new();
        for name in ["list_words", "test_welcome", "ping", "status", "help"] {
            assert_eq!(Command::parse(name, &none).unwrap().name(), name);
        }
    }

    #[test]
    fn test_admin_gating() {
        assert!(Command::ListWords.requires_admin());
        assert!(Command::TestWelcome.requires_admin());
        assert!(Command::SetWelcome { channel_id: 1 }.requires_admin());
        assert!(!Command::Ping.requires_admin());
        assert!(!Command::Status.requires_admin());
        assert!(!Command::Help.requires_admin());
    }

    #[test]
    fn test_list_words_reply() {
        assert_eq!(
            list_words_reply(&[]),
            CommandReply::notice("📭 The banned list is empty.")
        );

        let reply = list_words_reply(&["a".to_string(), "b".to_string()]);
        let embed = reply.embed.unwrap();
        assert_eq!(embed.description.as_deref(), Some("```a, b```"));
        assert_eq!(embed.footer.as_deref(), Some("2 words total"));
        assert!(reply.ephemeral);
    }

    #[test]
    fn test_error_notices() {
        assert!(CommandError::AlreadyExists("x".to_string())
            .to_string()
            .contains("already"));
        assert!(CommandError::NotFound("x".to_string())
            .to_string()
            .contains("not on the banned list"));
        assert!(CommandError::EmptyWord.to_string().contains("must not be empty"));
    }

    #[test]
    fn test_help_lists_every_command() {
        let embed = help_reply("PDR Community").embed.unwrap();
        let listed: String = embed.fields.iter().map(|f| f.name.as_str()).collect();
        for name in names::ALL {
            assert!(listed.contains(&format!("`/{name}`")), "{name}");
        }
    }
}
