//! Moderation Integration Tests
//!
//! These tests drive the dispatcher and the command surface through an
//! in-memory gateway that records every outbound call.
//!
//! Run with: `cargo test --test moderation_tests`

use anyhow::{bail, Result};
use serenity::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;
use warden::commands::CommandArg;
use warden::{
    Author, BotState, Command, CommandHandler, ConfigStore, EventDispatcher, Gateway, GatewayEvent,
    Invoker, RejectReason, Verdict,
};

// ============================================================================
// Recording Gateway
// ============================================================================

#[derive(Default)]
struct RecordingGateway {
    sent: Mutex<Vec<(u64, String)>>,
    deleted: Mutex<Vec<(u64, u64)>>,
    presence: Mutex<Vec<String>>,
    registrations: AtomicUsize,
    next_message_id: AtomicU64,
    known_channels: Vec<u64>,
    fail_delete: bool,
    fail_send: bool,
}

impl RecordingGateway {
    fn with_channels(channels: &[u64]) -> Self {
        RecordingGateway {
            known_channels: channels.to_vec(),
            next_message_id: AtomicU64::new(1000),
            ..Default::default()
        }
    }

    fn sent(&self) -> Vec<(u64, String)> {
        self.sent.lock().unwrap().clone()
    }

    fn deleted(&self) -> Vec<(u64, u64)> {
        self.deleted.lock().unwrap().clone()
    }
}

#[async_trait]
impl Gateway for RecordingGateway {
    async fn delete_message(&self, channel_id: u64, message_id: u64) -> Result<()> {
        if self.fail_delete {
            bail!("Unknown Message");
        }
        self.deleted.lock().unwrap().push((channel_id, message_id));
        Ok(())
    }

    async fn send_message(&self, channel_id: u64, content: &str) -> Result<u64> {
        if self.fail_send {
            bail!("Missing Permissions");
        }
        self.sent
            .lock()
            .unwrap()
            .push((channel_id, content.to_string()));
        Ok(self.next_message_id.fetch_add(1, Ordering::SeqCst))
    }

    async fn set_presence(&self, text: &str) -> Result<()> {
        self.presence.lock().unwrap().push(text.to_string());
        Ok(())
    }

    async fn register_commands(&self) -> Result<usize> {
        self.registrations.fetch_add(1, Ordering::SeqCst);
        Ok(8)
    }

    async fn resolve_channel(&self, channel_id: u64) -> bool {
        self.known_channels.contains(&channel_id)
    }

    async fn community_member_counts(&self) -> Vec<(u64, u64)> {
        vec![(1, 120), (2, 30)]
    }

    async fn latency(&self) -> Option<Duration> {
        Some(Duration::from_millis(87))
    }
}

// ============================================================================
// Helpers
// ============================================================================

const COMMUNITY: u64 = 1;
const WELCOME_CHANNEL: u64 = 500;
const WARNING_TTL: Duration = Duration::from_millis(20);

fn setup(dir: &TempDir, words: &[&str]) -> Arc<EventDispatcher> {
    let store = ConfigStore::new(
        dir.path().join("banned_words.json"),
        dir.path().join("welcome_config.json"),
    );
    let words = words.iter().map(|w| w.to_string()).collect();
    let state = Arc::new(BotState::with_words(store, words, "Test Community"));
    Arc::new(EventDispatcher::new(state, Duration::from_secs(30), WARNING_TTL))
}

fn member(user_id: u64) -> Author {
    Author {
        user_id,
        is_bot: false,
        is_admin: false,
    }
}

fn admin() -> Invoker {
    Invoker {
        user_id: 9,
        community_id: Some(COMMUNITY),
        is_admin: true,
    }
}

fn message(author: Author, content: &str) -> GatewayEvent {
    GatewayEvent::MessageReceived {
        message_id: 77,
        channel_id: 10,
        author,
        content: content.to_string(),
    }
}

fn word_args(word: &str) -> HashMap<String, CommandArg> {
    HashMap::from([("word".to_string(), CommandArg::Text(word.to_string()))])
}

// ============================================================================
// Message Moderation Tests
// ============================================================================

/// Test that a banned word removes the message and posts an expiring warning
#[tokio::test]
async fn test_banned_word_deletes_and_warns() {
    let dir = tempfile::tempdir().unwrap();
    let dispatcher = setup(&dir, &["spam"]);
    let gateway = Arc::new(RecordingGateway::with_channels(&[]));

    let verdict = dispatcher
        .on_message(gateway.clone(), 77, 10, &member(5), "this is SPAM here")
        .await;
    assert_eq!(
        verdict,
        Some(Verdict::Reject {
            reason: RejectReason::BannedWord,
            matched_term: Some("spam".to_string()),
        })
    );

    assert_eq!(gateway.deleted(), vec![(10, 77)]);
    let sent = gateway.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].0, 10);
    assert_eq!(sent[0].1, RejectReason::BannedWord.warning("<@5>"));

    // Warning is removed once the TTL elapses
    tokio::time::sleep(WARNING_TTL * 10).await;
    assert_eq!(gateway.deleted(), vec![(10, 77), (10, 1000)]);
}

/// Test that invite links win over banned words
#[tokio::test]
async fn test_invite_link_warning_takes_precedence() {
    let dir = tempfile::tempdir().unwrap();
    let dispatcher = setup(&dir, &["spam"]);
    let gateway = Arc::new(RecordingGateway::with_channels(&[]));

    dispatcher
        .dispatch(gateway.clone(), message(member(5), "spam discord.gg/abc"))
        .await;

    let sent = gateway.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].1, RejectReason::InviteLink.warning("<@5>"));
}

/// Test that administrators and bots are never moderated
#[tokio::test]
async fn test_admins_and_bots_skip_policy() {
    let dir = tempfile::tempdir().unwrap();
    let dispatcher = setup(&dir, &["spam"]);
    let gateway = Arc::new(RecordingGateway::with_channels(&[]));

    let admin_author = Author {
        is_admin: true,
        ..member(5)
    };
    let bot_author = Author {
        is_bot: true,
        ..member(6)
    };

    assert_eq!(
        dispatcher
            .on_message(gateway.clone(), 1, 10, &admin_author, "visit discord.gg/abc")
            .await,
        None
    );
    assert_eq!(
        dispatcher
            .on_message(gateway.clone(), 2, 10, &bot_author, "spam")
            .await,
        None
    );
    assert!(gateway.sent().is_empty());
    assert!(gateway.deleted().is_empty());
}

/// Test that clean messages produce no side effects
#[tokio::test]
async fn test_clean_message_allowed() {
    let dir = tempfile::tempdir().unwrap();
    let dispatcher = setup(&dir, &["spam"]);
    let gateway = Arc::new(RecordingGateway::with_channels(&[]));

    let verdict = dispatcher
        .on_message(gateway.clone(), 1, 10, &member(5), "good morning")
        .await;
    assert_eq!(verdict, Some(Verdict::Allow));
    assert!(gateway.sent().is_empty());
    assert!(gateway.deleted().is_empty());
}

/// Test that a failed delete does not stop the warning, and vice versa
#[tokio::test]
async fn test_delete_and_warn_fail_independently() {
    let dir = tempfile::tempdir().unwrap();
    let dispatcher = setup(&dir, &["spam"]);

    let no_delete = Arc::new(RecordingGateway {
        fail_delete: true,
        ..RecordingGateway::with_channels(&[])
    });
    dispatcher
        .dispatch(no_delete.clone(), message(member(5), "spam"))
        .await;
    assert_eq!(no_delete.sent().len(), 1);

    let no_send = Arc::new(RecordingGateway {
        fail_send: true,
        ..RecordingGateway::with_channels(&[])
    });
    dispatcher
        .dispatch(no_send.clone(), message(member(5), "spam"))
        .await;
    assert_eq!(no_send.deleted(), vec![(10, 77)]);
}

// ============================================================================
// Welcome Tests
// ============================================================================

/// Test that set_welcome followed by a join sends exactly one welcome
#[tokio::test]
async fn test_set_welcome_then_join_sends_once() {
    let dir = tempfile::tempdir().unwrap();
    let dispatcher = setup(&dir, &[]);
    let commands = CommandHandler::new(dispatcher.clone());
    let gateway = Arc::new(RecordingGateway::with_channels(&[WELCOME_CHANNEL]));

    let reply = commands
        .execute(
            gateway.as_ref(),
            &admin(),
            Command::SetWelcome {
                channel_id: WELCOME_CHANNEL,
            },
        )
        .await;
    assert!(reply.content.unwrap().starts_with("✅"));

    dispatcher
        .dispatch(
            gateway.clone(),
            GatewayEvent::MemberJoined {
                user_id: 42,
                community_id: COMMUNITY,
            },
        )
        .await;

    let sent = gateway.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].0, WELCOME_CHANNEL);
    assert!(sent[0].1.contains("<@42>"));
    assert!(sent[0].1.contains("Welcome to Test Community"));
}

/// Test that joins without a usable channel are silent
#[tokio::test]
async fn test_join_without_channel_is_noop() {
    let dir = tempfile::tempdir().unwrap();
    let dispatcher = setup(&dir, &[]);
    let gateway = Arc::new(RecordingGateway::with_channels(&[]));

    // Nothing configured
    dispatcher
        .dispatch(
            gateway.clone(),
            GatewayEvent::MemberJoined {
                user_id: 42,
                community_id: COMMUNITY,
            },
        )
        .await;
    assert!(gateway.sent().is_empty());

    // Configured, but the channel no longer exists
    dispatcher
        .state()
        .store()
        .set_welcome_channel(COMMUNITY, WELCOME_CHANNEL)
        .await
        .unwrap();
    let sent = dispatcher
        .welcome_member(gateway.as_ref(), COMMUNITY, 42)
        .await
        .unwrap();
    assert!(!sent);
    assert!(gateway.sent().is_empty());
}

/// Test that the welcome map is read fresh, so another community's setting does not leak
#[tokio::test]
async fn test_welcome_config_is_per_community() {
    let dir = tempfile::tempdir().unwrap();
    let dispatcher = setup(&dir, &[]);
    let gateway = Arc::new(RecordingGateway::with_channels(&[WELCOME_CHANNEL, 600]));

    let store = dispatcher.state().store();
    store.set_welcome_channel(COMMUNITY, WELCOME_CHANNEL).await.unwrap();
    store.set_welcome_channel(2, 600).await.unwrap();

    dispatcher
        .welcome_member(gateway.as_ref(), 2, 43)
        .await
        .unwrap();
    dispatcher
        .welcome_member(gateway.as_ref(), 3, 44)
        .await
        .unwrap();

    let sent = gateway.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].0, 600);
}

/// Test that /test_welcome goes through the join path for the invoker
#[tokio::test]
async fn test_test_welcome_uses_join_path() {
    let dir = tempfile::tempdir().unwrap();
    let dispatcher = setup(&dir, &[]);
    let commands = CommandHandler::new(dispatcher.clone());
    let gateway = Arc::new(RecordingGateway::with_channels(&[WELCOME_CHANNEL]));

    let reply = commands
        .execute(gateway.as_ref(), &admin(), Command::TestWelcome)
        .await;
    assert!(reply.content.unwrap().starts_with("⚠️"));
    assert!(gateway.sent().is_empty());

    dispatcher
        .state()
        .store()
        .set_welcome_channel(COMMUNITY, WELCOME_CHANNEL)
        .await
        .unwrap();
    let reply = commands
        .execute(gateway.as_ref(), &admin(), Command::TestWelcome)
        .await;
    assert!(reply.content.unwrap().starts_with("✅"));

    let sent = gateway.sent();
    assert_eq!(sent.len(), 1);
    assert!(sent[0].1.contains("<@9>"));
}

// ============================================================================
// Command Tests
// ============================================================================

/// Test add/list/remove semantics of the banned-word commands
#[tokio::test]
async fn test_word_commands() {
    let dir = tempfile::tempdir().unwrap();
    let dispatcher = setup(&dir, &[]);
    let commands = CommandHandler::new(dispatcher.clone());
    let gateway = RecordingGateway::with_channels(&[]);

    let reply = commands
        .execute(&gateway, &admin(), Command::ListWords)
        .await;
    assert!(reply.content.unwrap().contains("empty"));

    let add = Command::parse("add_word", &word_args("scam")).unwrap();
    let reply = commands.execute(&gateway, &admin(), add.clone()).await;
    assert!(reply.content.unwrap().starts_with("✅"));

    let reply = commands.execute(&gateway, &admin(), add).await;
    assert!(reply.content.unwrap().contains("already"));
    assert_eq!(dispatcher.state().banned_words().await, vec!["scam".to_string()]);

    let reply = commands
        .execute(&gateway, &admin(), Command::ListWords)
        .await;
    let embed = reply.embed.unwrap();
    assert_eq!(embed.description.as_deref(), Some("```scam```"));
    assert!(reply.ephemeral);

    let remove_absent = Command::parse("remove_word", &word_args("nope")).unwrap();
    let reply = commands.execute(&gateway, &admin(), remove_absent).await;
    assert!(reply.content.unwrap().contains("not on the banned list"));
    assert_eq!(dispatcher.state().banned_word_count().await, 1);

    let remove = Command::parse("remove_word", &word_args("scam")).unwrap();
    commands.execute(&gateway, &admin(), remove).await;
    assert!(dispatcher.state().banned_words().await.is_empty());

    // Disk matches memory after every mutation
    let on_disk = dispatcher.state().store().load_banned_words().await.unwrap();
    assert!(on_disk.is_empty());
}

/// Test that blank words get a specific notice and words are stored exactly as typed
#[tokio::test]
async fn test_blank_and_padded_words() {
    let dir = tempfile::tempdir().unwrap();
    let dispatcher = setup(&dir, &["spam"]);
    let commands = CommandHandler::new(dispatcher.clone());
    let gateway = RecordingGateway::with_channels(&[]);

    for name in ["add_word", "remove_word"] {
        let blank = Command::parse(name, &word_args("  ")).unwrap();
        let reply = commands.execute(&gateway, &admin(), blank).await;
        assert!(reply.content.unwrap().contains("must not be empty"));
    }
    assert_eq!(dispatcher.state().banned_words().await, vec!["spam".to_string()]);

    let padded = Command::parse("add_word", &word_args(" spam")).unwrap();
    let reply = commands.execute(&gateway, &admin(), padded).await;
    assert!(reply.content.unwrap().starts_with("✅"));
    assert_eq!(
        dispatcher.state().banned_words().await,
        vec!["spam".to_string(), " spam".to_string()]
    );
}

/// Test that non-admins are rejected before anything changes
#[tokio::test]
async fn test_admin_commands_reject_non_admins() {
    let dir = tempfile::tempdir().unwrap();
    let dispatcher = setup(&dir, &["spam"]);
    let commands = CommandHandler::new(dispatcher.clone());
    let gateway = RecordingGateway::with_channels(&[WELCOME_CHANNEL]);
    let user = Invoker {
        is_admin: false,
        ..admin()
    };

    for command in [
        Command::AddWord {
            word: "scam".to_string(),
        },
        Command::RemoveWord {
            word: "spam".to_string(),
        },
        Command::ListWords,
        Command::SetWelcome {
            channel_id: WELCOME_CHANNEL,
        },
        Command::TestWelcome,
    ] {
        let reply = commands.execute(&gateway, &user, command).await;
        assert!(reply.ephemeral);
        assert!(reply.content.unwrap().contains("permission"));
    }

    assert_eq!(dispatcher.state().banned_words().await, vec!["spam".to_string()]);
    assert_eq!(
        dispatcher.state().store().welcome_channel(COMMUNITY).await.unwrap(),
        None
    );
    assert!(gateway.sent().is_empty());
}

/// Test that set_welcome outside a community is refused
#[tokio::test]
async fn test_set_welcome_requires_community() {
    let dir = tempfile::tempdir().unwrap();
    let dispatcher = setup(&dir, &[]);
    let commands = CommandHandler::new(dispatcher);
    let gateway = RecordingGateway::with_channels(&[]);
    let dm_admin = Invoker {
        community_id: None,
        ..admin()
    };

    let reply = commands
        .execute(&gateway, &dm_admin, Command::SetWelcome { channel_id: 1 })
        .await;
    assert!(reply.content.unwrap().contains("inside a server"));
}

/// Test that the status report is open to everyone and reflects live numbers
#[tokio::test]
async fn test_status_report() {
    let dir = tempfile::tempdir().unwrap();
    let dispatcher = setup(&dir, &["a", "b", "c"]);
    let commands = CommandHandler::new(dispatcher);
    let gateway = RecordingGateway::with_channels(&[]);
    let user = Invoker {
        is_admin: false,
        ..admin()
    };

    for command in [Command::Ping, Command::Status] {
        let reply = commands.execute(&gateway, &user, command).await;
        let embed = reply.embed.unwrap();
        let values: Vec<&str> = embed.fields.iter().map(|f| f.value.as_str()).collect();
        assert!(values.contains(&"`87ms`"));
        assert!(values.contains(&"`Active (Banned: 3 words)`"));
    }

    let help = commands.execute(&gateway, &user, Command::Help).await;
    assert_eq!(help.embed.unwrap().fields.len(), 7);
}

// ============================================================================
// Ready / Scheduler Tests
// ============================================================================

/// Test that repeated Ready events do not start a second status timer
#[tokio::test]
async fn test_ready_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let dispatcher = setup(&dir, &[]);
    let gateway = Arc::new(RecordingGateway::with_channels(&[]));

    let ready = GatewayEvent::Ready {
        bot_name: "warden".to_string(),
        guild_count: 2,
    };
    dispatcher.dispatch(gateway.clone(), ready.clone()).await;
    assert!(dispatcher.scheduler().is_running());

    dispatcher.dispatch(gateway.clone(), ready).await;
    assert_eq!(gateway.registrations.load(Ordering::SeqCst), 2);

    let started_again = dispatcher
        .scheduler()
        .start(gateway.clone(), dispatcher.state().clone())
        .await;
    assert!(!started_again);

    let presence = gateway.presence.lock().unwrap().clone();
    assert_eq!(presence[0], "Watching over Test Community");
}

/// Test that a tick publishes the slot selected by the clock
#[tokio::test]
async fn test_scheduler_tick_publishes_rotation_slot() {
    let dir = tempfile::tempdir().unwrap();
    let dispatcher = setup(&dir, &["a", "b"]);
    let gateway = RecordingGateway::with_channels(&[]);

    let line = dispatcher
        .scheduler()
        .tick(&gateway, dispatcher.state())
        .await
        .unwrap();

    let expected = [
        "🛡️ Security Active | Banned: 2 words".to_string(),
        "Serving 150 Users".to_string(),
        "Welcome to Test Community!".to_string(),
    ];
    let index = dispatcher.state().rotation_index();
    match index {
        0 => assert_eq!(line, expected[0]),
        1 => assert!(line.starts_with("RAM: ") && line.ends_with("| Ping: 87ms")),
        2 => assert_eq!(line, expected[1]),
        3 => assert_eq!(line, expected[2]),
        other => panic!("rotation index out of range: {other}"),
    }
    assert_eq!(gateway.presence.lock().unwrap().last(), Some(&line));
}
