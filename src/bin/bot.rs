//! Moderation bot entry point
//!
//! Configuration can come from:
//! - config.yaml (or the file named by CONFIG_FILE)
//! - Environment variables (DISCORD_TOKEN, ...), optionally via .env

use anyhow::Result;
use dotenvy::dotenv;
use log::{error, info, warn};
use serenity::prelude::*;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use warden::config::Config;
use warden::discord::{Handler, ShardManagerContainer};
use warden::dispatcher::EventDispatcher;
use warden::keep_alive;
use warden::state::BotState;
use warden::store::ConfigStore;

/// Graceful shutdown flag
static SHUTDOWN_REQUESTED: AtomicBool = AtomicBool::new(false);

const BOT_NAME: &str = "warden";

/// Run the bot with retry logic
async fn run_bot(config: &Config, dispatcher: Arc<EventDispatcher>) -> Result<()> {
    let max_retries = 5;
    let mut retry_count = 0;

    loop {
        info!("[{}] Starting bot (attempt {}/{})", BOT_NAME, retry_count + 1, max_retries);

        match run_bot_inner(config, dispatcher.clone()).await {
            Ok(()) => {
                info!("[{}] Bot exited normally", BOT_NAME);
                break;
            }
            Err(e) if SHUTDOWN_REQUESTED.load(Ordering::SeqCst) => {
                info!("[{}] Bot stopped during shutdown: {}", BOT_NAME, e);
                break;
            }
            Err(e) => {
                retry_count += 1;
                if retry_count >= max_retries {
                    error!("[{}] Bot failed after {} retries: {}", BOT_NAME, max_retries, e);
                    return Err(e);
                }

                let delay = Duration::from_secs(5 * retry_count as u64);
                warn!("[{}] Bot failed: {}. Retrying in {:?}...", BOT_NAME, e, delay);
                tokio::time::sleep(delay).await;
            }
        }
    }

    Ok(())
}

/// Inner bot run function (single attempt)
async fn run_bot_inner(config: &Config, dispatcher: Arc<EventDispatcher>) -> Result<()> {
    let handler = Handler::new(BOT_NAME.to_string(), dispatcher, config.guild_id());

    // Member joins and message content are privileged intents
    let intents = GatewayIntents::GUILDS
        | GatewayIntents::GUILD_MEMBERS
        | GatewayIntents::GUILD_MESSAGES
        | GatewayIntents::MESSAGE_CONTENT;

    let mut client = Client::builder(&config.discord_token, intents)
        .event_handler(handler)
        .await
        .map_err(|e| {
            error!("[{}] Failed to create Discord client: {e}", BOT_NAME);
            anyhow::anyhow!("Client creation failed: {}", e)
        })?;

    {
        let mut data = client.data.write().await;
        data.insert::<ShardManagerContainer>(client.shard_manager.clone());
    }

    let shard_manager = client.shard_manager.clone();
    let shutdown_handle = tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Received Ctrl+C, initiating graceful shutdown...");
                SHUTDOWN_REQUESTED.store(true, Ordering::SeqCst);
                shard_manager.lock().await.shutdown_all().await;
            }
            Err(e) => {
                error!("Failed to listen for Ctrl+C: {}", e);
            }
        }
    });

    info!("[{}] Connecting to Discord gateway...", BOT_NAME);

    let result = client.start().await;
    shutdown_handle.abort();

    result.map_err(|e| {
        error!("[{}] Gateway connection failed: {e}", BOT_NAME);
        anyhow::anyhow!("Gateway connection failed: {}", e)
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenv().ok();

    let config = Config::auto_load();

    // Set up logging
    let log_level = config
        .as_ref()
        .map(|c| c.log_level.clone())
        .unwrap_or_else(|_| "info".to_string());
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(&log_level)).init();

    let config = match config {
        Ok(config) => config,
        Err(e) => {
            error!("❌ Cannot start without a valid configuration: {e:#}");
            std::process::exit(1);
        }
    };

    info!("Starting moderation bot for {}...", config.community_name);

    if let Err(e) = keep_alive::spawn(config.keep_alive_port) {
        warn!("Keep-alive server not started: {}", e);
    }

    let store = ConfigStore::new(&config.banned_words_path, &config.welcome_config_path);
    let state = match BotState::load(store, config.community_name.clone()).await {
        Ok(state) => Arc::new(state),
        Err(e) => {
            error!("❌ Failed to load banned word list: {e:#}");
            std::process::exit(1);
        }
    };

    let dispatcher = Arc::new(EventDispatcher::new(
        state,
        config.status_interval(),
        config.warning_ttl(),
    ));

    run_bot(&config, dispatcher).await?;

    info!("Bot shut down successfully");
    Ok(())
}
